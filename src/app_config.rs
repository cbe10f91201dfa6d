use crate::error::Error;
use config::{Config, File as ConfigFile};
use serde::Deserialize;

pub const DEFAULT_MIN_DUPE_SIZE: u64 = 1024 * 1024; // 1 MiB

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Location of the persisted index snapshot.
    #[serde(default = "default_index_file")]
    pub index_file: String,
    /// Files smaller than this are never considered by the duplicate scan.
    #[serde(default = "default_min_dupe_size")]
    pub min_dupe_size: u64,
    /// Glob patterns excluded during index rebuilds.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_index_file() -> String {
    "file_index.bin".to_string()
}

fn default_min_dupe_size() -> u64 {
    DEFAULT_MIN_DUPE_SIZE
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            index_file: default_index_file(),
            min_dupe_size: default_min_dupe_size(),
            ignore_patterns: Vec::new(),
        }
    }
}

pub fn load_configuration() -> Result<AppConfig, Error> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .build()?;
    Ok(builder.try_deserialize::<AppConfig>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_no_config_file() {
        let config = AppConfig::default();
        assert_eq!(config.index_file, "file_index.bin");
        assert_eq!(config.min_dupe_size, 1024 * 1024);
        assert!(config.ignore_patterns.is_empty());
    }

    #[test]
    fn config_failures_surface_through_the_taxonomy() {
        let err: Error = config::ConfigError::Message("bad value".to_string()).into();
        assert!(matches!(err, Error::Config(_)));
    }
}
