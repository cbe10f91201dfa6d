use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("'{0}' is not an existing directory")]
    InvalidRoot(PathBuf),

    #[error("search keyword must not be empty")]
    EmptyKeyword,

    #[error("another task is already running")]
    TaskConflict,

    #[error("snapshot persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
