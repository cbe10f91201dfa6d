use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// One tracked filesystem object. `path` is the unique key across the index;
/// `name` is always the lower-cased final path component and is the search key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub parent: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// The full index: path → FileEntry plus the timestamp of the scan that
/// produced it. A snapshot is immutable once published; a rebuild produces a
/// brand-new snapshot that supersedes the old one wholesale.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub last_update: Option<DateTime<Utc>>,
    pub files: HashMap<PathBuf, FileEntry>,
}

impl IndexSnapshot {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A set of byte-identical files found by the duplicate detector. Derived
/// output only, never persisted. `count` is always >= 2.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub hash: String,
    pub count: usize,
    pub size: u64,
    pub files: Vec<FileEntry>,
}
