use crate::error::Error;
use crate::model::IndexSnapshot;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info};

/// Owns the active index snapshot and its persisted form on disk.
///
/// The snapshot behind `active` is never mutated in place: readers clone the
/// `Arc` once at task start and keep a stable view even if a rebuild swaps in
/// a replacement mid-task.
pub struct IndexStore {
    index_file: PathBuf,
    active: RwLock<Arc<IndexSnapshot>>,
}

impl IndexStore {
    /// Open the store, restoring the persisted snapshot if one exists.
    /// A missing or corrupt snapshot file falls back to an empty index;
    /// that is a recoverable condition, never an error.
    pub fn open(index_file: impl Into<PathBuf>) -> IndexStore {
        let index_file = index_file.into();
        let snapshot = load_snapshot(&index_file);
        IndexStore {
            index_file,
            active: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Cheap handle to the current snapshot for readers.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.active.read().unwrap())
    }

    /// Atomically swap the active snapshot. Stale readers holding the
    /// previous `Arc` continue to see a consistent old view.
    pub fn replace(&self, snapshot: IndexSnapshot) -> Arc<IndexSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.active.write().unwrap() = Arc::clone(&snapshot);
        debug!("Active snapshot replaced: {} entries", snapshot.len());
        snapshot
    }

    /// Serialize the given snapshot to the persisted location. Failures are
    /// surfaced to the caller, which treats them as non-fatal: the in-memory
    /// snapshot stays authoritative for the running process.
    pub fn save(&self, snapshot: &IndexSnapshot) -> Result<(), Error> {
        let bytes = bincode::serialize(snapshot)
            .map_err(|e| Error::Persistence(e.to_string()))?;
        fs::write(&self.index_file, bytes)?;
        debug!(
            "Saved snapshot ({} entries) to {}",
            snapshot.len(),
            self.index_file.display()
        );
        Ok(())
    }
}

fn load_snapshot(index_file: &PathBuf) -> IndexSnapshot {
    if !index_file.exists() {
        info!("No index file at {}, starting empty", index_file.display());
        return IndexSnapshot::default();
    }
    match fs::read(index_file) {
        Ok(bytes) => match bincode::deserialize::<IndexSnapshot>(&bytes) {
            Ok(snapshot) => {
                info!(
                    "Loaded snapshot with {} entries from {}",
                    snapshot.len(),
                    index_file.display()
                );
                snapshot
            }
            Err(e) => {
                error!("Error parsing index file {}: {}", index_file.display(), e);
                IndexSnapshot::default()
            }
        },
        Err(e) => {
            error!("Error reading index file {}: {}", index_file.display(), e);
            IndexSnapshot::default()
        }
    }
}
