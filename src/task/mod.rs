pub mod messages;

pub use messages::{
    DupProgressMessage, DupStage, IndexProgressMessage, SearchProgressMessage, TaskMessage,
};

use crate::app_config::AppConfig;
use crate::error::Error;
use crate::file_proc::{dupes, scan, search, DupeOptions};
use crate::store::IndexStore;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{error, info};

/// Cooperative stop flag shared between a task handle and its worker.
/// Checked per file / per candidate inside every component.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Consumer side of one background task: the message channel, the cancel
/// token and the terminal state the worker left behind.
pub struct TaskHandle {
    rx: Receiver<TaskMessage>,
    cancel: CancelToken,
    state: Arc<Mutex<TaskState>>,
    thread: JoinHandle<()>,
}

impl TaskHandle {
    /// Non-blocking poll. `Err(Disconnected)` means the worker is gone and
    /// every message has been drained.
    pub fn try_recv(&self) -> Result<TaskMessage, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> TaskState {
        *self.state.lock().unwrap()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the worker exits and return its terminal state.
    pub fn join(self) -> TaskState {
        let _ = self.thread.join();
        *self.state.lock().unwrap()
    }
}

/// Releases the coordinator's one-task-at-a-time slot when the worker exits,
/// whichever way it exits.
struct BusySlot(Arc<AtomicBool>);

impl Drop for BusySlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs one of {rebuild, search, duplicate scan} at a time as a cancellable
/// worker thread, multiplexing its typed messages onto a single channel for
/// a polling consumer.
pub struct TaskCoordinator {
    store: Arc<IndexStore>,
    config: AppConfig,
    busy: Arc<AtomicBool>,
}

impl TaskCoordinator {
    pub fn new(store: Arc<IndexStore>, config: AppConfig) -> TaskCoordinator {
        TaskCoordinator {
            store,
            config,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> Arc<IndexStore> {
        Arc::clone(&self.store)
    }

    /// Rebuild the index from a full rescan of `root`. On success the store
    /// adopts the new snapshot and persists it; a cancelled rebuild leaves
    /// the previous snapshot untouched.
    pub fn start_rebuild(&self, root: &Path) -> Result<TaskHandle, Error> {
        if !root.is_dir() {
            return Err(Error::InvalidRoot(root.to_path_buf()));
        }
        let slot = self.acquire_slot()?;
        let store = Arc::clone(&self.store);
        let ignore_patterns = self.config.ignore_patterns.clone();
        let root = root.to_path_buf();
        info!("Starting index rebuild for {}", root.display());

        Ok(self.spawn(slot, move |cancel, tx| {
            match scan::build_snapshot(&root, &ignore_patterns, cancel, tx) {
                Ok(Some(snapshot)) => {
                    let snapshot = store.replace(snapshot);
                    // Save failure is non-fatal: the in-memory snapshot
                    // stays authoritative for this process.
                    if let Err(e) = store.save(&snapshot) {
                        error!("Error saving index: {}", e);
                    }
                    let _ = tx.send(TaskMessage::IndexComplete);
                    TaskState::Completed
                }
                Ok(None) => TaskState::Cancelled,
                Err(e) => {
                    let _ = tx.send(TaskMessage::Error(e.to_string()));
                    TaskState::Failed
                }
            }
        }))
    }

    /// Stream entries whose name contains `keyword`, over the snapshot that
    /// is active when the worker starts.
    pub fn start_search(&self, keyword: &str) -> Result<TaskHandle, Error> {
        let keyword = keyword.trim().to_string();
        if keyword.is_empty() {
            return Err(Error::EmptyKeyword);
        }
        let slot = self.acquire_slot()?;
        let store = Arc::clone(&self.store);
        info!("Starting search for '{}'", keyword);

        Ok(self.spawn(slot, move |cancel, tx| {
            let snapshot = store.snapshot();
            if search::stream_matches(&snapshot, &keyword, cancel, tx) {
                let _ = tx.send(TaskMessage::SearchDone);
                TaskState::Completed
            } else {
                TaskState::Cancelled
            }
        }))
    }

    /// Stream duplicate groups found over the currently active snapshot.
    pub fn start_find_duplicates(&self, options: DupeOptions) -> Result<TaskHandle, Error> {
        let slot = self.acquire_slot()?;
        let store = Arc::clone(&self.store);
        info!(
            "Starting duplicate scan (min size {} bytes, prefix {:?})",
            options.min_size, options.prefix
        );

        Ok(self.spawn(slot, move |cancel, tx| {
            let snapshot = store.snapshot();
            if dupes::stream_duplicates(&snapshot, &options, cancel, tx) {
                let _ = tx.send(TaskMessage::DupDone);
                TaskState::Completed
            } else {
                TaskState::Cancelled
            }
        }))
    }

    fn acquire_slot(&self) -> Result<BusySlot, Error> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::TaskConflict);
        }
        Ok(BusySlot(Arc::clone(&self.busy)))
    }

    fn spawn<F>(&self, slot: BusySlot, work: F) -> TaskHandle
    where
        F: FnOnce(&CancelToken, &Sender<TaskMessage>) -> TaskState + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let state = Arc::new(Mutex::new(TaskState::Running));

        let thread = {
            let cancel = cancel.clone();
            let state = Arc::clone(&state);
            thread::spawn(move || {
                let _slot = slot;
                let terminal = work(&cancel, &tx);
                *state.lock().unwrap() = terminal;
            })
        };

        TaskHandle {
            rx,
            cancel,
            state,
            thread,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn coordinator(dir: &Path) -> TaskCoordinator {
        let store = Arc::new(IndexStore::open(dir.join("index.bin")));
        TaskCoordinator::new(store, AppConfig::default())
    }

    #[test]
    fn rebuild_of_missing_root_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path());
        let result = coordinator.start_rebuild(&dir.path().join("nope"));
        assert!(matches!(result, Err(Error::InvalidRoot(_))));
        // Rejection must not leave the task slot occupied.
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let handle = coordinator.start_rebuild(dir.path()).unwrap();
        assert_eq!(handle.join(), TaskState::Completed);
    }

    #[test]
    fn blank_keyword_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path());
        assert!(matches!(
            coordinator.start_search("   "),
            Err(Error::EmptyKeyword)
        ));
    }

    #[test]
    fn second_task_while_one_runs_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..500 {
            fs::write(dir.path().join(format!("f{}.txt", i)), "x").unwrap();
        }
        let coordinator = coordinator(dir.path());

        let first = coordinator.start_rebuild(dir.path()).unwrap();
        // The first worker may already have finished on a fast machine, in
        // which case the second start legitimately succeeds.
        match coordinator.start_search("anything") {
            Err(e) => assert!(matches!(e, Error::TaskConflict)),
            Ok(second) => {
                second.join();
            }
        }
        first.join();

        let handle = coordinator.start_search("f1").unwrap();
        assert_eq!(handle.join(), TaskState::Completed);
    }

    #[test]
    fn cancelled_rebuild_leaves_previous_snapshot_active() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("first.txt"), "1").unwrap();

        let coordinator = coordinator(dir.path());
        let handle = coordinator.start_rebuild(dir.path()).unwrap();
        assert_eq!(handle.join(), TaskState::Completed);
        let before = coordinator.store().snapshot();
        assert_eq!(before.len(), 1);

        // A second rebuild cancelled before its first file keeps the old view.
        fs::write(dir.path().join("second.txt"), "2").unwrap();
        let handle = coordinator.start_rebuild(dir.path()).unwrap();
        handle.cancel();
        let terminal = handle.join();
        if terminal == TaskState::Cancelled {
            assert_eq!(coordinator.store().snapshot().len(), 1);
        } else {
            // Worker won the race and completed before the cancel landed.
            assert_eq!(terminal, TaskState::Completed);
        }
    }
}
