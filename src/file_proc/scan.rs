use crate::error::Error;
use crate::model::{FileEntry, IndexSnapshot};
use crate::task::messages::{IndexProgressMessage, TaskMessage};
use crate::task::CancelToken;
use chrono::{DateTime, Utc};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::{debug, error, info};
use walkdir::WalkDir;

const DISCOVERY_PROGRESS_EVERY: usize = 1000;
const STAT_PROGRESS_EVERY: usize = 100;

/// Walk `root` and build a complete new index snapshot.
///
/// Two passes: pass 1 enumerates every file path under the root (total not
/// yet known, progress is a bare discovered count), pass 2 stats each path
/// and builds the entries with percentage progress. Per-file stat failures
/// are logged and skipped. Returns `Ok(None)` when cancelled; the caller
/// must leave the active snapshot untouched in that case.
pub fn build_snapshot(
    root: &Path,
    ignore_globs: &[String],
    cancel: &CancelToken,
    tx: &Sender<TaskMessage>,
) -> Result<Option<IndexSnapshot>, Error> {
    if !root.is_dir() {
        return Err(Error::InvalidRoot(root.to_path_buf()));
    }
    let root = fs::canonicalize(root)?;

    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    let discovered = match discover_files(&root, &ignore_patterns, cancel, tx) {
        Some(discovered) => discovered,
        None => return Ok(None),
    };
    let total = discovered.len();
    debug!("Discovered {} files under {}", total, root.display());

    match build_entries(discovered, cancel, tx) {
        Some(mut snapshot) => {
            snapshot.last_update = Some(Utc::now());
            info!(
                "Indexed {} of {} discovered files under {}",
                snapshot.len(),
                total,
                root.display()
            );
            Ok(Some(snapshot))
        }
        None => Ok(None),
    }
}

/// Pass 1: enumerate every file under the root. `None` means cancelled.
fn discover_files(
    root: &Path,
    ignore_patterns: &[Pattern],
    cancel: &CancelToken,
    tx: &Sender<TaskMessage>,
) -> Option<Vec<PathBuf>> {
    let mut discovered: Vec<PathBuf> = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        !ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(entry.path()))
    });
    for entry in walker {
        if cancel.is_cancelled() {
            info!("Index rebuild cancelled during discovery");
            return None;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                error!("Error walking directory tree: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        discovered.push(entry.into_path());
        if discovered.len() % DISCOVERY_PROGRESS_EVERY == 0 {
            let _ = tx.send(TaskMessage::IndexProgress(IndexProgressMessage {
                percent: None,
                processed: discovered.len(),
                total: 0,
            }));
        }
    }
    Some(discovered)
}

/// Pass 2: stat each discovered path and build the entries. Paths that fail
/// to stat (permission, deleted since discovery) are logged and skipped;
/// they never abort the scan. `None` means cancelled.
fn build_entries(
    discovered: Vec<PathBuf>,
    cancel: &CancelToken,
    tx: &Sender<TaskMessage>,
) -> Option<IndexSnapshot> {
    let total = discovered.len();
    let mut snapshot = IndexSnapshot::default();
    let mut processed = 0usize;
    for path in discovered {
        if cancel.is_cancelled() {
            info!("Index rebuild cancelled after {} of {} files", processed, total);
            return None;
        }
        match build_entry(&path) {
            Ok(entry) => {
                snapshot.files.insert(entry.path.clone(), entry);
            }
            Err(e) => {
                error!("Error indexing {}: {}", path.display(), e);
                continue;
            }
        }
        processed += 1;
        if processed % STAT_PROGRESS_EVERY == 0 {
            let _ = tx.send(TaskMessage::IndexProgress(IndexProgressMessage {
                percent: Some(processed as f64 / total as f64 * 100.0),
                processed,
                total,
            }));
        }
    }

    let _ = tx.send(TaskMessage::IndexProgress(IndexProgressMessage {
        percent: Some(100.0),
        processed: total,
        total,
    }));
    Some(snapshot)
}

fn build_entry(path: &Path) -> std::io::Result<FileEntry> {
    let metadata = fs::metadata(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let modified: DateTime<Utc> = metadata.modified()?.into();
    Ok(FileEntry {
        path: path.to_path_buf(),
        name,
        parent,
        size: metadata.len(),
        modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn missing_root_is_rejected_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("no_such_dir");
        let (tx, _rx) = mpsc::channel();
        let result = build_snapshot(&bogus, &[], &CancelToken::new(), &tx);
        assert!(matches!(result, Err(Error::InvalidRoot(_))));
    }

    #[test]
    fn ignore_patterns_prune_matching_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("keep")).unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("keep/a.txt"), "a").unwrap();
        fs::write(dir.path().join("node_modules/b.txt"), "b").unwrap();

        let (tx, _rx) = mpsc::channel();
        let snapshot = build_snapshot(
            dir.path(),
            &["*node_modules*".to_string()],
            &CancelToken::new(),
            &tx,
        )
        .unwrap()
        .unwrap();

        assert_eq!(snapshot.len(), 1);
        let entry = snapshot.files.values().next().unwrap();
        assert_eq!(entry.name, "a.txt");
    }

    #[test]
    fn stat_failure_skips_the_entry_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.txt");
        fs::write(&kept, "still here").unwrap();
        // Discovered during pass 1, gone before pass 2 could stat it.
        let vanished = dir.path().join("vanished.txt");

        let (tx, rx) = std::sync::mpsc::channel();
        let snapshot = build_entries(
            vec![kept.clone(), vanished.clone()],
            &CancelToken::new(),
            &tx,
        )
        .unwrap();
        drop(tx);

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.files.contains_key(&kept));
        assert!(!snapshot.files.contains_key(&vanished));

        // The pass still finishes with a 100% progress message over the
        // full discovered total.
        let last = rx.iter().last().unwrap();
        match last {
            TaskMessage::IndexProgress(p) => {
                assert_eq!(p.percent, Some(100.0));
                assert_eq!(p.total, 2);
            }
            other => panic!("expected final progress, got {:?}", other),
        }
    }

    #[test]
    fn pre_cancelled_scan_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let (tx, _rx) = mpsc::channel();
        let result = build_snapshot(dir.path(), &[], &cancel, &tx).unwrap();
        assert!(result.is_none());
    }
}
