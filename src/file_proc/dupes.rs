use crate::app_config::DEFAULT_MIN_DUPE_SIZE;
use crate::file_proc::hash;
use crate::model::{DuplicateGroup, FileEntry, IndexSnapshot};
use crate::task::messages::{DupProgressMessage, DupStage, TaskMessage};
use crate::task::CancelToken;
use ahash::AHashMap;
use dashmap::DashMap;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use tracing::{debug, error, info};

const SIZE_SCAN_PROGRESS_EVERY: usize = 1000;
const PARTIAL_PROGRESS_EVERY: usize = 200;
const FULL_PROGRESS_EVERY: usize = 50;

#[derive(Debug, Clone)]
pub struct DupeOptions {
    /// Files smaller than this are excluded entirely. A file exactly at the
    /// threshold is included.
    pub min_size: u64,
    /// Restrict the scan to entries under this path.
    pub prefix: Option<PathBuf>,
}

impl Default for DupeOptions {
    fn default() -> Self {
        DupeOptions {
            min_size: DEFAULT_MIN_DUPE_SIZE,
            prefix: None,
        }
    }
}

/// Find byte-identical file sets with a three-stage funnel: size bucketing,
/// then a partial digest of each file head, then a streamed full digest.
/// Each stage only touches files the previous stage could not rule out.
///
/// Finished groups are streamed onto the channel one at a time, largest and
/// most-duplicated first. Returns false if cancelled; no partial groups are
/// emitted past the ones already flushed.
pub fn stream_duplicates(
    snapshot: &IndexSnapshot,
    options: &DupeOptions,
    cancel: &CancelToken,
    tx: &Sender<TaskMessage>,
) -> bool {
    // Stage 1: bucket eligible entries by exact size.
    let eligible: Vec<&FileEntry> = snapshot
        .files
        .values()
        .filter(|entry| {
            options
                .prefix
                .as_ref()
                .map_or(true, |prefix| entry.path.starts_with(prefix))
        })
        .collect();
    let eligible_total = eligible.len();

    let mut size_groups: AHashMap<u64, Vec<&FileEntry>> = AHashMap::new();
    for (i, entry) in eligible.into_iter().enumerate() {
        if cancel.is_cancelled() {
            info!("Duplicate scan cancelled during size bucketing");
            return false;
        }
        if entry.size >= options.min_size {
            size_groups.entry(entry.size).or_default().push(entry);
        }
        if (i + 1) % SIZE_SCAN_PROGRESS_EVERY == 0 {
            send_progress(tx, DupStage::SizeScan, i + 1, eligible_total);
        }
    }
    send_progress(tx, DupStage::SizeScan, eligible_total, eligible_total);

    // Stage 2: partial digest within size buckets that kept >= 2 members.
    let candidates: Vec<&FileEntry> = size_groups
        .values()
        .filter(|group| group.len() > 1)
        .flatten()
        .copied()
        .collect();
    let candidate_total = candidates.len();
    debug!(
        "{} size-collision candidates out of {} eligible entries",
        candidate_total, eligible_total
    );

    let partial_groups: DashMap<(u64, u64), Vec<FileEntry>> = DashMap::new();
    let hashed = AtomicUsize::new(0);
    candidates.par_iter().for_each_with(tx.clone(), |tx, entry| {
        if cancel.is_cancelled() {
            return;
        }
        match hash::partial_hash(&entry.path) {
            Ok(partial) => {
                partial_groups
                    .entry((entry.size, partial))
                    .or_default()
                    .push((*entry).clone());
            }
            Err(e) => {
                error!("Partial hash error for {}: {}", entry.path.display(), e);
            }
        }
        let done = hashed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % PARTIAL_PROGRESS_EVERY == 0 {
            send_progress(tx, DupStage::PartialHash, done, candidate_total);
        }
    });
    if cancel.is_cancelled() {
        info!("Duplicate scan cancelled during partial hashing");
        return false;
    }
    send_progress(tx, DupStage::PartialHash, candidate_total, candidate_total);

    // Stage 3: full digest within (size, partial) groups that kept >= 2.
    let remaining: Vec<FileEntry> = partial_groups
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .flat_map(|(_, group)| group)
        .collect();
    let remaining_total = remaining.len();
    debug!("{} candidates remain for full hashing", remaining_total);

    let full_groups: DashMap<(u64, String), Vec<FileEntry>> = DashMap::new();
    let fully_hashed = AtomicUsize::new(0);
    remaining.par_iter().for_each_with(tx.clone(), |tx, entry| {
        if cancel.is_cancelled() {
            return;
        }
        match hash::full_hash(&entry.path) {
            Ok(digest) => {
                full_groups
                    .entry((entry.size, digest))
                    .or_default()
                    .push(entry.clone());
            }
            Err(e) => {
                error!("Full hash error for {}: {}", entry.path.display(), e);
            }
        }
        let done = fully_hashed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % FULL_PROGRESS_EVERY == 0 {
            send_progress(tx, DupStage::FullHash, done, remaining_total);
        }
    });
    if cancel.is_cancelled() {
        info!("Duplicate scan cancelled during full hashing");
        return false;
    }
    send_progress(tx, DupStage::FullHash, remaining_total, remaining_total);

    // Assemble and stream the confirmed groups, biggest sets first.
    let mut groups: Vec<DuplicateGroup> = full_groups
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|((size, digest), mut files)| {
            files.sort_by(|a, b| a.path.cmp(&b.path));
            DuplicateGroup {
                hash: digest,
                count: files.len(),
                size,
                files,
            }
        })
        .collect();
    groups.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(b.size.cmp(&a.size))
            .then(a.hash.cmp(&b.hash))
    });

    info!("Found {} duplicate groups", groups.len());
    for group in groups {
        if cancel.is_cancelled() {
            info!("Duplicate scan cancelled while streaming groups");
            return false;
        }
        let _ = tx.send(TaskMessage::DupGroup(group));
    }
    true
}

fn send_progress(tx: &Sender<TaskMessage>, stage: DupStage, current: usize, total: usize) {
    let _ = tx.send(TaskMessage::DupProgress(DupProgressMessage {
        stage,
        current,
        total,
    }));
}
