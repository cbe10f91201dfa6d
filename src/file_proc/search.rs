use crate::model::{FileEntry, IndexSnapshot};
use crate::task::messages::{SearchProgressMessage, TaskMessage};
use crate::task::CancelToken;
use std::sync::mpsc::Sender;
use tracing::{debug, info};

const SEARCH_PROGRESS_EVERY: usize = 10;

/// All entries whose lower-cased name contains `keyword`, sorted by name.
/// An empty result is valid, not an error.
pub fn search(snapshot: &IndexSnapshot, keyword: &str) -> Vec<FileEntry> {
    let keyword = keyword.to_lowercase();
    let mut matches: Vec<FileEntry> = snapshot
        .files
        .values()
        .filter(|entry| entry.name.contains(&keyword))
        .cloned()
        .collect();
    matches.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("Found {} matches for '{}'", matches.len(), keyword);
    matches
}

/// Run a search over the snapshot and stream each match onto the channel,
/// with a progress count every few results. Returns false if cancelled.
pub fn stream_matches(
    snapshot: &IndexSnapshot,
    keyword: &str,
    cancel: &CancelToken,
    tx: &Sender<TaskMessage>,
) -> bool {
    let matches = search(snapshot, keyword);
    let total = matches.len();

    for (i, entry) in matches.into_iter().enumerate() {
        if cancel.is_cancelled() {
            info!("Search cancelled after {} of {} matches", i, total);
            return false;
        }
        let _ = tx.send(TaskMessage::SearchResult(entry));
        let current = i + 1;
        if current % SEARCH_PROGRESS_EVERY == 0 || current == total {
            let _ = tx.send(TaskMessage::SearchProgress(SearchProgressMessage {
                current,
                total,
            }));
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn snapshot_of(names: &[&str]) -> IndexSnapshot {
        let mut snapshot = IndexSnapshot::default();
        for name in names {
            let path = PathBuf::from(format!("/srv/files/{}", name));
            let entry = FileEntry {
                name: name.to_lowercase(),
                parent: PathBuf::from("/srv/files"),
                path: path.clone(),
                size: 10,
                modified: Utc::now(),
            };
            snapshot.files.insert(path, entry);
        }
        snapshot
    }

    #[test]
    fn match_is_case_insensitive_substring() {
        let snapshot = snapshot_of(&["Report.pdf", "annual_report_2024.pdf", "invoice.pdf"]);
        let results = search(&snapshot, "REPORT");
        let names: Vec<&str> = results.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["annual_report_2024.pdf", "report.pdf"]);
    }

    #[test]
    fn no_match_yields_empty_result() {
        let snapshot = snapshot_of(&["invoice.pdf"]);
        assert!(search(&snapshot, "report").is_empty());
    }

    #[test]
    fn results_are_sorted_by_name() {
        let snapshot = snapshot_of(&["zeta.txt", "alpha.txt", "mid.txt"]);
        let results = search(&snapshot, ".txt");
        let names: Vec<&str> = results.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.txt", "mid.txt", "zeta.txt"]);
    }

    #[test]
    fn streamed_matches_end_with_final_progress() {
        let snapshot = snapshot_of(&["a_report.txt", "b_report.txt", "c_report.txt"]);
        let (tx, rx) = std::sync::mpsc::channel();
        let completed = stream_matches(&snapshot, "report", &CancelToken::new(), &tx);
        assert!(completed);
        drop(tx);

        let messages: Vec<TaskMessage> = rx.iter().collect();
        let results = messages
            .iter()
            .filter(|m| matches!(m, TaskMessage::SearchResult(_)))
            .count();
        assert_eq!(results, 3);
        match messages.last().unwrap() {
            TaskMessage::SearchProgress(p) => {
                assert_eq!(p.current, 3);
                assert_eq!(p.total, 3);
            }
            other => panic!("expected final progress, got {:?}", other),
        }
    }
}
