use crate::model::{DuplicateGroup, FileEntry};
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndexProgressMessage {
    /// None while pass 1 is still discovering files and no total is known.
    pub percent: Option<f64>,
    pub processed: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct SearchProgressMessage {
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DupStage {
    SizeScan,
    PartialHash,
    FullHash,
}

impl fmt::Display for DupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DupStage::SizeScan => write!(f, "Scanning by size"),
            DupStage::PartialHash => write!(f, "Partial hashing"),
            DupStage::FullHash => write!(f, "Full hashing"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DupProgressMessage {
    pub stage: DupStage,
    pub current: usize,
    pub total: usize,
}

/// Everything a worker can push onto its output channel. Delivery is FIFO
/// within a task; `IndexComplete`, `SearchDone`, `DupDone` and `Error` are
/// terminal.
#[derive(Debug, Clone)]
pub enum TaskMessage {
    IndexProgress(IndexProgressMessage),
    IndexComplete,
    SearchResult(FileEntry),
    SearchProgress(SearchProgressMessage),
    SearchDone,
    DupProgress(DupProgressMessage),
    DupGroup(DuplicateGroup),
    DupDone,
    Error(String),
}

impl TaskMessage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskMessage::IndexComplete
                | TaskMessage::SearchDone
                | TaskMessage::DupDone
                | TaskMessage::Error(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completion_and_error_messages_are_terminal() {
        assert!(TaskMessage::IndexComplete.is_terminal());
        assert!(TaskMessage::SearchDone.is_terminal());
        assert!(TaskMessage::DupDone.is_terminal());
        assert!(TaskMessage::Error("boom".to_string()).is_terminal());

        assert!(!TaskMessage::IndexProgress(IndexProgressMessage {
            percent: None,
            processed: 100,
            total: 0,
        })
        .is_terminal());
        assert!(!TaskMessage::DupProgress(DupProgressMessage {
            stage: DupStage::SizeScan,
            current: 1,
            total: 2,
        })
        .is_terminal());
    }
}
