use serde::{Deserialize, Serialize};

/// A rejected input row kept for the error view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// 1-based physical line in the source file.
    pub line: u64,
    pub fields: Vec<String>,
    pub reason: String,
}

/// Final (or partial, on abort) totals of one import run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub run_id: String,
    pub test_mode: bool,
    pub rows_processed: u64,
    pub rows_valid: u64,
    pub rows_error: u64,
    /// Records created in storage. Always 0 in test mode.
    pub rows_inserted: u64,
    /// Existing records overwritten by a matching code. Always 0 in test mode.
    pub rows_updated: u64,
    pub chunks_committed: u64,
    /// Set when a transactional failure stopped the run early.
    pub aborted: Option<String>,
}

impl ImportSummary {
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}
