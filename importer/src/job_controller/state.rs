//! Per-invocation bookkeeping of an import.
//!
//! `ImportRun` is the single owner of every counter of one run. The
//! orchestrator feeds it once a chunk is settled, i.e. committed or classified
//! in test mode; a chunk whose transaction failed never reaches it:
//! - filter stage: `rows_processed`, `rows_valid` and `rows_error` grow by the
//!   chunk's read/accepted/rejected counts.
//! - commit stage: rows storage refused are moved from valid to error, since a
//!   valid count is provisional until storage confirms it.
//!
//! Counters only ever move forward (the valid-to-error move never changes
//! `rows_processed`), so `rows_processed == rows_valid + rows_error` holds
//! between chunks as well as at the end.

use crate::services::data_sources::csv::{HeaderMapping, RawRow};
use crate::services::products::ChunkOutcome;
use common::model::summary::{ImportSummary, RejectedRow};
use uuid::Uuid;

/// Rejected rows kept for the error view.
pub const MAX_REJECTED_SAMPLES: usize = 100;

#[derive(Debug, Clone)]
pub struct ImportRun {
    run_id: Uuid,
    test_mode: bool,
    header: HeaderMapping,
    rows_processed: u64,
    rows_valid: u64,
    rows_error: u64,
    rows_inserted: u64,
    rows_updated: u64,
    chunks_committed: u64,
    rejected: Vec<RejectedRow>,
}

impl ImportRun {
    pub fn new(test_mode: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            test_mode,
            header: HeaderMapping::default(),
            rows_processed: 0,
            rows_valid: 0,
            rows_error: 0,
            rows_inserted: 0,
            rows_updated: 0,
            chunks_committed: 0,
            rejected: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn set_header(&mut self, header: HeaderMapping) {
        self.header = header;
    }

    pub fn header(&self) -> &HeaderMapping {
        &self.header
    }

    /// Adds the filter-stage totals of one chunk.
    pub fn record_chunk(&mut self, read: u64, accepted: u64, rejected: u64) {
        debug_assert_eq!(read, accepted + rejected);
        self.rows_processed += read;
        self.rows_valid += accepted;
        self.rows_error += rejected;
    }

    /// Keeps `row` for the error view while there is room.
    pub fn record_rejected_row(&mut self, row: &RawRow, reason: String) {
        if self.rejected.len() < MAX_REJECTED_SAMPLES {
            self.rejected.push(RejectedRow {
                line: row.line,
                fields: row.fields.clone(),
                reason,
            });
        }
    }

    /// Applies what storage reported for a committed chunk.
    pub fn reconcile_commit(&mut self, outcome: ChunkOutcome) {
        let refused = outcome.rejected.min(self.rows_valid);
        self.rows_valid -= refused;
        self.rows_error += refused;
        self.rows_inserted += outcome.inserted;
        self.rows_updated += outcome.updated;
        self.chunks_committed += 1;
    }

    pub fn rows_processed(&self) -> u64 {
        self.rows_processed
    }

    pub fn rows_valid(&self) -> u64 {
        self.rows_valid
    }

    pub fn rows_error(&self) -> u64 {
        self.rows_error
    }

    pub fn rows_inserted(&self) -> u64 {
        self.rows_inserted
    }

    pub fn rows_updated(&self) -> u64 {
        self.rows_updated
    }

    pub fn rejected_rows(&self) -> &[RejectedRow] {
        &self.rejected
    }

    pub fn summary(&self, aborted: Option<String>) -> ImportSummary {
        ImportSummary {
            run_id: self.run_id.to_string(),
            test_mode: self.test_mode,
            rows_processed: self.rows_processed,
            rows_valid: self.rows_valid,
            rows_error: self.rows_error,
            rows_inserted: self.rows_inserted,
            rows_updated: self.rows_updated,
            chunks_committed: self.chunks_committed,
            aborted,
        }
    }
}
