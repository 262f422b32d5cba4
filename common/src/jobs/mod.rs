use serde::Serialize;

/// Lifecycle of a single import invocation.
///
/// The orchestrator walks `Init -> HeaderResolved -> Streaming -> Done`. The
/// remaining variants are terminal error exits: `BadFormat` is reachable only
/// from `Init`, `InvalidHeader` only from `HeaderResolved`, and `Aborted` from
/// `Streaming` after a chunk was rolled back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ImportState {
    Init,
    HeaderResolved,
    /// Streaming data rows. Carries the offset of the next chunk to read.
    Streaming { offset: u64 },
    Done,
    BadFormat,
    /// Missing header columns or a file without data rows.
    InvalidHeader,
    Aborted(String),
}

impl ImportState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportState::Done
                | ImportState::BadFormat
                | ImportState::InvalidHeader
                | ImportState::Aborted(_)
        )
    }
}
