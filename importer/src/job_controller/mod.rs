//! Drives an import from file to storage.
//!
//! - `state`: the `ImportRun` accountant owning every counter of one run.
//! - `orchestrator`: the `Importer` state machine looping over chunks.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{ImportReport, Importer};
pub use state::{ImportRun, MAX_REJECTED_SAMPLES};
