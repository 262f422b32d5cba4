//! Product-specific stages of the import pipeline.
//!
//! - `normalize`: raw row to typed candidate, with permissive numeric parsing.
//! - `rules`: business bounds plus field-level schema checks, returning a
//!   structured `Rejection` instead of a bare flag.
//! - `upsert`: lookup-then-merge by code and the per-chunk transaction.

pub mod normalize;
pub mod rules;
pub mod upsert;

pub use normalize::normalize;
pub use rules::{classify, is_acceptable, validate_schema, Rejection, Violation};
pub use upsert::{AcceptedChunk, ChunkOutcome, UpsertEngine};
