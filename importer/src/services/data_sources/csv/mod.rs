//! Reads product CSV files as a stream of fixed-size chunks.
//!
//! The source file may be far larger than memory, so nothing here buffers
//! more than one chunk of rows at a time:
//! - `reader`: opens the file, resolves the header row, counts the data rows
//!   once and then hands out lazy chunks starting at any row offset. The
//!   underlying handle is seekable, so asking for an earlier offset rewinds to
//!   the first data row instead of re-opening the file.
//!
//! - `header`: maps the six expected logical columns (`code`, `name`,
//!   `description`, `stock`, `price`, `discontinued`) onto header positions.
//!   The order is fixed; only the labels are taken from the file, for error
//!   reporting.

mod header;
mod reader;

pub use header::{Field, HeaderMapping, EXPECTED_COLUMNS};
pub use reader::{Chunk, CsvProductReader, RawRow};
