use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("no open transaction")]
    NoTransaction,

    #[error("stored product {code} is unreadable: {reason}")]
    Corrupt { code: String, reason: String },
}

/// Fatal conditions of an import run.
///
/// Row-level rejections are never represented here; they only move counters.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0} format not found.")]
    BadExtension(String),

    #[error("File not exist - {}", .0.display())]
    MissingFile(PathBuf),

    #[error("malformed csv input: {0}")]
    Format(#[from] csv::Error),

    #[error("file contains no rows")]
    NoRows,

    #[error("invalid header: expected at least 6 columns, found {found}")]
    InvalidHeader { found: usize },

    #[error("file contains a header but no data rows")]
    EmptyFile,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage unavailable: {0}")]
    Storage(#[from] StoreError),

    #[error("chunk at offset {offset} rolled back: {source}")]
    Transaction {
        offset: u64,
        #[source]
        source: StoreError,
    },
}

impl ImportError {
    /// Conditions reported to the user as "File data is empty or invalid".
    pub fn is_empty_or_invalid(&self) -> bool {
        matches!(
            self,
            ImportError::NoRows | ImportError::InvalidHeader { .. } | ImportError::EmptyFile
        )
    }

    /// Conditions detected before the file is even opened.
    pub fn is_pre_flight(&self) -> bool {
        matches!(
            self,
            ImportError::BadExtension(_) | ImportError::MissingFile(_)
        )
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
