//! Run configuration.
//!
//! Both batch sizes come from the command line and fall back to the
//! `CSV_READER_BATCH` / `DB_WRITER_BATCH` environment variables.

use crate::error::{ImportError, ImportResult};
use clap::Args;
use std::path::PathBuf;

pub const DEFAULT_CSV_READER_BATCH: usize = 1000;
pub const DEFAULT_DB_WRITER_BATCH: usize = 100;
pub const DEFAULT_DATABASE: &str = "products.sqlite";

/// Tunables shared by the reader loop and the upsert engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Rows per chunk. One chunk is one storage transaction.
    pub csv_reader_batch: usize,
    /// Staged writes pushed to storage at once. Does not commit.
    pub db_writer_batch: usize,
    pub test_mode: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            csv_reader_batch: DEFAULT_CSV_READER_BATCH,
            db_writer_batch: DEFAULT_DB_WRITER_BATCH,
            test_mode: false,
        }
    }
}

impl ImportConfig {
    pub fn validate(&self) -> ImportResult<()> {
        if self.csv_reader_batch == 0 {
            return Err(ImportError::Config(
                "csv reader batch must be greater than zero".to_string(),
            ));
        }
        if self.db_writer_batch == 0 {
            return Err(ImportError::Config(
                "db writer batch must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Command-line half of the configuration.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Rows read (and committed) per chunk.
    #[arg(long, env = "CSV_READER_BATCH", default_value_t = DEFAULT_CSV_READER_BATCH)]
    pub csv_reader_batch: usize,

    /// Staged writes flushed to the database at once.
    #[arg(long, env = "DB_WRITER_BATCH", default_value_t = DEFAULT_DB_WRITER_BATCH)]
    pub db_writer_batch: usize,

    /// SQLite database file holding the product table.
    #[arg(long, env = "PRODUCT_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,
}

impl ConfigArgs {
    pub fn into_config(self, test_mode: bool) -> ImportResult<ImportConfig> {
        let config = ImportConfig {
            csv_reader_batch: self.csv_reader_batch,
            db_writer_batch: self.db_writer_batch,
            test_mode,
        };
        config.validate()?;
        Ok(config)
    }
}
