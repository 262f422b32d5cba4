pub mod config;
pub mod error;
pub mod job_controller;
pub mod report;
pub mod services;
pub mod storage;

pub use config::ImportConfig;
pub use error::{ImportError, ImportResult, StoreError};
pub use job_controller::{ImportReport, ImportRun, Importer};
pub use storage::{ProductStore, SqliteProductStore};
