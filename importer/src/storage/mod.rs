//! Storage seam of the import pipeline.
//!
//! The upsert engine only talks to [`ProductStore`]; `sqlite` provides the
//! backend the binary ships with.

mod sqlite;

pub use sqlite::SqliteProductStore;

use crate::error::StoreError;
use common::model::product::StoredProduct;

/// Outcome of pushing staged writes to storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub inserted: u64,
    pub updated: u64,
    /// Writes refused by the store itself, e.g. a unique-code violation.
    pub rejected: u64,
}

impl FlushReport {
    pub fn absorb(&mut self, other: FlushReport) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.rejected += other.rejected;
    }
}

/// What the import core requires from a persistent product store.
///
/// Writes are staged by `save` and only become durable on `commit`. `flush`
/// may push staged writes early but must stay inside the open transaction.
pub trait ProductStore {
    fn find_by_code(&self, code: &str) -> Result<Option<StoredProduct>, StoreError>;

    /// Stages a create (no id) or update (with id).
    fn save(&mut self, product: StoredProduct) -> Result<(), StoreError>;

    /// Drops any staged, unwritten change for `code`.
    fn detach(&mut self, code: &str);

    fn flush(&mut self) -> Result<FlushReport, StoreError>;

    fn begin_transaction(&mut self) -> Result<(), StoreError>;

    /// Flushes what is left and makes the transaction durable.
    fn commit(&mut self) -> Result<FlushReport, StoreError>;

    /// Discards staged writes and undoes everything since `begin_transaction`.
    fn rollback(&mut self) -> Result<(), StoreError>;
}
