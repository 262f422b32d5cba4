use super::rules::validate_schema;
use crate::error::StoreError;
use crate::storage::{FlushReport, ProductStore};
use common::model::product::{ProductRecord, StoredProduct};
use log::{debug, warn};
use std::collections::HashMap;

/// Accepted records of one chunk, keyed by code, in first-seen order.
///
/// A later row with an already present code replaces the earlier record in
/// place.
#[derive(Debug, Default)]
pub struct AcceptedChunk {
    records: Vec<ProductRecord>,
    positions: HashMap<String, usize>,
}

impl AcceptedChunk {
    /// Adds `record`, returning `true` if it superseded one with the same code.
    pub fn insert(&mut self, record: ProductRecord) -> bool {
        match self.positions.get(&record.code) {
            Some(&position) => {
                self.records[position] = record;
                true
            }
            None => {
                self.positions.insert(record.code.clone(), self.records.len());
                self.records.push(record);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductRecord> {
        self.records.iter()
    }
}

/// What storage did with one committed chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub inserted: u64,
    pub updated: u64,
    /// Records dropped after the filter: failed post-merge validation or
    /// refused by the store.
    pub rejected: u64,
}

/// Resolves accepted records against storage and commits them chunk by chunk.
pub struct UpsertEngine {
    write_batch: usize,
}

impl UpsertEngine {
    pub fn new(write_batch: usize) -> Self {
        Self {
            write_batch: write_batch.max(1),
        }
    }

    /// Upserts every record of `chunk` inside a single transaction.
    ///
    /// Any store error rolls the whole chunk back and is returned to the
    /// caller; no record of the chunk is persisted in that case.
    pub fn commit_chunk<S: ProductStore>(
        &self,
        store: &mut S,
        chunk: &AcceptedChunk,
    ) -> Result<ChunkOutcome, StoreError> {
        store.begin_transaction()?;
        match self.stage_and_commit(store, chunk) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if let Err(rollback_err) = store.rollback() {
                    warn!("rollback after failed chunk also failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    fn stage_and_commit<S: ProductStore>(
        &self,
        store: &mut S,
        chunk: &AcceptedChunk,
    ) -> Result<ChunkOutcome, StoreError> {
        let mut report = FlushReport::default();
        let mut detached = 0u64;
        let mut staged = 0usize;

        for incoming in chunk.iter() {
            let stored = match store.find_by_code(&incoming.code)? {
                Some(mut existing) => {
                    debug!("updating product {}", incoming.code);
                    existing.merge(incoming);
                    existing
                }
                None => {
                    debug!("creating product {}", incoming.code);
                    StoredProduct::create(incoming.clone())
                }
            };

            let violations = validate_schema(&stored.product);
            if !violations.is_empty() {
                warn!(
                    "product {} failed validation after merge: {:?}",
                    incoming.code, violations
                );
                store.detach(&incoming.code);
                detached += 1;
                continue;
            }

            store.save(stored)?;
            staged += 1;
            if staged % self.write_batch == 0 {
                report.absorb(store.flush()?);
            }
        }

        report.absorb(store.commit()?);
        Ok(ChunkOutcome {
            inserted: report.inserted,
            updated: report.updated,
            rejected: report.rejected + detached,
        })
    }
}
