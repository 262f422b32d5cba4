//! # Import Orchestrator
//!
//! Runs the Reader -> Normalizer -> Filter -> Upsert pipeline one chunk at a
//! time and tracks the run through `common::jobs::ImportState`.
//!
//! ## Workflow
//!
//! 1.  **Init**: the source is opened and scanned once. A source that cannot
//!     be read, or has no rows at all, ends in `BadFormat`.
//!
//! 2.  **HeaderResolved**: the header row is mapped onto the six logical
//!     columns. A short header, or a header without data rows, ends in
//!     `InvalidHeader`. Storage has not been touched at this point.
//!
//! 3.  **Streaming**: for each chunk of `csv_reader_batch` rows, normalization
//!     and rule checks run in parallel over the chunk (row order is kept) and
//!     the accepted records are committed as one transaction. The chunk's
//!     verdicts reach the run counters only once that commit succeeded. Test
//!     mode skips the commit and records the verdicts directly. The loop is
//!     bounded by the row count fixed at open, not by spotting an empty chunk.
//!
//! 4.  **Done**, or **Aborted** when a chunk's transaction failed. An aborted
//!     run still returns its report: counters cover only the chunks committed
//!     before the failure, and nothing of the failed chunk is persisted or
//!     counted.

use crate::config::ImportConfig;
use crate::error::{ImportError, ImportResult};
use crate::job_controller::state::ImportRun;
use crate::services::data_sources::csv::{CsvProductReader, HeaderMapping, RawRow};
use crate::services::products::{classify, normalize, AcceptedChunk, UpsertEngine};
use crate::storage::ProductStore;
use chrono::{DateTime, Utc};
use common::jobs::ImportState;
use common::model::summary::ImportSummary;
use log::{debug, error, info};
use rayon::prelude::*;
use std::io::{Read, Seek};
use std::path::Path;

/// Result of a run that got past the header.
#[derive(Debug)]
pub struct ImportReport {
    pub run: ImportRun,
    /// The transactional failure that stopped the run early, if any.
    pub aborted: Option<ImportError>,
}

impl ImportReport {
    pub fn summary(&self) -> ImportSummary {
        self.run
            .summary(self.aborted.as_ref().map(ToString::to_string))
    }
}

pub struct Importer {
    config: ImportConfig,
    state: ImportState,
}

impl Importer {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            state: ImportState::Init,
        }
    }

    pub fn state(&self) -> &ImportState {
        &self.state
    }

    /// Imports the CSV file at `path`. In test mode `store` is never touched.
    pub fn import_file<S: ProductStore>(
        &mut self,
        path: &Path,
        store: &mut S,
    ) -> ImportResult<ImportReport> {
        self.config.validate()?;
        let reader = match CsvProductReader::open(path) {
            Ok(reader) => reader,
            Err(err) => {
                self.transition(ImportState::BadFormat);
                return Err(err);
            }
        };
        self.import(reader, store)
    }

    /// Imports from an already opened reader.
    pub fn import<R: Read + Seek, S: ProductStore>(
        &mut self,
        mut reader: CsvProductReader<R>,
        store: &mut S,
    ) -> ImportResult<ImportReport> {
        self.config.validate()?;
        let mut run = ImportRun::new(self.config.test_mode);
        info!(
            "[{}] import started (chunk {}, write batch {}, test mode {})",
            run.run_id(),
            self.config.csv_reader_batch,
            self.config.db_writer_batch,
            self.config.test_mode
        );

        self.transition(ImportState::HeaderResolved);
        let mut header = HeaderMapping::default();
        if !header.set(reader.header_row()) {
            self.transition(ImportState::InvalidHeader);
            return Err(ImportError::InvalidHeader {
                found: reader.header_row().len(),
            });
        }
        run.set_header(header);

        let total = reader.row_count();
        if total == 0 {
            self.transition(ImportState::InvalidHeader);
            return Err(ImportError::EmptyFile);
        }
        info!("[{}] {} data rows to process", run.run_id(), total);

        let engine = UpsertEngine::new(self.config.db_writer_batch);
        let now = Utc::now();
        let mut offset = 0u64;

        while offset < total {
            self.transition(ImportState::Streaming { offset });

            let rows = match reader
                .read_chunk(offset, self.config.csv_reader_batch)
                .and_then(|chunk| chunk.collect::<ImportResult<Vec<RawRow>>>())
            {
                Ok(rows) => rows,
                Err(err) => return Ok(self.abort(run, err)),
            };
            if rows.is_empty() {
                break;
            }

            let verdicts = classify_chunk(&rows, run.header(), now);
            if !self.config.test_mode && !verdicts.accepted.is_empty() {
                match engine.commit_chunk(store, &verdicts.accepted) {
                    Ok(outcome) => {
                        debug!(
                            "[{}] chunk at {} committed: {:?}",
                            run.run_id(),
                            offset,
                            outcome
                        );
                        verdicts.record(&rows, &mut run);
                        run.reconcile_commit(outcome);
                    }
                    Err(source) => {
                        return Ok(self.abort(run, ImportError::Transaction { offset, source }));
                    }
                }
            } else {
                verdicts.record(&rows, &mut run);
            }

            offset += rows.len() as u64;
            info!(
                "[{}] {}/{} rows processed ({} valid, {} error)",
                run.run_id(),
                run.rows_processed(),
                total,
                run.rows_valid(),
                run.rows_error()
            );
        }

        self.transition(ImportState::Done);
        info!(
            "[{}] import finished: {} processed, {} valid, {} error",
            run.run_id(),
            run.rows_processed(),
            run.rows_valid(),
            run.rows_error()
        );
        Ok(ImportReport { run, aborted: None })
    }

    fn abort(&mut self, run: ImportRun, err: ImportError) -> ImportReport {
        error!("[{}] import aborted: {}", run.run_id(), err);
        self.transition(ImportState::Aborted(err.to_string()));
        ImportReport {
            run,
            aborted: Some(err),
        }
    }

    fn transition(&mut self, next: ImportState) {
        debug!("import state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Filter-stage verdicts of one chunk, held back until the chunk is settled.
struct ChunkVerdicts {
    accepted: AcceptedChunk,
    accepted_rows: u64,
    /// Index into the chunk's rows, with the rejection reason.
    rejected: Vec<(usize, String)>,
}

impl ChunkVerdicts {
    /// Folds the verdicts into the run counters and the error view.
    fn record(&self, rows: &[RawRow], run: &mut ImportRun) {
        for (idx, reason) in &self.rejected {
            run.record_rejected_row(&rows[*idx], reason.clone());
        }
        run.record_chunk(
            rows.len() as u64,
            self.accepted_rows,
            self.rejected.len() as u64,
        );
    }
}

/// Normalizes and filters one chunk without touching the run counters.
fn classify_chunk(rows: &[RawRow], header: &HeaderMapping, now: DateTime<Utc>) -> ChunkVerdicts {
    let verdicts: Vec<_> = rows
        .par_iter()
        .map(|row| {
            let record = normalize(row, header, now);
            let verdict = classify(&record);
            (record, verdict)
        })
        .collect();

    let mut accepted = AcceptedChunk::default();
    let mut accepted_rows = 0u64;
    let mut rejected = Vec::new();
    for (idx, (row, (record, verdict))) in rows.iter().zip(verdicts).enumerate() {
        match verdict {
            Ok(()) => {
                accepted.insert(record);
                accepted_rows += 1;
            }
            Err(rejection) => {
                debug!("line {} rejected: {}", row.line, rejection);
                rejected.push((idx, rejection.to_string()));
            }
        }
    }
    ChunkVerdicts {
        accepted,
        accepted_rows,
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::storage::{FlushReport, SqliteProductStore};
    use common::model::product::StoredProduct;
    use std::io::Cursor;

    const HEADER: &str = "code,name,description,stock,price,discontinued\n";

    fn reader(body: &str) -> CsvProductReader<Cursor<Vec<u8>>> {
        CsvProductReader::from_reader(Cursor::new(body.as_bytes().to_vec())).expect("opens")
    }

    /// SQLite store whose commits start failing once `commits_left` runs out.
    struct FlakyCommitStore {
        inner: SqliteProductStore,
        commits_left: usize,
    }

    impl ProductStore for FlakyCommitStore {
        fn find_by_code(&self, code: &str) -> Result<Option<StoredProduct>, StoreError> {
            self.inner.find_by_code(code)
        }
        fn save(&mut self, product: StoredProduct) -> Result<(), StoreError> {
            self.inner.save(product)
        }
        fn detach(&mut self, code: &str) {
            self.inner.detach(code)
        }
        fn flush(&mut self) -> Result<FlushReport, StoreError> {
            self.inner.flush()
        }
        fn begin_transaction(&mut self) -> Result<(), StoreError> {
            self.inner.begin_transaction()
        }
        fn commit(&mut self) -> Result<FlushReport, StoreError> {
            if self.commits_left == 0 {
                self.inner.flush()?;
                return Err(StoreError::Corrupt {
                    code: "*".to_string(),
                    reason: "disk full".to_string(),
                });
            }
            self.commits_left -= 1;
            self.inner.commit()
        }
        fn rollback(&mut self) -> Result<(), StoreError> {
            self.inner.rollback()
        }
    }

    fn config(chunk: usize, test_mode: bool) -> ImportConfig {
        ImportConfig {
            csv_reader_batch: chunk,
            db_writer_batch: 2,
            test_mode,
        }
    }

    #[test]
    fn accepted_row_is_counted_valid() {
        let mut store = SqliteProductStore::open_in_memory().unwrap();
        let mut importer = Importer::new(config(10, false));
        let report = importer
            .import(reader(&format!("{HEADER}P0001,TV,32 Tv,10,399.99,\n")), &mut store)
            .unwrap();

        assert_eq!(report.run.rows_valid(), 1);
        assert_eq!(report.run.rows_error(), 0);
        assert_eq!(importer.state(), &ImportState::Done);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn low_stock_row_is_counted_error() {
        let mut store = SqliteProductStore::open_in_memory().unwrap();
        let report = Importer::new(config(10, false))
            .import(reader(&format!("{HEADER}P0002,Fan,Desk Fan,1,20.00,\n")), &mut store)
            .unwrap();

        assert_eq!(report.run.rows_valid(), 0);
        assert_eq!(report.run.rows_error(), 1);
        assert_eq!(report.run.rejected_rows()[0].line, 2);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn header_without_rows_is_empty_file() {
        let mut store = SqliteProductStore::open_in_memory().unwrap();
        let mut importer = Importer::new(config(10, false));
        let result = importer.import(reader(HEADER), &mut store);

        assert!(matches!(result, Err(ImportError::EmptyFile)));
        assert_eq!(importer.state(), &ImportState::InvalidHeader);
    }

    #[test]
    fn short_header_is_invalid() {
        let mut store = SqliteProductStore::open_in_memory().unwrap();
        let mut importer = Importer::new(config(10, false));
        let result = importer.import(reader("code,name,description\nP1,a,b\n"), &mut store);

        assert!(matches!(result, Err(ImportError::InvalidHeader { found: 3 })));
        assert_eq!(importer.state(), &ImportState::InvalidHeader);
    }

    #[test]
    fn row_count_multiple_of_chunk_size_ends_cleanly() {
        let mut body = HEADER.to_string();
        for i in 0..6 {
            body.push_str(&format!("P{i:04},TV,32 Tv,10,399.99,\n"));
        }
        let mut store = SqliteProductStore::open_in_memory().unwrap();
        let report = Importer::new(config(3, false))
            .import(reader(&body), &mut store)
            .unwrap();

        let summary = report.summary();
        assert_eq!(summary.rows_processed, 6);
        assert_eq!(summary.rows_inserted, 6);
        assert_eq!(summary.chunks_committed, 2);
    }

    #[test]
    fn test_mode_classifies_without_writing() {
        let body = format!("{HEADER}P0001,TV,32 Tv,10,399.99,\nP0002,Fan,Desk Fan,1,20.00,\n");
        let mut store = SqliteProductStore::open_in_memory().unwrap();
        let report = Importer::new(config(1, true))
            .import(reader(&body), &mut store)
            .unwrap();

        assert_eq!(report.run.rows_valid(), 1);
        assert_eq!(report.run.rows_error(), 1);
        assert!(report.summary().test_mode);
        assert_eq!(store.count().unwrap(), 0);
        assert!(!store.in_transaction());
    }

    #[test]
    fn failed_commit_leaves_counters_at_last_committed_chunk() {
        let body = format!(
            "{HEADER}P0001,TV,32 Tv,10,399.99,\nP0002,CD Player,Nice CD,11,50.12,\n\
             P0003,VCR,Top notch VCR,12,39.33,\nP0004,Fan,Desk Fan,1,20.00,\n"
        );
        let mut store = FlakyCommitStore {
            inner: SqliteProductStore::open_in_memory().unwrap(),
            commits_left: 1,
        };
        let mut importer = Importer::new(config(2, false));
        let report = importer.import(reader(&body), &mut store).unwrap();

        assert!(matches!(
            report.aborted,
            Some(ImportError::Transaction { offset: 2, .. })
        ));
        assert!(matches!(importer.state(), ImportState::Aborted(_)));

        let summary = report.summary();
        assert_eq!(summary.rows_processed, 2);
        assert_eq!(summary.rows_valid, 2);
        assert_eq!(summary.rows_error, 0);
        assert_eq!(summary.rows_inserted, 2);
        assert_eq!(summary.chunks_committed, 1);
        assert!(summary.aborted.is_some());
        assert!(report.run.rejected_rows().is_empty());

        assert_eq!(store.inner.count().unwrap(), 2);
        assert!(store.inner.find_by_code("P0003").unwrap().is_none());
        assert!(!store.inner.in_transaction());
    }
}
