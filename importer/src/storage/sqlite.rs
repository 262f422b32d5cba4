use super::{FlushReport, ProductStore};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use common::model::product::{ProductRecord, StoredProduct};
use log::{debug, warn};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

const CREATE_PRODUCTS: &str = "
    CREATE TABLE IF NOT EXISTS products (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        code              TEXT    NOT NULL UNIQUE,
        name              TEXT    NOT NULL,
        description       TEXT    NOT NULL,
        stock             INTEGER NOT NULL,
        price             TEXT    NOT NULL,
        discontinued      INTEGER NOT NULL DEFAULT 0,
        date_added        TEXT    NOT NULL,
        date_discontinued TEXT,
        last_modified     TEXT    NOT NULL
    );";

const SELECT_BY_CODE: &str = "
    SELECT id, code, name, description, stock, price, discontinued,
           date_added, date_discontinued, last_modified
    FROM products WHERE code = ?1";

const INSERT_PRODUCT: &str = "
    INSERT INTO products (code, name, description, stock, price, discontinued,
                          date_added, date_discontinued, last_modified)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const UPDATE_PRODUCT: &str = "
    UPDATE products
    SET code = ?2, name = ?3, description = ?4, stock = ?5, price = ?6,
        discontinued = ?7, date_added = ?8, date_discontinued = ?9, last_modified = ?10
    WHERE id = ?1";

enum WriteKind {
    Inserted,
    Updated,
}

/// SQLite-backed product store.
///
/// Dropping the store with a transaction still open rolls it back.
pub struct SqliteProductStore {
    conn: Connection,
    pending: Vec<StoredProduct>,
    in_transaction: bool,
}

impl SqliteProductStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(CREATE_PRODUCTS)?;
        Ok(Self {
            conn,
            pending: Vec::new(),
            in_transaction: false,
        })
    }

    /// Number of stored products.
    pub fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

impl ProductStore for SqliteProductStore {
    fn find_by_code(&self, code: &str) -> Result<Option<StoredProduct>, StoreError> {
        if let Some(staged) = self.pending.iter().rev().find(|p| p.code() == code) {
            return Ok(Some(staged.clone()));
        }
        let row = self
            .conn
            .prepare_cached(SELECT_BY_CODE)?
            .query_row(params![code], ProductRow::from_row)
            .optional()?;
        row.map(ProductRow::into_stored).transpose()
    }

    fn save(&mut self, product: StoredProduct) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.pending.push(product);
        Ok(())
    }

    fn detach(&mut self, code: &str) {
        self.pending.retain(|p| p.code() != code);
    }

    fn flush(&mut self) -> Result<FlushReport, StoreError> {
        let mut report = FlushReport::default();
        if self.pending.is_empty() {
            return Ok(report);
        }
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }

        let pending = std::mem::take(&mut self.pending);
        for product in &pending {
            self.conn.execute_batch("SAVEPOINT product_write")?;
            match write_product(&self.conn, product) {
                Ok(WriteKind::Inserted) => report.inserted += 1,
                Ok(WriteKind::Updated) => report.updated += 1,
                Err(err) if is_constraint_violation(&err) => {
                    self.conn.execute_batch("ROLLBACK TO product_write")?;
                    warn!("product {} rejected by storage: {}", product.code(), err);
                    report.rejected += 1;
                }
                Err(err) => return Err(err.into()),
            }
            self.conn.execute_batch("RELEASE product_write")?;
        }
        debug!(
            "flushed {} writes ({} inserted, {} updated, {} rejected)",
            pending.len(),
            report.inserted,
            report.updated,
            report.rejected
        );
        Ok(report)
    }

    fn begin_transaction(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<FlushReport, StoreError> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        let report = self.flush()?;
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(report)
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.pending.clear();
        if self.in_transaction {
            self.in_transaction = false;
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

impl Drop for SqliteProductStore {
    fn drop(&mut self) {
        if self.in_transaction {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                warn!("rollback on drop failed: {}", err);
            }
        }
    }
}

fn write_product(conn: &Connection, stored: &StoredProduct) -> rusqlite::Result<WriteKind> {
    let p = &stored.product;
    let price = p.price.to_string();
    match stored.id {
        None => {
            conn.prepare_cached(INSERT_PRODUCT)?.execute(params![
                p.code,
                p.name,
                p.description,
                p.stock,
                price,
                p.discontinued,
                p.date_added,
                p.date_discontinued,
                p.last_modified
            ])?;
            Ok(WriteKind::Inserted)
        }
        Some(id) => {
            conn.prepare_cached(UPDATE_PRODUCT)?.execute(params![
                id,
                p.code,
                p.name,
                p.description,
                p.stock,
                price,
                p.discontinued,
                p.date_added,
                p.date_discontinued,
                p.last_modified
            ])?;
            Ok(WriteKind::Updated)
        }
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

struct ProductRow {
    id: i64,
    code: String,
    name: String,
    description: String,
    stock: i64,
    price: String,
    discontinued: bool,
    date_added: DateTime<Utc>,
    date_discontinued: Option<DateTime<Utc>>,
    last_modified: DateTime<Utc>,
}

impl ProductRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            stock: row.get(4)?,
            price: row.get(5)?,
            discontinued: row.get(6)?,
            date_added: row.get(7)?,
            date_discontinued: row.get(8)?,
            last_modified: row.get(9)?,
        })
    }

    fn into_stored(self) -> Result<StoredProduct, StoreError> {
        let price = Decimal::from_str(&self.price).map_err(|e| StoreError::Corrupt {
            code: self.code.clone(),
            reason: format!("price {:?}: {}", self.price, e),
        })?;
        Ok(StoredProduct {
            id: Some(self.id),
            product: ProductRecord {
                code: self.code,
                name: self.name,
                description: self.description,
                stock: self.stock,
                price,
                discontinued: self.discontinued,
                date_added: self.date_added,
                date_discontinued: self.date_discontinued,
                last_modified: self.last_modified,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str) -> ProductRecord {
        let now = Utc::now();
        ProductRecord {
            code: code.to_string(),
            name: "TV".to_string(),
            description: "32 Tv".to_string(),
            stock: 10,
            price: Decimal::new(39999, 2),
            discontinued: false,
            date_added: now,
            date_discontinued: None,
            last_modified: now,
        }
    }

    #[test]
    fn commit_assigns_id_and_round_trips_fields() {
        let mut store = SqliteProductStore::open_in_memory().unwrap();
        store.begin_transaction().unwrap();
        store.save(StoredProduct::create(record("P0001"))).unwrap();
        let report = store.commit().unwrap();

        assert_eq!(report.inserted, 1);
        let stored = store.find_by_code("P0001").unwrap().expect("stored");
        assert!(stored.id.is_some());
        assert_eq!(stored.product.price, Decimal::new(39999, 2));
        assert_eq!(stored.product.name, "TV");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn update_keeps_id() {
        let mut store = SqliteProductStore::open_in_memory().unwrap();
        store.begin_transaction().unwrap();
        store.save(StoredProduct::create(record("P0001"))).unwrap();
        store.commit().unwrap();
        let mut stored = store.find_by_code("P0001").unwrap().unwrap();
        let id = stored.id;

        stored.product.stock = 99;
        store.begin_transaction().unwrap();
        store.save(stored).unwrap();
        let report = store.commit().unwrap();

        assert_eq!(report.updated, 1);
        let reloaded = store.find_by_code("P0001").unwrap().unwrap();
        assert_eq!(reloaded.id, id);
        assert_eq!(reloaded.product.stock, 99);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn duplicate_code_is_rejected_not_fatal() {
        let mut store = SqliteProductStore::open_in_memory().unwrap();
        store.begin_transaction().unwrap();
        store.save(StoredProduct::create(record("P0001"))).unwrap();
        store.save(StoredProduct::create(record("P0001"))).unwrap();
        store.save(StoredProduct::create(record("P0002"))).unwrap();
        let report = store.commit().unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn rollback_discards_flushed_writes() {
        let mut store = SqliteProductStore::open_in_memory().unwrap();
        store.begin_transaction().unwrap();
        store.save(StoredProduct::create(record("P0001"))).unwrap();
        store.flush().unwrap();
        store.rollback().unwrap();

        assert!(!store.in_transaction());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn staged_writes_are_visible_before_flush() {
        let mut store = SqliteProductStore::open_in_memory().unwrap();
        store.begin_transaction().unwrap();
        store.save(StoredProduct::create(record("P0001"))).unwrap();

        assert!(store.find_by_code("P0001").unwrap().is_some());
        store.detach("P0001");
        assert!(store.find_by_code("P0001").unwrap().is_none());
        store.rollback().unwrap();
    }

    #[test]
    fn save_outside_transaction_fails() {
        let mut store = SqliteProductStore::open_in_memory().unwrap();
        let result = store.save(StoredProduct::create(record("P0001")));
        assert!(matches!(result, Err(StoreError::NoTransaction)));
    }

    #[test]
    fn drop_rolls_back_open_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.sqlite");
        {
            let mut store = SqliteProductStore::open(&path).unwrap();
            store.begin_transaction().unwrap();
            store.save(StoredProduct::create(record("P0001"))).unwrap();
            store.flush().unwrap();
        }
        let store = SqliteProductStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }
}
