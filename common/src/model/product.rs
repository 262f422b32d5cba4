use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Literal that marks a product as discontinued in the source file.
///
/// The comparison is exact and case-sensitive: `Yes` or `YES` do not count.
pub const DISCONTINUED_YES: &str = "yes";

/// One product as described by a single input row.
///
/// `code` is the natural key. The storage-assigned surrogate id lives on
/// [`StoredProduct`] and is never part of the input format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub code: String,
    pub name: String,
    pub description: String,
    pub stock: i64,
    /// Always carries at most two fractional digits.
    pub price: Decimal,
    pub discontinued: bool,
    pub date_added: DateTime<Utc>,
    pub date_discontinued: Option<DateTime<Utc>>,
    pub last_modified: DateTime<Utc>,
}

/// A product as known to storage: the record plus its surrogate id.
///
/// `id` is `None` until the store assigns one on the first write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProduct {
    pub id: Option<i64>,
    pub product: ProductRecord,
}

impl StoredProduct {
    /// Wraps a freshly normalized record that has never been written.
    pub fn create(product: ProductRecord) -> Self {
        Self { id: None, product }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn code(&self) -> &str {
        &self.product.code
    }

    /// Applies an incoming record onto this stored one.
    ///
    /// Identity and `date_added` are kept. `date_discontinued` is append-only:
    /// it is set the first time the product arrives discontinued and never
    /// cleared afterwards, even if a later import drops the flag.
    pub fn merge(&mut self, incoming: &ProductRecord) {
        let current = &mut self.product;
        current.name = incoming.name.clone();
        current.description = incoming.description.clone();
        current.stock = incoming.stock;
        current.price = incoming.price;

        if incoming.discontinued && current.date_discontinued.is_none() {
            current.date_discontinued =
                Some(incoming.date_discontinued.unwrap_or(incoming.last_modified));
        }
        current.discontinued = current.date_discontinued.is_some();
        current.last_modified = incoming.last_modified;
    }
}
