use crate::services::data_sources::csv::{Field, HeaderMapping, RawRow};
use chrono::{DateTime, Utc};
use common::model::product::{ProductRecord, DISCONTINUED_YES};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Fractional digits kept on prices.
pub const PRICE_SCALE: u32 = 2;

/// Turns one raw row into a candidate record.
///
/// Never fails: non-numeric `stock` and `price` become 0, which the business
/// rules then reject. `now` is the run-wide logical timestamp.
pub fn normalize(row: &RawRow, header: &HeaderMapping, now: DateTime<Utc>) -> ProductRecord {
    let field = |f: Field| row.get(header.index(f));

    let discontinued = is_discontinued(field(Field::Discontinued));
    ProductRecord {
        code: field(Field::Code).to_string(),
        name: field(Field::Name).to_string(),
        description: field(Field::Description).to_string(),
        stock: coerce_stock(field(Field::Stock)),
        price: coerce_price(field(Field::Price)),
        discontinued,
        date_added: now,
        date_discontinued: discontinued.then_some(now),
        last_modified: now,
    }
}

pub fn is_discontinued(raw: &str) -> bool {
    raw == DISCONTINUED_YES
}

/// Integer stock, truncating fractional input (`"10.9"` is 10).
pub fn coerce_stock(raw: &str) -> i64 {
    parse_numeric(raw)
        .and_then(|value| value.trunc().to_i64())
        .unwrap_or(0)
}

/// Decimal price rounded half away from zero to two places.
pub fn coerce_price(raw: &str) -> Decimal {
    parse_numeric(raw)
        .map(|value| {
            value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
        })
        .unwrap_or(Decimal::ZERO)
}

// Accepts plain and exponent notation with surrounding whitespace.
fn parse_numeric(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}
