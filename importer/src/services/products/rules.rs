use crate::services::data_sources::csv::Field;
use common::model::product::ProductRecord;
use rust_decimal::Decimal;
use std::fmt;

pub const MIN_PRICE: i64 = 5;
pub const MAX_PRICE: i64 = 1000;
pub const MIN_STOCK: i64 = 10;

pub const CODE_MAX_LEN: usize = 10;
pub const NAME_MAX_LEN: usize = 50;
pub const DESCRIPTION_MAX_LEN: usize = 255;

// DECIMAL(11, 2) upper bound.
const MAX_STORED_PRICE_CENTS: i64 = 99_999_999_999;

/// A single broken rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    MissingCode,
    PriceBelowMinimum(Decimal),
    PriceAboveMaximum(Decimal),
    StockBelowMinimum(i64),
    Length {
        field: Field,
        min: usize,
        max: usize,
        actual: usize,
    },
    Negative(Field),
    PriceOutOfPrecision(Decimal),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingCode => write!(f, "product code is missing"),
            Violation::PriceBelowMinimum(price) => {
                write!(f, "price {} is below minimum {}", price, MIN_PRICE)
            }
            Violation::PriceAboveMaximum(price) => {
                write!(f, "price {} is above maximum {}", price, MAX_PRICE)
            }
            Violation::StockBelowMinimum(stock) => {
                write!(f, "stock {} is below minimum {}", stock, MIN_STOCK)
            }
            Violation::Length {
                field,
                min,
                max,
                actual,
            } => write!(
                f,
                "{} length {} is outside {}..={}",
                field.key(),
                actual,
                min,
                max
            ),
            Violation::Negative(field) => write!(f, "{} must not be negative", field.key()),
            Violation::PriceOutOfPrecision(price) => {
                write!(f, "price {} does not fit DECIMAL(11,2)", price)
            }
        }
    }
}

/// Why a record was kept out of the write set. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub violations: Vec<Violation>,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons: Vec<String> = self.violations.iter().map(ToString::to_string).collect();
        f.write_str(&reasons.join("; "))
    }
}

/// Domain bounds on price and stock, plus the required key.
pub fn check_business_rules(record: &ProductRecord) -> Vec<Violation> {
    let mut violations = Vec::new();
    if record.code.trim().is_empty() {
        violations.push(Violation::MissingCode);
    }
    if record.price < Decimal::from(MIN_PRICE) {
        violations.push(Violation::PriceBelowMinimum(record.price));
    }
    if record.price > Decimal::from(MAX_PRICE) {
        violations.push(Violation::PriceAboveMaximum(record.price));
    }
    if record.stock < MIN_STOCK {
        violations.push(Violation::StockBelowMinimum(record.stock));
    }
    violations
}

/// Field-level constraints that mirror the storage columns.
///
/// This is the only check re-run after a merge, since business rules were
/// already applied to the incoming record.
pub fn validate_schema(record: &ProductRecord) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_length(&mut violations, Field::Code, &record.code, CODE_MAX_LEN);
    check_length(&mut violations, Field::Name, &record.name, NAME_MAX_LEN);
    check_length(
        &mut violations,
        Field::Description,
        &record.description,
        DESCRIPTION_MAX_LEN,
    );
    if record.stock < 0 {
        violations.push(Violation::Negative(Field::Stock));
    }
    if record.price.is_sign_negative() && !record.price.is_zero() {
        violations.push(Violation::Negative(Field::Price));
    }
    if record.price.scale() > 2 || record.price > Decimal::new(MAX_STORED_PRICE_CENTS, 2) {
        violations.push(Violation::PriceOutOfPrecision(record.price));
    }
    violations
}

fn check_length(violations: &mut Vec<Violation>, field: Field, value: &str, max: usize) {
    let actual = value.chars().count();
    if actual < 1 || actual > max {
        violations.push(Violation::Length {
            field,
            min: 1,
            max,
            actual,
        });
    }
}

/// Accepts a record only when every rule holds.
pub fn classify(record: &ProductRecord) -> Result<(), Rejection> {
    let mut violations = check_business_rules(record);
    violations.extend(validate_schema(record));
    if violations.is_empty() {
        Ok(())
    } else {
        Err(Rejection { violations })
    }
}

pub fn is_acceptable(record: &ProductRecord) -> bool {
    classify(record).is_ok()
}
