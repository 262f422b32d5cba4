use csv::StringRecord;

/// Number of logical columns a product file must provide.
pub const EXPECTED_COLUMNS: usize = 6;

/// The logical columns, in their fixed positional order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Code,
    Name,
    Description,
    Stock,
    Price,
    Discontinued,
}

impl Field {
    pub const ALL: [Field; EXPECTED_COLUMNS] = [
        Field::Code,
        Field::Name,
        Field::Description,
        Field::Stock,
        Field::Price,
        Field::Discontinued,
    ];

    pub fn position(self) -> usize {
        self as usize
    }

    pub fn key(self) -> &'static str {
        match self {
            Field::Code => "code",
            Field::Name => "name",
            Field::Description => "description",
            Field::Stock => "stock",
            Field::Price => "price",
            Field::Discontinued => "discontinued",
        }
    }
}

/// Resolved mapping from logical field to header position and label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMapping {
    labels: Vec<String>,
}

impl HeaderMapping {
    /// Builds the mapping from a header row, or returns `None` when the row is
    /// too short.
    pub fn resolve(header_row: &StringRecord) -> Option<Self> {
        let mut mapping = HeaderMapping::default();
        mapping.set(header_row).then_some(mapping)
    }

    /// Replaces the mapping with one derived from `header_row`.
    ///
    /// Returns `false` and leaves the mapping untouched when fewer than six
    /// columns are present. Extra trailing columns are ignored.
    pub fn set(&mut self, header_row: &StringRecord) -> bool {
        if header_row.len() < EXPECTED_COLUMNS {
            return false;
        }
        self.labels = header_row
            .iter()
            .take(EXPECTED_COLUMNS)
            .map(|label| label.trim().to_string())
            .collect();
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.labels.len() == EXPECTED_COLUMNS
    }

    pub fn index(&self, field: Field) -> usize {
        field.position()
    }

    /// Label the file uses for `field`, e.g. `Cost in GBP` for the price.
    pub fn label(&self, field: Field) -> &str {
        self.labels
            .get(field.position())
            .map(String::as_str)
            .unwrap_or_else(|| field.key())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_columns_resolve_in_order() {
        let row = StringRecord::from(vec![
            "Product Code",
            "Product Name",
            "Product Description",
            "Stock",
            "Cost in GBP",
            "Discontinued",
        ]);
        let mapping = HeaderMapping::resolve(&row).expect("header resolves");

        assert!(mapping.is_resolved());
        assert_eq!(mapping.index(Field::Price), 4);
        assert_eq!(mapping.label(Field::Price), "Cost in GBP");
        assert_eq!(mapping.label(Field::Code), "Product Code");
    }

    #[test]
    fn short_header_is_rejected() {
        let row = StringRecord::from(vec!["code", "name", "description", "stock", "price"]);
        let mut mapping = HeaderMapping::default();

        assert!(!mapping.set(&row));
        assert!(!mapping.is_resolved());
        assert_eq!(mapping.label(Field::Code), "code");
    }

    #[test]
    fn extra_columns_are_ignored() {
        let row = StringRecord::from(vec![
            "code",
            "name",
            "description",
            "stock",
            "price",
            "discontinued",
            "notes",
        ]);
        let mapping = HeaderMapping::resolve(&row).expect("header resolves");
        assert_eq!(mapping.labels().len(), EXPECTED_COLUMNS);
    }
}
