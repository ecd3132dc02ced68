//! Result-set metadata types.

use serde::{Deserialize, Serialize};

use super::value::SqlValue;

/// Semantic type of a column, independent of the engine that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Boolean,
    Integer,
    Decimal,
    Float,
    Text,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    /// Engine type with no dedicated mapping. Values arrive as text.
    Other,
}

impl ValueKind {
    /// Whether the kind compares numerically.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueKind::Boolean | ValueKind::Integer | ValueKind::Decimal | ValueKind::Float
        )
    }

    /// Whether the kind carries a time-of-day with fractional seconds.
    pub fn has_fraction(&self) -> bool {
        matches!(
            self,
            ValueKind::Time | ValueKind::Timestamp | ValueKind::TimestampTz
        )
    }
}

/// Column metadata as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name as projected by the query.
    pub name: String,

    /// Engine type name (e.g., "numeric", "datetime2").
    pub type_name: String,

    /// Semantic kind.
    pub kind: ValueKind,

    /// Declared decimal scale, when the driver exposes it.
    pub scale: Option<u32>,

    /// Declared fractional-second digits, when known for the engine type.
    pub fractional_digits: Option<u32>,
}

impl ColumnMeta {
    /// Create metadata with no declared scale or precision.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            kind,
            scale: None,
            fractional_digits: None,
        }
    }

    /// Set the declared decimal scale.
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Set the declared fractional-second digits.
    pub fn with_fractional_digits(mut self, digits: u32) -> Self {
        self.fractional_digits = Some(digits);
        self
    }
}

/// One row, aligned with its result set's column list.
pub type Row = Vec<SqlValue>;

/// Ordered rows returned by a query, treated as a multiset. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Build a result set whose column kinds are inferred from the first non-null
    /// value in each column. Columns with only nulls are typed as text.
    pub fn from_values(names: &[&str], rows: Vec<Row>) -> Self {
        let columns = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let kind = rows
                    .iter()
                    .filter_map(|row| row.get(idx).and_then(SqlValue::kind))
                    .next()
                    .unwrap_or(ValueKind::Text);
                ColumnMeta::new(*name, format!("{:?}", kind).to_lowercase(), kind)
            })
            .collect();
        Self { columns, rows }
    }

    /// Column names in projection order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_infers_kinds() {
        let rs = ResultSet::from_values(
            &["id", "name", "note"],
            vec![
                vec![SqlValue::Int(1), SqlValue::Null, SqlValue::Null],
                vec![SqlValue::Int(2), "b".into(), SqlValue::Null],
            ],
        );
        assert_eq!(rs.columns[0].kind, ValueKind::Integer);
        assert_eq!(rs.columns[1].kind, ValueKind::Text);
        assert_eq!(rs.columns[2].kind, ValueKind::Text);
        assert_eq!(rs.column_names(), vec!["id", "name", "note"]);
        assert_eq!(rs.len(), 2);
    }

    #[test]
    fn test_kind_groups() {
        assert!(ValueKind::Boolean.is_numeric());
        assert!(!ValueKind::Text.is_numeric());
        assert!(ValueKind::TimestampTz.has_fraction());
        assert!(!ValueKind::Date.has_fraction());
    }
}
