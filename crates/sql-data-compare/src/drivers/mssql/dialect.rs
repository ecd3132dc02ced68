//! MSSQL SQL dialect (Strategy pattern).
//!
//! Provides MSSQL-specific identifier quoting and literal rendering.

use crate::core::traits::{quote_string, Dialect};
use crate::core::Temporal;

/// Microsoft SQL Server dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Create a new MSSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Closing brackets inside the name are doubled
        format!("[{}]", name.replace(']', "]]"))
    }

    fn bool_literal(&self, value: bool) -> String {
        // bit column
        if value { "1" } else { "0" }.to_string()
    }

    fn text_literal(&self, value: &str) -> String {
        format!("N{}", quote_string(value))
    }

    fn datetime_literal(&self, value: &Temporal) -> String {
        // ISO 8601 with 'T' is read the same way under every DATEFORMAT setting
        quote_string(&value.to_iso_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SqlValue;
    use chrono::NaiveDate;

    #[test]
    fn test_quote_ident() {
        let dialect = MssqlDialect::new();
        assert_eq!(dialect.quote_ident("users"), "[users]");
        assert_eq!(dialect.quote_ident("my]table"), "[my]]table]");
        assert_eq!(dialect.quote_table("dbo.Orders"), "[dbo].[Orders]");
    }

    #[test]
    fn test_literals() {
        let dialect = MssqlDialect::new();
        assert_eq!(dialect.literal(&SqlValue::Bool(true)), "1");
        assert_eq!(dialect.literal(&SqlValue::Null), "NULL");
        assert_eq!(dialect.literal(&"O'Brien".into()), "N'O''Brien'");

        let ts = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(23, 59, 1)
            .unwrap();
        assert_eq!(dialect.literal(&ts.into()), "'2024-01-31T23:59:01'");
    }
}
