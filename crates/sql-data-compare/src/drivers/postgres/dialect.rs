//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Provides PostgreSQL-specific identifier quoting and literal rendering.

use crate::core::traits::Dialect;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Embedded double quotes are doubled
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn bool_literal(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SqlValue;
    use chrono::DateTime;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_quote_ident() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.quote_ident("users"), "\"users\"");
        assert_eq!(dialect.quote_ident("my\"table"), "\"my\"\"table\"");
        assert_eq!(dialect.quote_table("public.orders"), "\"public\".\"orders\"");
    }

    #[test]
    fn test_literals() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.literal(&SqlValue::Bool(false)), "FALSE");
        assert_eq!(dialect.literal(&"it's".into()), "'it''s'");
        assert_eq!(
            dialect.literal(&Decimal::from_str("10.50").unwrap().into()),
            "10.50"
        );

        let tz = DateTime::parse_from_rfc3339("2024-03-01T08:30:00.5+02:00").unwrap();
        assert_eq!(dialect.literal(&tz.into()), "'2024-03-01 08:30:00.500+02:00'");
    }
}
