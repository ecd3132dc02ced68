//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Provides MySQL-specific identifier quoting and literal rendering.

use crate::core::traits::{quote_string, Dialect};
use crate::core::Temporal;

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Embedded backticks are doubled
        format!("`{}`", name.replace('`', "``"))
    }

    fn bool_literal(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }

    fn text_literal(&self, value: &str) -> String {
        // Backslash is an escape character unless NO_BACKSLASH_ESCAPES is set
        quote_string(&value.replace('\\', "\\\\"))
    }

    fn datetime_literal(&self, value: &Temporal) -> String {
        // DATETIME has no offset; offset-aware values are written in UTC
        let value = match value {
            Temporal::TimestampTz(ts) => Temporal::Timestamp(ts.naive_utc()),
            other => *other,
        };
        quote_string(&value.to_iso_string().replacen('T', " ", 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SqlValue;
    use chrono::DateTime;

    #[test]
    fn test_quote_ident() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.quote_ident("users"), "`users`");
        assert_eq!(dialect.quote_ident("my`table"), "`my``table`");
    }

    #[test]
    fn test_literals() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.literal(&r"C:\tmp".into()), r"'C:\\tmp'");

        let tz = DateTime::parse_from_rfc3339("2024-03-01T08:30:00+02:00").unwrap();
        assert_eq!(
            dialect.literal(&SqlValue::from(tz)),
            "'2024-03-01 06:30:00'"
        );
    }
}
