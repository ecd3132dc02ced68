//! Core traits for cross-engine comparison.
//!
//! - [`QueryRunner`]: executes one query against one connection
//! - [`RunnerFactory`]: opens runners for a connection (swapped out in tests)
//! - [`Dialect`]: SQL syntax strategy used when regenerating SQL output

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ConnectionConfig, DbType};
use crate::error::{Result, Side};

use super::schema::ResultSet;
use super::value::{SqlValue, Temporal};

/// One query to execute, with the context errors are attributed to.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    /// Name of the comparison the query belongs to.
    pub spec: &'a str,
    /// Which side of the comparison the query feeds.
    pub side: Side,
    /// Query text.
    pub sql: &'a str,
}

/// Executes a query and returns its complete result set.
///
/// Implementations open their own connection and release it once the result is
/// fully fetched. On failure no partial rows are returned.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Engine this runner talks to.
    fn db_type(&self) -> DbType;

    /// Execute the query and fetch every row.
    async fn fetch_all(&self, request: &QueryRequest<'_>) -> Result<ResultSet>;
}

/// Creates a [`QueryRunner`] for a connection.
///
/// The orchestrator only depends on this trait, so tests can substitute an
/// in-memory implementation for real database drivers.
pub trait RunnerFactory: Send + Sync {
    fn create(&self, conn: &ConnectionConfig, db_type: DbType) -> Result<Arc<dyn QueryRunner>>;
}

/// Database-specific SQL syntax.
///
/// # Design Pattern
///
/// This is a **Strategy** pattern: each engine supplies its own quoting and
/// literal rules, and the SQL renderer stays engine-agnostic.
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "mssql", "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier (table name, column name, etc.).
    ///
    /// - MSSQL: `[identifier]`
    /// - PostgreSQL: `"identifier"`
    /// - MySQL: `` `identifier` ``
    fn quote_ident(&self, name: &str) -> String;

    /// Quote a possibly schema-qualified table name, part by part.
    fn quote_table(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_ident(part.trim()))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Boolean literal.
    fn bool_literal(&self, value: bool) -> String;

    /// Date/time literal.
    fn datetime_literal(&self, value: &Temporal) -> String {
        quote_string(&value.to_iso_string().replacen('T', " ", 1))
    }

    /// Render a value as a SQL literal.
    fn literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => self.bool_literal(*b),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Decimal(d) => d.to_string(),
            SqlValue::Text(s) => self.text_literal(s),
            SqlValue::DateTime(t) => self.datetime_literal(t),
        }
    }

    /// String literal.
    fn text_literal(&self, value: &str) -> String {
        quote_string(value)
    }
}

/// Single-quote a string, doubling embedded quotes.
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
