//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL
//! - [`PostgresRunner`]: query runner over tokio-postgres

mod dialect;
mod runner;

pub use dialect::PostgresDialect;
pub use runner::PostgresRunner;
