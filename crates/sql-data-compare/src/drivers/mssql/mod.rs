//! Microsoft SQL Server driver.
//!
//! - [`MssqlDialect`]: SQL syntax strategy for MSSQL
//! - [`MssqlRunner`]: query runner over Tiberius

mod dialect;
mod runner;

pub use dialect::MssqlDialect;
pub use runner::MssqlRunner;
