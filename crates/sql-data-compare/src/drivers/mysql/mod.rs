//! MySQL/MariaDB database driver.
//!
//! - [`MysqlDialect`]: SQL syntax strategy
//! - [`MysqlRunner`]: query runner over SQLx
//!
//! # Feature Flag
//!
//! The runner needs the `mysql` feature. The dialect is always compiled so SQL
//! output can target MySQL even when the driver is not built in:
//!
//! ```toml
//! [dependencies]
//! sql-data-compare = { version = "0.3", features = ["mysql"] }
//! ```
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod dialect;
#[cfg(feature = "mysql")]
mod runner;

pub use dialect::MysqlDialect;
#[cfg(feature = "mysql")]
pub use runner::MysqlRunner;
