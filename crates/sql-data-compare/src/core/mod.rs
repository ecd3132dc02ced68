//! Core abstractions shared by drivers, the comparison engine and output.
//!
//! - [`value`]: the [`SqlValue`] model every driver decodes into
//! - [`schema`]: column metadata, rows and result sets
//! - [`traits`]: runner, runner factory and dialect traits
//!
//! Drivers (`drivers/mssql`, `drivers/postgres`, `drivers/mysql`) implement the
//! traits; everything downstream of a fetched [`ResultSet`] is engine-agnostic.

pub mod schema;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use schema::{ColumnMeta, ResultSet, Row, ValueKind};
pub use traits::{Dialect, QueryRequest, QueryRunner, RunnerFactory};
pub use value::{SqlValue, Temporal};
