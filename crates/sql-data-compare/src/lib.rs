//! # sql-data-compare
//!
//! Cross-engine reconciliation of query results.
//!
//! Each comparison runs one query against a "left" database and one against a
//! "right" database (MSSQL, PostgreSQL or MySQL, in any combination) and
//! partitions the rows into:
//!
//! - **left only**: rows present on the left and missing on the right
//! - **right only**: rows present on the right and missing on the left
//! - **common**: rows present on both sides, matched by count for duplicates
//!
//! Values are normalized before matching, so `10.50` and `10.5`, `1` and `true`,
//! or a `datetime` and a `timestamptz` naming the same instant compare equal.
//! Divergent rows can be written out as CSV, JSON Lines or regenerated SQL.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sql_data_compare::{Config, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> sql_data_compare::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let summary = Orchestrator::new(config).run(CancellationToken::new()).await?;
//!     println!("{} of {} comparisons matched", summary.specs_matched, summary.specs_total);
//!     Ok(())
//! }
//! ```

pub mod compare;
pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod output;

// Re-exports for convenient access
pub use compare::{compare_result_sets, ComparisonResult, PartitionCounts, Performance};
pub use config::{ComparisonSpec, Config, ConnectionConfig, DbType, OutputFormat, OutputType};
pub use core::{ResultSet, Row, SqlValue};
pub use error::{CompareError, Result, Side};
pub use orchestrator::{Orchestrator, RunSummary, SpecStatus, SpecSummary};
pub use output::{BatchPredicateBuilder, Renderer};
