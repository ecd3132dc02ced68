//! Row-level comparison of two query results.
//!
//! - [`normalize`]: canonical forms for values and the per-comparison column plan
//! - [`reconcile`]: multiset partitioning into left-only, right-only and common
//! - [`types`]: the comparison result and its summary figures

pub mod normalize;
pub mod reconcile;
pub mod types;

pub use normalize::{normalize, CanonicalRow, ColumnRule, CompareClass, NormalizePlan};
pub use reconcile::reconcile;
pub use types::{ComparisonResult, MatchedPair, PartitionCounts, Performance, Reconciliation};

use std::time::Duration;

use crate::config::NormalizeConfig;
use crate::core::ResultSet;
use crate::error::Result;

/// Compare two fetched result sets end to end: pair columns, normalize, reconcile.
pub fn compare_result_sets(
    spec: &str,
    left: ResultSet,
    right: ResultSet,
    options: &NormalizeConfig,
    left_elapsed: Duration,
    right_elapsed: Duration,
) -> Result<ComparisonResult> {
    let plan = NormalizePlan::build(spec, &left, &right, options)?;
    let right_rows = right
        .rows
        .into_iter()
        .map(|row| plan.align_right(row))
        .collect();
    let reconciliation = reconcile(&plan, left.rows, right_rows)?;

    Ok(ComparisonResult::new(
        spec,
        plan.column_names(),
        reconciliation,
        left_elapsed,
        right_elapsed,
    ))
}
