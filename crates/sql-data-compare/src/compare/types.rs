//! Comparison result types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::Row;

/// A left row and the right row it was matched with.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPair {
    pub left: Row,
    pub right: Row,
}

/// The three partitions produced by reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Left rows with no remaining match, in left order.
    pub left_only: Vec<Row>,
    /// Right rows with no remaining match, in right order.
    pub right_only: Vec<Row>,
    /// Matched pairs, in right order.
    pub common: Vec<MatchedPair>,
}

/// Outcome of comparing one pair of queries.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    /// Comparison name.
    pub spec: String,
    /// Output column names (left projection order).
    pub columns: Vec<String>,
    pub left_only: Vec<Row>,
    pub right_only: Vec<Row>,
    pub common: Vec<MatchedPair>,
    pub left_count: usize,
    pub right_count: usize,
    pub left_elapsed: Duration,
    pub right_elapsed: Duration,
}

impl ComparisonResult {
    pub fn new(
        spec: impl Into<String>,
        columns: Vec<String>,
        reconciliation: Reconciliation,
        left_elapsed: Duration,
        right_elapsed: Duration,
    ) -> Self {
        let Reconciliation {
            left_only,
            right_only,
            common,
        } = reconciliation;
        Self {
            spec: spec.into(),
            columns,
            left_count: left_only.len() + common.len(),
            right_count: right_only.len() + common.len(),
            left_only,
            right_only,
            common,
            left_elapsed,
            right_elapsed,
        }
    }

    /// No divergence, and either something matched or both sides are empty.
    pub fn is_equal(&self) -> bool {
        self.left_only.is_empty()
            && self.right_only.is_empty()
            && (!self.common.is_empty() || (self.left_count == 0 && self.right_count == 0))
    }

    pub fn row_count_match(&self) -> bool {
        self.left_count == self.right_count
    }

    /// Relative speed of the right query compared with the left one.
    pub fn performance(&self) -> Performance {
        Performance::compare(self.left_elapsed, self.right_elapsed)
    }

    /// Partition counts for summaries.
    pub fn counts(&self) -> PartitionCounts {
        PartitionCounts {
            left_count: self.left_count,
            right_count: self.right_count,
            left_only: self.left_only.len(),
            right_only: self.right_only.len(),
            common: self.common.len(),
        }
    }
}

/// Row counts per side and per partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionCounts {
    pub left_count: usize,
    pub right_count: usize,
    pub left_only: usize,
    pub right_only: usize,
    pub common: usize,
}

/// Right query timing relative to the left query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "factor", rename_all = "snake_case")]
pub enum Performance {
    Faster(f64),
    Slower(f64),
    Same,
    /// One of the timings is zero, so no ratio can be given.
    Unknown,
}

impl Performance {
    pub fn compare(left: Duration, right: Duration) -> Self {
        let (l, r) = (left.as_secs_f64(), right.as_secs_f64());
        if l <= 0.0 || r <= 0.0 {
            Performance::Unknown
        } else if r < l {
            Performance::Faster(l / r)
        } else if r > l {
            Performance::Slower(r / l)
        } else {
            Performance::Same
        }
    }
}

impl fmt::Display for Performance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Performance::Faster(x) => write!(f, "Right query is {:.2}x faster than left", x),
            Performance::Slower(x) => write!(f, "Right query is {:.2}x slower than left", x),
            Performance::Same => f.write_str("Both queries performed at the same speed"),
            Performance::Unknown => f.write_str("N/A"),
        }
    }
}
