//! Multiset reconciliation of two result sets.
//!
//! Left rows are indexed once by canonical form; the right side is then streamed
//! against that index. Each right row consumes one pending left row with the same
//! canonical form, or lands in `right_only`. Whatever is still pending afterwards
//! is `left_only`. Duplicates are handled by count, so `common` carries
//! `min(left, right)` copies of each distinct row and the excess goes to the
//! side that has it. Runs in `O(n + m)` and does not depend on row order.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use super::normalize::{CanonicalRow, NormalizePlan};
use super::types::{MatchedPair, Reconciliation};
use crate::core::Row;
use crate::error::{Result, Side};

/// Partition two row sets, both in the plan's column order.
pub fn reconcile(plan: &NormalizePlan, left: Vec<Row>, right: Vec<Row>) -> Result<Reconciliation> {
    let mut pending: HashMap<CanonicalRow, VecDeque<usize>> = HashMap::with_capacity(left.len());
    for (idx, row) in left.iter().enumerate() {
        let key = plan.canonicalize(row, Side::Left)?;
        pending.entry(key).or_default().push_back(idx);
    }
    debug!(
        rows = left.len(),
        distinct = pending.len(),
        "indexed left rows"
    );

    let mut slots: Vec<Option<Row>> = left.into_iter().map(Some).collect();
    let mut right_only = Vec::new();
    let mut common = Vec::new();

    for row in right {
        let key = plan.canonicalize(&row, Side::Right)?;
        let matched = pending
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .and_then(|idx| slots[idx].take());
        match matched {
            Some(left) => common.push(MatchedPair { left, right: row }),
            None => right_only.push(row),
        }
    }

    // Unclaimed slots keep their original left order
    let left_only: Vec<Row> = slots.into_iter().flatten().collect();

    Ok(Reconciliation {
        left_only,
        right_only,
        common,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizeConfig;
    use crate::core::{ResultSet, SqlValue};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn plan_for(columns: &[&str], left: &[Row], right: &[Row]) -> NormalizePlan {
        let l = ResultSet::from_values(columns, left.to_vec());
        let r = ResultSet::from_values(columns, right.to_vec());
        NormalizePlan::build("test", &l, &r, &NormalizeConfig::default()).unwrap()
    }

    fn run(columns: &[&str], left: Vec<Row>, right: Vec<Row>) -> Reconciliation {
        let plan = plan_for(columns, &left, &right);
        reconcile(&plan, left, right).unwrap()
    }

    fn row(id: i64, val: &str) -> Row {
        vec![SqlValue::Int(id), val.into()]
    }

    fn sorted(mut rows: Vec<Row>) -> Vec<Row> {
        rows.sort_by_key(|r| format!("{:?}", r));
        rows
    }

    #[test]
    fn test_disjoint_and_shared_rows() {
        let result = run(
            &["id", "val"],
            vec![row(1, "a"), row(2, "b")],
            vec![row(1, "a"), row(3, "c")],
        );

        assert_eq!(result.left_only, vec![row(2, "b")]);
        assert_eq!(result.right_only, vec![row(3, "c")]);
        assert_eq!(result.common.len(), 1);
        assert_eq!(result.common[0].left, row(1, "a"));
    }

    #[test]
    fn test_duplicates_matched_by_count() {
        let x = || vec![SqlValue::Int(1)];
        let result = run(&["x"], vec![x(), x(), x()], vec![x(), x()]);

        assert_eq!(result.common.len(), 2);
        assert_eq!(result.left_only, vec![x()]);
        assert!(result.right_only.is_empty());
    }

    #[test]
    fn test_self_comparison_matches_everything() {
        let rows = vec![row(1, "a"), row(1, "a"), row(2, "b"), row(3, "c")];
        let result = run(&["id", "val"], rows.clone(), rows.clone());

        assert!(result.left_only.is_empty());
        assert!(result.right_only.is_empty());
        assert_eq!(result.common.len(), rows.len());
        let matched: Vec<Row> = result.common.into_iter().map(|p| p.left).collect();
        assert_eq!(sorted(matched), sorted(rows));
    }

    #[test]
    fn test_swapping_sides_swaps_partitions() {
        let l = vec![row(1, "a"), row(2, "b"), row(2, "b"), row(4, "d")];
        let r = vec![row(2, "b"), row(3, "c"), row(1, "a"), row(3, "c")];

        let forward = run(&["id", "val"], l.clone(), r.clone());
        let backward = run(&["id", "val"], r, l);

        assert_eq!(sorted(forward.left_only), sorted(backward.right_only.clone()));
        assert_eq!(sorted(forward.right_only), sorted(backward.left_only.clone()));
        let fc: Vec<Row> = forward.common.into_iter().map(|p| p.left).collect();
        let bc: Vec<Row> = backward.common.into_iter().map(|p| p.right).collect();
        assert_eq!(sorted(fc), sorted(bc));
    }

    #[test]
    fn test_count_invariant_holds() {
        let l: Vec<Row> = (0..50).map(|i| vec![SqlValue::Int(i % 7)]).collect();
        let r: Vec<Row> = (0..40).map(|i| vec![SqlValue::Int(i % 5)]).collect();
        let (nl, nr) = (l.len(), r.len());

        let result = run(&["x"], l, r);
        assert_eq!(result.left_only.len() + result.common.len(), nl);
        assert_eq!(result.right_only.len() + result.common.len(), nr);
    }

    #[test]
    fn test_left_only_keeps_original_order() {
        let l = vec![row(5, "e"), row(1, "a"), row(4, "d"), row(2, "b")];
        let r = vec![row(1, "a")];
        let result = run(&["id", "val"], l, r);
        assert_eq!(result.left_only, vec![row(5, "e"), row(4, "d"), row(2, "b")]);
    }

    #[test]
    fn test_representation_differences_match() {
        let left = vec![vec![
            SqlValue::Int(1),
            SqlValue::Decimal(Decimal::from_str("10.50").unwrap()),
            SqlValue::Bool(true),
        ]];
        let right = vec![vec![
            SqlValue::Decimal(Decimal::from_str("1.0").unwrap()),
            SqlValue::Decimal(Decimal::from_str("10.5").unwrap()),
            SqlValue::Int(1),
        ]];
        let result = run(&["id", "amount", "active"], left, right);
        assert_eq!(result.common.len(), 1);
        assert!(result.left_only.is_empty() && result.right_only.is_empty());
    }

    #[test]
    fn test_nulls_match_each_other() {
        let l = vec![vec![SqlValue::Int(1), SqlValue::Null]];
        let r = vec![vec![SqlValue::Int(1), SqlValue::Null]];
        let result = run(&["id", "note"], l, r);
        assert_eq!(result.common.len(), 1);
    }
}
