//! Cross-engine value normalization.
//!
//! Engines disagree on how the same logical value is represented: `NUMERIC(10,2)`
//! against `float8`, `datetime` with 3 fractional digits against `timestamptz`
//! with 6, `bit` against `boolean`. Before rows are matched, every value is
//! mapped to a canonical form so those representation differences disappear.
//!
//! Key normalization rules:
//! - NULLs: a single canonical `Null`
//! - Numerics (including booleans as 0/1): exact decimals rounded half away from
//!   zero to the coarser of the two sides' scales, trailing zeros stripped
//! - Timestamps: offset-aware values converted to UTC, fractional seconds
//!   truncated to the coarser of the two sides' precisions
//! - Dates and times: kept as dates and times (times truncated like timestamps)
//! - Text: exact, with optional case folding and whitespace trimming

use std::str::FromStr;

use chrono::{SubsecRound, Timelike};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::NormalizeConfig;
use crate::core::{ColumnMeta, ResultSet, Row, SqlValue, Temporal, ValueKind};
use crate::error::{CompareError, Result, Side};

/// How values of a column are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareClass {
    Numeric,
    Text,
    Timestamp,
    Date,
    Time,
}

impl CompareClass {
    fn of(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Boolean | ValueKind::Integer | ValueKind::Decimal | ValueKind::Float => {
                CompareClass::Numeric
            }
            ValueKind::Text | ValueKind::Other => CompareClass::Text,
            ValueKind::Timestamp | ValueKind::TimestampTz => CompareClass::Timestamp,
            ValueKind::Date => CompareClass::Date,
            ValueKind::Time => CompareClass::Time,
        }
    }
}

/// Normalization rule for one column position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRule {
    /// Output column name (left side's spelling).
    pub name: String,
    pub class: CompareClass,
    /// Decimal places numerics are rounded to. `None` keeps full precision.
    pub scale: Option<u32>,
    /// Fractional-second digits kept. `None` keeps full precision.
    pub fractional_digits: Option<u32>,
    pub ignore_case: bool,
    pub trim_text: bool,
}

impl ColumnRule {
    /// Rule with no rounding, truncation or text folding.
    pub fn exact(name: impl Into<String>, class: CompareClass) -> Self {
        Self {
            name: name.into(),
            class,
            scale: None,
            fractional_digits: None,
            ignore_case: false,
            trim_text: false,
        }
    }
}

/// Map a value to its canonical comparison form.
///
/// Returns `None` when the value cannot be coerced to the rule's class (for
/// example non-numeric text in a numeric column). The function is idempotent.
pub fn normalize(value: &SqlValue, rule: &ColumnRule) -> Option<SqlValue> {
    if value.is_null() {
        return Some(SqlValue::Null);
    }

    match rule.class {
        CompareClass::Numeric => {
            let d = match value {
                SqlValue::Bool(b) => Decimal::from(u8::from(*b)),
                SqlValue::Int(i) => Decimal::from(*i),
                SqlValue::Decimal(d) => *d,
                // Float infinities have no decimal form and compare as text
                SqlValue::Text(s) if s == "Infinity" || s == "-Infinity" => {
                    return Some(value.clone())
                }
                SqlValue::Text(s) => Decimal::from_str(s.trim())
                    .or_else(|_| Decimal::from_scientific(s.trim()))
                    .ok()?,
                _ => return None,
            };
            let d = match rule.scale {
                Some(scale) => d.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero),
                None => d,
            };
            Some(SqlValue::Decimal(d.normalize()))
        }
        CompareClass::Text => {
            let mut text = match value {
                SqlValue::Text(s) => s.clone(),
                other => other.to_plain_string(),
            };
            if rule.trim_text {
                text = text.trim().to_string();
            }
            if rule.ignore_case {
                text = text.to_lowercase();
            }
            Some(SqlValue::Text(text))
        }
        CompareClass::Timestamp => {
            let ts = match value {
                SqlValue::DateTime(Temporal::Timestamp(ts)) => *ts,
                SqlValue::DateTime(Temporal::TimestampTz(ts)) => ts.naive_utc(),
                _ => return None,
            };
            let ts = match rule.fractional_digits {
                Some(digits) => ts.trunc_subsecs(digits.min(9) as u16),
                None => ts,
            };
            Some(SqlValue::DateTime(Temporal::Timestamp(ts)))
        }
        CompareClass::Date => match value {
            SqlValue::DateTime(Temporal::Date(d)) => Some(SqlValue::DateTime(Temporal::Date(*d))),
            _ => None,
        },
        CompareClass::Time => match value {
            SqlValue::DateTime(Temporal::Time(t)) => {
                let t = match rule.fractional_digits {
                    Some(digits) => t.trunc_subsecs(digits.min(9) as u16),
                    None => *t,
                };
                Some(SqlValue::DateTime(Temporal::Time(t)))
            }
            _ => None,
        },
    }
}

/// Normalized, hashable projection of a row, used only for matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalRow(Vec<SqlValue>);

impl CanonicalRow {
    pub fn values(&self) -> &[SqlValue] {
        &self.0
    }
}

/// Column pairing and per-column rules for one comparison.
#[derive(Debug, Clone)]
pub struct NormalizePlan {
    spec: String,
    rules: Vec<ColumnRule>,
    /// For each left position, the right position holding the same column.
    right_positions: Vec<usize>,
}

impl NormalizePlan {
    /// Pair the two result sets' columns and derive a rule per column.
    ///
    /// Columns are matched by name, case-insensitively; the right side is aligned
    /// to the left projection order. Differing column sets fail with
    /// [`CompareError::SchemaMismatch`], and incomparable column types with
    /// [`CompareError::Normalization`].
    pub fn build(
        spec: &str,
        left: &ResultSet,
        right: &ResultSet,
        options: &NormalizeConfig,
    ) -> Result<Self> {
        let right_positions = pair_columns(spec, &left.columns, &right.columns)?;

        let mut rules = Vec::with_capacity(left.columns.len());
        for (left_idx, &right_idx) in right_positions.iter().enumerate() {
            let lcol = &left.columns[left_idx];
            let rcol = &right.columns[right_idx];

            let class = CompareClass::of(lcol.kind);
            if class != CompareClass::of(rcol.kind) {
                return Err(CompareError::Normalization {
                    spec: spec.to_string(),
                    column: lcol.name.clone(),
                    message: format!(
                        "left type {} ({:?}) is not comparable with right type {} ({:?})",
                        lcol.type_name, lcol.kind, rcol.type_name, rcol.kind
                    ),
                });
            }

            let scale = match class {
                CompareClass::Numeric => options.decimal_places.or_else(|| {
                    coarser(
                        declared_or_inferred_scale(lcol, &left.rows, left_idx),
                        declared_or_inferred_scale(rcol, &right.rows, right_idx),
                    )
                }),
                _ => None,
            };
            let fractional_digits = match class {
                CompareClass::Timestamp | CompareClass::Time => {
                    options.datetime_precision.or_else(|| {
                        coarser(
                            declared_or_inferred_digits(lcol, &left.rows, left_idx),
                            declared_or_inferred_digits(rcol, &right.rows, right_idx),
                        )
                    })
                }
                _ => None,
            };

            rules.push(ColumnRule {
                name: lcol.name.clone(),
                class,
                scale,
                fractional_digits,
                ignore_case: options.ignore_case,
                trim_text: options.trim_text,
            });
        }

        Ok(Self {
            spec: spec.to_string(),
            rules,
            right_positions,
        })
    }

    pub fn rules(&self) -> &[ColumnRule] {
        &self.rules
    }

    /// Output column names.
    pub fn column_names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.name.clone()).collect()
    }

    /// Reorder a right row into left column order.
    pub fn align_right(&self, mut row: Row) -> Row {
        self.right_positions
            .iter()
            .map(|&idx| std::mem::replace(&mut row[idx], SqlValue::Null))
            .collect()
    }

    /// Canonicalize a row that is already in left column order.
    pub fn canonicalize(&self, row: &Row, side: Side) -> Result<CanonicalRow> {
        self.rules
            .iter()
            .zip(row.iter())
            .map(|(rule, value)| {
                normalize(value, rule).ok_or_else(|| CompareError::Normalization {
                    spec: self.spec.clone(),
                    column: rule.name.clone(),
                    message: format!("{} value '{}' is not a valid {:?}", side, value, rule.class),
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(CanonicalRow)
    }
}

/// Match right columns to left columns by case-insensitive name.
fn pair_columns(spec: &str, left: &[ColumnMeta], right: &[ColumnMeta]) -> Result<Vec<usize>> {
    let mut used = vec![false; right.len()];
    let mut positions = Vec::with_capacity(left.len());
    let mut left_only = Vec::new();

    for lcol in left {
        let found = right.iter().enumerate().position(|(idx, rcol)| {
            !used[idx] && rcol.name.eq_ignore_ascii_case(&lcol.name)
        });
        match found {
            Some(idx) => {
                used[idx] = true;
                positions.push(idx);
            }
            None => left_only.push(lcol.name.clone()),
        }
    }

    let right_only: Vec<String> = right
        .iter()
        .zip(used)
        .filter(|(_, used)| !used)
        .map(|(col, _)| col.name.clone())
        .collect();

    if !left_only.is_empty() || !right_only.is_empty() {
        return Err(CompareError::SchemaMismatch {
            spec: spec.to_string(),
            left_only,
            right_only,
        });
    }
    Ok(positions)
}

/// The smaller of two optional limits; a side with no information defers to the other.
fn coarser(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn declared_or_inferred_scale(col: &ColumnMeta, rows: &[Row], idx: usize) -> Option<u32> {
    if col.scale.is_some() {
        return col.scale;
    }
    rows.iter()
        .filter_map(|row| match row.get(idx)? {
            SqlValue::Decimal(d) => Some(d.scale()),
            SqlValue::Int(_) | SqlValue::Bool(_) => Some(0),
            SqlValue::Text(s) => Decimal::from_str(s.trim()).ok().map(|d| d.scale()),
            _ => None,
        })
        .max()
}

fn declared_or_inferred_digits(col: &ColumnMeta, rows: &[Row], idx: usize) -> Option<u32> {
    if col.fractional_digits.is_some() {
        return col.fractional_digits;
    }
    rows.iter()
        .filter_map(|row| {
            let nanos = match row.get(idx)? {
                SqlValue::DateTime(Temporal::Timestamp(ts)) => ts.nanosecond(),
                SqlValue::DateTime(Temporal::TimestampTz(ts)) => ts.nanosecond(),
                SqlValue::DateTime(Temporal::Time(t)) => t.nanosecond(),
                _ => return None,
            };
            Some(significant_fraction_digits(nanos))
        })
        .max()
}

/// Number of fractional-second digits needed to represent `nanos` exactly.
fn significant_fraction_digits(nanos: u32) -> u32 {
    let mut nanos = nanos % 1_000_000_000;
    if nanos == 0 {
        return 0;
    }
    let mut digits = 9;
    while nanos % 10 == 0 {
        nanos /= 10;
        digits -= 1;
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate};

    fn dec(s: &str) -> SqlValue {
        SqlValue::Decimal(Decimal::from_str(s).unwrap())
    }

    fn numeric(scale: Option<u32>) -> ColumnRule {
        ColumnRule {
            scale,
            ..ColumnRule::exact("amount", CompareClass::Numeric)
        }
    }

    #[test]
    fn test_numeric_rounding_and_trailing_zeros() {
        let rule = numeric(Some(2));
        assert_eq!(normalize(&dec("1.50"), &rule), Some(dec("1.5")));
        assert_eq!(normalize(&dec("2.345"), &rule), Some(dec("2.35")));
        assert_eq!(normalize(&dec("-2.345"), &rule), Some(dec("-2.35")));
        assert_eq!(normalize(&SqlValue::Int(3), &rule), Some(dec("3")));
        assert_eq!(normalize(&SqlValue::Bool(true), &rule), Some(dec("1")));
        assert_eq!(normalize(&"12.004".into(), &rule), Some(dec("12")));
        assert_eq!(normalize(&"abc".into(), &rule), None);
    }

    #[test]
    fn test_null_collapses() {
        for class in [CompareClass::Numeric, CompareClass::Text, CompareClass::Timestamp] {
            let rule = ColumnRule::exact("c", class);
            assert_eq!(normalize(&SqlValue::Null, &rule), Some(SqlValue::Null));
        }
    }

    #[test]
    fn test_text_options() {
        let mut rule = ColumnRule::exact("name", CompareClass::Text);
        assert_eq!(normalize(&" Ann ".into(), &rule), Some(" Ann ".into()));

        rule.trim_text = true;
        rule.ignore_case = true;
        assert_eq!(normalize(&" Ann ".into(), &rule), Some("ann".into()));
    }

    #[test]
    fn test_timestamps_to_utc_and_truncated() {
        let rule = ColumnRule {
            fractional_digits: Some(3),
            ..ColumnRule::exact("created", CompareClass::Timestamp)
        };
        let tz = DateTime::parse_from_rfc3339("2024-03-01T10:30:00.123456+02:00").unwrap();
        let naive = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_micro_opt(8, 30, 0, 123_999)
            .unwrap();

        assert_eq!(normalize(&tz.into(), &rule), normalize(&naive.into(), &rule));
        assert_eq!(
            normalize(&naive.into(), &rule),
            Some(
                NaiveDate::from_ymd_opt(2024, 3, 1)
                    .unwrap()
                    .and_hms_milli_opt(8, 30, 0, 123)
                    .unwrap()
                    .into()
            )
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let cases = vec![
            (dec("10.005"), numeric(Some(2))),
            (dec("-0.50"), numeric(None)),
            (SqlValue::Bool(false), numeric(Some(0))),
            (
                " MiXeD ".into(),
                ColumnRule {
                    ignore_case: true,
                    trim_text: true,
                    ..ColumnRule::exact("t", CompareClass::Text)
                },
            ),
            (
                DateTime::parse_from_rfc3339("2024-01-01T00:00:00.987654321-05:00")
                    .unwrap()
                    .into(),
                ColumnRule {
                    fractional_digits: Some(6),
                    ..ColumnRule::exact("ts", CompareClass::Timestamp)
                },
            ),
        ];

        for (value, rule) in cases {
            let once = normalize(&value, &rule).unwrap();
            let twice = normalize(&once, &rule).unwrap();
            assert_eq!(once, twice, "not idempotent for {:?}", value);
        }
    }

    #[test]
    fn test_plan_aligns_columns_case_insensitively() {
        let left = ResultSet::from_values(
            &["id", "Name"],
            vec![vec![SqlValue::Int(1), "a".into()]],
        );
        let right = ResultSet::from_values(
            &["NAME", "ID"],
            vec![vec!["a".into(), SqlValue::Int(1)]],
        );
        let plan = NormalizePlan::build("t", &left, &right, &NormalizeConfig::default()).unwrap();

        assert_eq!(plan.column_names(), vec!["id", "Name"]);
        let aligned = plan.align_right(right.rows[0].clone());
        assert_eq!(aligned, left.rows[0]);
        assert_eq!(
            plan.canonicalize(&aligned, Side::Right).unwrap(),
            plan.canonicalize(&left.rows[0], Side::Left).unwrap()
        );
    }

    #[test]
    fn test_plan_reports_schema_mismatch() {
        let left = ResultSet::from_values(&["id", "email"], vec![]);
        let right = ResultSet::from_values(&["id", "mail", "phone"], vec![]);
        let err = NormalizePlan::build("Customers", &left, &right, &NormalizeConfig::default())
            .unwrap_err();
        match err {
            CompareError::SchemaMismatch {
                left_only,
                right_only,
                ..
            } => {
                assert_eq!(left_only, vec!["email"]);
                assert_eq!(right_only, vec!["mail", "phone"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_plan_rejects_incomparable_types() {
        let left = ResultSet::from_values(&["code"], vec![vec!["A1".into()]]);
        let right = ResultSet::from_values(&["code"], vec![vec![SqlValue::Int(1)]]);
        let err =
            NormalizePlan::build("Codes", &left, &right, &NormalizeConfig::default()).unwrap_err();
        assert!(matches!(err, CompareError::Normalization { ref column, .. } if column == "code"));
    }

    #[test]
    fn test_plan_uses_coarser_scale_and_precision() {
        let left = ResultSet::from_values(
            &["amount", "at"],
            vec![vec![
                dec("1.239"),
                NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_micro_opt(0, 0, 0, 123_456)
                    .unwrap()
                    .into(),
            ]],
        );
        let mut right = ResultSet::from_values(
            &["amount", "at"],
            vec![vec![
                dec("1.24"),
                NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_milli_opt(0, 0, 0, 123)
                    .unwrap()
                    .into(),
            ]],
        );
        right.columns[1].fractional_digits = Some(3);

        let plan = NormalizePlan::build("t", &left, &right, &NormalizeConfig::default()).unwrap();
        assert_eq!(plan.rules()[0].scale, Some(2));
        assert_eq!(plan.rules()[1].fractional_digits, Some(3));
        assert_eq!(
            plan.canonicalize(&left.rows[0], Side::Left).unwrap(),
            plan.canonicalize(&right.rows[0], Side::Right).unwrap()
        );

        let options = NormalizeConfig {
            decimal_places: Some(3),
            ..Default::default()
        };
        let plan = NormalizePlan::build("t", &left, &right, &options).unwrap();
        assert_eq!(plan.rules()[0].scale, Some(3));
    }

    #[test]
    fn test_significant_fraction_digits() {
        assert_eq!(significant_fraction_digits(0), 0);
        assert_eq!(significant_fraction_digits(500_000_000), 1);
        assert_eq!(significant_fraction_digits(123_000_000), 3);
        assert_eq!(significant_fraction_digits(123_456_789), 9);
    }
}
