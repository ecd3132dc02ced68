//! SQL value types shared by every driver.
//!
//! Drivers decode engine-specific column data into [`SqlValue`], a small tagged
//! union that keeps the distinctions reconciliation cares about (integer vs exact
//! decimal, naive vs offset-aware timestamps) and drops the rest. Every variant is
//! `Eq + Hash`, so normalized values can key a hash map directly.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use super::schema::ValueKind;

/// Date/time payload of [`SqlValue::DateTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Temporal {
    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// Timestamp without timezone.
    Timestamp(NaiveDateTime),

    /// Timestamp with timezone offset.
    TimestampTz(DateTime<FixedOffset>),
}

impl Temporal {
    /// ISO-8601 text form used by the CSV and JSON renderers.
    pub fn to_iso_string(&self) -> String {
        match self {
            Temporal::Date(d) => d.format("%Y-%m-%d").to_string(),
            Temporal::Time(t) => t.format("%H:%M:%S%.f").to_string(),
            Temporal::Timestamp(ts) => ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            Temporal::TimestampTz(ts) => ts.format("%Y-%m-%dT%H:%M:%S%.f%:z").to_string(),
        }
    }

    /// Semantic kind of the payload.
    pub fn kind(&self) -> ValueKind {
        match self {
            Temporal::Date(_) => ValueKind::Date,
            Temporal::Time(_) => ValueKind::Time,
            Temporal::Timestamp(_) => ValueKind::Timestamp,
            Temporal::TimestampTz(_) => ValueKind::TimestampTz,
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlValue {
    /// SQL NULL. Every engine's null collapses to this.
    Null,

    /// Boolean / bit value.
    Bool(bool),

    /// Integer of any width, widened to 64 bits.
    Int(i64),

    /// Exact decimal. Finite floats are converted to this as well.
    Decimal(Decimal),

    /// Text, including values the drivers stringify (uuid, binary as hex, json, xml).
    Text(String),

    /// Date, time or timestamp.
    DateTime(Temporal),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Semantic kind of the value, `None` for NULL.
    #[must_use]
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(_) => Some(ValueKind::Boolean),
            SqlValue::Int(_) => Some(ValueKind::Integer),
            SqlValue::Decimal(_) => Some(ValueKind::Decimal),
            SqlValue::Text(_) => Some(ValueKind::Text),
            SqlValue::DateTime(t) => Some(t.kind()),
        }
    }

    /// Scale of a decimal value, `None` for any other variant.
    #[must_use]
    pub fn decimal_scale(&self) -> Option<u32> {
        match self {
            SqlValue::Decimal(d) => Some(d.scale()),
            _ => None,
        }
    }

    /// Plain text form for CSV cells. NULL renders as an empty string.
    pub fn to_plain_string(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Bool(b) => b.to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Decimal(d) => d.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::DateTime(t) => t.to_iso_string(),
        }
    }

    /// JSON form. Decimals are emitted as strings to keep their precision.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Bool(b) => serde_json::Value::Bool(*b),
            SqlValue::Int(i) => serde_json::Value::from(*i),
            SqlValue::Decimal(d) => serde_json::Value::String(d.to_string()),
            SqlValue::Text(s) => serde_json::Value::String(s.clone()),
            SqlValue::DateTime(t) => serde_json::Value::String(t.to_iso_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            other => f.write_str(&other.to_plain_string()),
        }
    }
}

// From implementations for common types
impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(Temporal::Timestamp(v))
    }
}

impl From<DateTime<FixedOffset>> for SqlValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        SqlValue::DateTime(Temporal::TimestampTz(v))
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::DateTime(Temporal::Date(v))
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(v: NaiveTime) -> Self {
        SqlValue::DateTime(Temporal::Time(v))
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Convert a float into the value model: finite values become exact decimals,
/// NaN becomes NULL and infinities become text.
pub fn float_to_value(v: f64) -> SqlValue {
    if v.is_nan() {
        return SqlValue::Null;
    }
    if v.is_infinite() {
        let text = if v > 0.0 { "Infinity" } else { "-Infinity" };
        return SqlValue::Text(text.to_string());
    }
    match Decimal::try_from(v) {
        Ok(d) => SqlValue::Decimal(d),
        // Out of Decimal's range (|v| > ~7.9e28)
        Err(_) => SqlValue::Text(v.to_string()),
    }
}

/// Lower-case hex rendering for binary columns.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
