//! Regenerated SQL output.
//!
//! For every selected partition the file carries a commented header, `INSERT`
//! statements that recreate the rows, and `SELECT` lookups keyed on the first
//! column. Both statement lists are split with [`BatchPredicateBuilder`] so no
//! `VALUES` list or `IN (...)` predicate exceeds `max_sql_in_values` entries.

use std::collections::HashSet;

use chrono::{DateTime, Local};

use super::{BatchPredicateBuilder, Partition, SqlTarget};
use crate::compare::ComparisonResult;
use crate::core::traits::Dialect;
use crate::core::{Row, SqlValue};
use crate::drivers::DialectImpl;

/// Up to this many values an `IN` list stays on one line.
const INLINE_IN_VALUES: usize = 10;

/// Build the SQL file for the given partitions.
pub fn render(
    result: &ComparisonResult,
    partitions: &[Partition],
    target: &SqlTarget<'_>,
    batcher: &BatchPredicateBuilder,
    now: DateTime<Local>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("-- SQL statements for \"{}\"\n", result.spec));
    out.push_str(&format!("-- Generated: {}\n", now.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!(
        "-- Left rows: {}, right rows: {}\n",
        result.left_count, result.right_count
    ));
    out.push_str("-- Usage: Copy these statements and modify the table name as needed\n");

    for partition in partitions {
        let dialect = DialectImpl::from_db_type(target.db_type_for(*partition));
        let rows = partition.rows(result);
        out.push('\n');
        out.push_str(&render_partition(
            *partition,
            &result.columns,
            &rows,
            target.table_name(),
            &dialect,
            batcher,
        ));
    }

    out
}

fn render_partition(
    partition: Partition,
    columns: &[String],
    rows: &[&Row],
    table_name: &str,
    dialect: &DialectImpl,
    batcher: &BatchPredicateBuilder,
) -> String {
    let (keys, has_null_key) = distinct_keys(rows);
    let unique = keys.len() + usize::from(has_null_key);

    let mut out = format!(
        "-- {} ({}): {} records, {} unique values\n",
        partition.as_str(),
        dialect.name(),
        rows.len(),
        unique
    );
    let Some(key_column) = columns.first() else {
        out.push_str("-- Key column: N/A\n");
        return out;
    };
    out.push_str(&format!("-- Key column: {}\n", key_column));

    if rows.is_empty() {
        out.push_str("-- No data to generate statements\n");
        return out;
    }

    let table = dialect.quote_table(table_name);
    let column_list = columns
        .iter()
        .map(|c| dialect.quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    for chunk in batcher.chunks(rows) {
        let tuples = chunk
            .iter()
            .map(|row| {
                let values = row
                    .iter()
                    .map(|v| dialect.literal(v))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("    ({})", values)
            })
            .collect::<Vec<_>>()
            .join(",\n");
        out.push_str(&format!(
            "\nINSERT INTO {} ({}) VALUES\n{};\n",
            table, column_list, tuples
        ));
    }

    let key = dialect.quote_ident(key_column);
    for chunk in batcher.chunks(&keys) {
        let literals: Vec<String> = chunk.iter().map(|v| dialect.literal(v)).collect();
        out.push_str(&format!(
            "\nSELECT *\nFROM {}\nWHERE {} {};\n",
            table,
            key,
            key_predicate(&literals)
        ));
    }
    if has_null_key {
        out.push_str(&format!(
            "\nSELECT *\nFROM {}\nWHERE {} IS NULL;\n",
            table, key
        ));
    }

    out
}

/// Distinct non-null first-column values in first-seen order, plus whether a
/// NULL key was present. `IN (NULL)` never matches, so NULL gets its own lookup.
fn distinct_keys<'a>(rows: &[&'a Row]) -> (Vec<&'a SqlValue>, bool) {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    let mut has_null = false;

    for value in rows.iter().copied().filter_map(|row| row.first()) {
        if value.is_null() {
            has_null = true;
        } else if seen.insert(value) {
            keys.push(value);
        }
    }
    (keys, has_null)
}

fn key_predicate(literals: &[String]) -> String {
    match literals {
        [single] => format!("= {}", single),
        _ if literals.len() <= INLINE_IN_VALUES => format!("IN ({})", literals.join(", ")),
        _ => format!("IN (\n        {}\n    )", literals.join(",\n        ")),
    }
}
