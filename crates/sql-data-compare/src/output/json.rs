//! JSON Lines output.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::{Record, SIDE_COLUMN};
use crate::error::Result;

/// One object per record, keys in column order with `_side` first when tagged.
///
/// Repeated column names (`SELECT a.id, b.id`) get a numeric suffix so every
/// value survives as its own key.
pub fn render(columns: &[String], records: &[Record<'_>], with_side: bool) -> Result<Vec<u8>> {
    let keys = object_keys(columns, with_side);
    let mut out = Vec::new();

    for record in records {
        let mut object = Map::with_capacity(columns.len() + usize::from(with_side));
        if with_side {
            object.insert(
                SIDE_COLUMN.to_string(),
                Value::String(record.partition.as_str().to_string()),
            );
        }
        for (key, value) in keys.iter().zip(record.row) {
            object.insert(key.clone(), value.to_json());
        }

        serde_json::to_writer(&mut out, &Value::Object(object))?;
        out.push(b'\n');
    }

    Ok(out)
}

/// `id, id` becomes `id, id_2`; a column named `_side` yields to the partition tag.
fn object_keys(columns: &[String], with_side: bool) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(columns.len() + 1);
    if with_side {
        taken.insert(SIDE_COLUMN.to_string());
    }

    columns
        .iter()
        .map(|name| {
            let mut key = name.clone();
            let mut n = 2;
            while taken.contains(&key) {
                key = format!("{}_{}", name, n);
                n += 1;
            }
            taken.insert(key.clone());
            key
        })
        .collect()
}
