//! Configuration validation.

use std::collections::{HashMap, HashSet};

use super::Config;
use crate::error::{CompareError, Result, Side};
use crate::output::clean_name;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    for (name, conn) in &config.connections {
        if conn.host.is_empty() {
            return Err(CompareError::Config(format!(
                "connections.{}.host is required",
                name
            )));
        }
        if conn.database.is_empty() {
            return Err(CompareError::Config(format!(
                "connections.{}.database is required",
                name
            )));
        }
    }

    if config.max_sql_in_values == 0 {
        return Err(CompareError::Config(
            "max_sql_in_values must be at least 1".into(),
        ));
    }

    if config.compare_list.is_empty() {
        return Err(CompareError::Config(
            "compare_list must contain at least one comparison".into(),
        ));
    }

    let mut names = HashSet::new();
    let mut stems: HashMap<String, &str> = HashMap::new();
    for spec in &config.compare_list {
        if spec.name.trim().is_empty() {
            return Err(CompareError::Config(
                "every compare_list entry needs a name".into(),
            ));
        }
        if !names.insert(spec.name.as_str()) {
            return Err(CompareError::Config(format!(
                "duplicate comparison name '{}'",
                spec.name
            )));
        }

        // Each comparison owns one output file named after it
        let stem = clean_name(&spec.name);
        if stem.is_empty() {
            return Err(CompareError::Config(format!(
                "comparison name '{}' has no usable file-name characters",
                spec.name
            )));
        }
        if let Some(other) = stems.insert(stem.clone(), spec.name.as_str()) {
            return Err(CompareError::Config(format!(
                "comparisons '{}' and '{}' would both write output '{}'",
                other, spec.name, stem
            )));
        }

        for side in [Side::Left, Side::Right] {
            let conn = config.connection_for(spec, side)?;
            if let Some(db_type) = spec.db_type(side) {
                if db_type != conn.r#type {
                    return Err(CompareError::Config(format!(
                        "Comparison '{}': {}_db_type is '{}' but connection '{}' is '{}'",
                        spec.name,
                        side,
                        db_type,
                        spec.connection_name(side),
                        conn.r#type
                    )));
                }
            }
            spec.query_source(side)?;
        }
    }

    Ok(())
}
