//! CSV output.

use super::{Record, SIDE_COLUMN};
use crate::error::{CompareError, Result};

/// Header plus one record per row. NULL is written as an empty field.
pub fn render(columns: &[String], records: &[Record<'_>], with_side: bool) -> Result<Vec<u8>> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());

    if with_side {
        writer.write_field(SIDE_COLUMN)?;
    }
    writer.write_record(columns)?;

    for record in records {
        if with_side {
            writer.write_field(record.partition.as_str())?;
        }
        writer.write_record(record.row.iter().map(|v| v.to_plain_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| CompareError::Io(e.into_error()))
}
