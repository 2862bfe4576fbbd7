//! Processed CSV writer.

use std::fs;
use std::path::Path;

use crate::error::TransformResult;
use crate::models::{TraficRow, OUTPUT_COLUMNS};

/// Write `rows` under the fixed header, replacing any existing file.
///
/// Short rows are padded with empty cells so every record has
/// `OUTPUT_COLUMNS.len()` fields.
pub fn write_processed<P: AsRef<Path>>(path: P, rows: &[TraficRow]) -> TransformResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(OUTPUT_COLUMNS)?;

    for row in rows {
        let padding = OUTPUT_COLUMNS.len().saturating_sub(row.fields.len());
        writer.write_record(
            row.fields
                .iter()
                .map(String::as_str)
                .chain(std::iter::repeat("").take(padding)),
        )?;
    }

    writer.flush()?;
    Ok(())
}
