//! `transform_data` task: raw file → processed CSV.
//!
//! # Example
//!
//! ```rust,ignore
//! use trafic::{transform_file, PipelineConfig};
//!
//! let config = PipelineConfig::from_workdir("/usr/local/airflow");
//! let report = transform_file(&config)?;
//! println!("shape: {}", report.shape);
//! ```

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, instrument};

use crate::config::PipelineConfig;
use crate::error::TransformResult;
use crate::models::{TableShape, OUTPUT_COLUMNS};
use crate::parser::{parse_raw_input, read_raw_lines};

use super::reshape::{reshape, ShortGroupPolicy};
use super::writer::write_processed;

/// Result of a transform run.
#[derive(Debug, Clone, Serialize)]
pub struct TransformReport {
    /// Shape of the written table
    pub shape: TableShape,
    /// Where the table was written
    pub output: PathBuf,
    /// Detected raw file encoding
    pub encoding: String,
    /// Data lines read (caption and blank lines excluded)
    pub lines_read: usize,
    /// Short rows seen
    pub short_rows: usize,
    /// Data lines that carried no measurement group
    pub empty_lines: usize,
    /// Policy applied to short rows
    pub short_groups: ShortGroupPolicy,
}

/// Reshape `config.raw_input` into `config.processed_output`.
#[instrument(level = "info", skip(config), fields(input = %config.raw_input.display()))]
pub fn transform_file(config: &PipelineConfig) -> TransformResult<TransformReport> {
    let start = Instant::now();

    let input = read_raw_lines(&config.raw_input)?;
    info!(lines = input.lines.len(), encoding = %input.encoding, "read raw file");

    let records = parse_raw_input(&input);
    let outcome = reshape(&records, config.short_groups)?;

    write_processed(&config.processed_output, &outcome.rows)?;

    let shape = TableShape {
        rows: outcome.rows.len(),
        columns: OUTPUT_COLUMNS.len(),
    };
    info!(
        %shape,
        short_rows = outcome.short_rows,
        empty_lines = outcome.empty_lines,
        output = %config.processed_output.display(),
        elapsed = ?start.elapsed(),
        "transform complete"
    );

    Ok(TransformReport {
        shape,
        output: config.processed_output.clone(),
        encoding: input.encoding,
        lines_read: input.lines.len(),
        short_rows: outcome.short_rows,
        empty_lines: outcome.empty_lines,
        short_groups: config.short_groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use std::fs;

    const RAW: &str = "track_id; type; traveled_d; avg_speed; lat; lon; speed; lon_acc; lat_acc; time\n\
        1; Car; 100.5; 20.3; 10.1; 20.2; 5.0; 0.1; 0.2; 0.0; 10.1; 20.3; 5.1; 0.1; 0.2; 0.1; \n\
        2; Motorcycle; 48.2; 9.1; 37.9; 23.7; 9.1; 0.0; 0.0; 0.0; \n";

    fn setup(raw: &str) -> (tempfile::TempDir, PipelineConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::from_workdir(dir.path());
        fs::create_dir_all(config.raw_input.parent().unwrap()).unwrap();
        fs::write(&config.raw_input, raw).unwrap();
        (dir, config)
    }

    #[test]
    fn test_transform_file_shape() {
        let (_dir, config) = setup(RAW);
        let report = transform_file(&config).unwrap();

        assert_eq!(report.shape, TableShape { rows: 3, columns: 10 });
        assert_eq!(report.lines_read, 2);

        let content = fs::read_to_string(&config.processed_output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], OUTPUT_COLUMNS.join(","));
        assert_eq!(lines[1], "1,Car,100.5,20.3,10.1,20.2,5.0,0.1,0.2,0.0");
        assert_eq!(lines[3], "2,Motorcycle,48.2,9.1,37.9,23.7,9.1,0.0,0.0,0.0");
    }

    #[test]
    fn test_report_counts_short_and_empty_lines() {
        let (_dir, config) = setup("caption\n1;Car;1;1;X\n2;Bus;1;1;1;2;3;4;5;6;7;8;X\n");
        let report = transform_file(&config).unwrap();

        assert_eq!(report.lines_read, 2);
        assert_eq!(report.empty_lines, 1);
        assert_eq!(report.short_rows, 1);
        assert_eq!(report.shape, TableShape { rows: 2, columns: 10 });
    }

    #[test]
    fn test_transform_is_idempotent() {
        let (_dir, config) = setup(RAW);

        transform_file(&config).unwrap();
        let first = fs::read(&config.processed_output).unwrap();
        transform_file(&config).unwrap();
        let second = fs::read(&config.processed_output).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_raw_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::from_workdir(dir.path());

        let result = transform_file(&config);
        assert!(matches!(result, Err(TransformError::InputNotFound(_))));
        assert!(!config.processed_output.exists());
    }

    #[test]
    fn test_reject_policy_leaves_no_output() {
        let (_dir, mut config) = setup("caption\n1;Car;1;1;1;2;3;4;5;6;7;X\n");
        config.short_groups = ShortGroupPolicy::Reject;

        let result = transform_file(&config);
        assert!(matches!(result, Err(TransformError::ShortGroup { line: 2, len: 1 })));
        assert!(!config.processed_output.exists());
    }
}
