//! `load_data` task: processed CSV → SQLite table.
//!
//! The destination table is created on first use with a fixed schema.
//! Each load then writes the whole processed file in one transaction,
//! either replacing the table contents or appending to them.

use clap::ValueEnum;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::config::PipelineConfig;
use crate::error::{LoadError, LoadResult};
use crate::models::{TraficRecord, OUTPUT_COLUMNS};

/// How rows already in the table are treated.
///
/// There is no default: callers always name the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Delete existing rows, then insert.
    Replace,
    /// Insert after existing rows.
    Append,
}

/// Result of a load run.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub database: PathBuf,
    pub mode: LoadMode,
    /// Rows inserted by this run
    pub rows_written: usize,
    /// Rows in the table after the run
    pub table_rows: usize,
}

/// `CREATE TABLE IF NOT EXISTS` statement for `table`.
///
/// `table` must already be a validated identifier.
pub fn create_table_sql(table: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS "{table}" (
    id INTEGER PRIMARY KEY,
    track_id NUMERIC,
    type TEXT NOT NULL,
    traveled_d DOUBLE PRECISION DEFAULT NULL,
    avg_speed DOUBLE PRECISION DEFAULT NULL,
    lat DOUBLE PRECISION DEFAULT NULL,
    lon DOUBLE PRECISION DEFAULT NULL,
    speed DOUBLE PRECISION DEFAULT NULL,
    lon_acc DOUBLE PRECISION DEFAULT NULL,
    lat_acc DOUBLE PRECISION DEFAULT NULL,
    time DOUBLE PRECISION DEFAULT NULL
)"#
    )
}

fn insert_sql(table: &str) -> String {
    let columns = OUTPUT_COLUMNS.join(", ");
    let placeholders = vec!["?"; OUTPUT_COLUMNS.len()].join(", ");
    format!(r#"INSERT INTO "{table}" ({columns}) VALUES ({placeholders})"#)
}

/// Open the SQLite file, creating its directory if needed.
pub fn open_store<P: AsRef<Path>>(path: P) -> LoadResult<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(Connection::open(path)?)
}

/// Create the destination table if it does not exist.
pub fn ensure_table(conn: &Connection, table: &str) -> LoadResult<()> {
    conn.execute_batch(&create_table_sql(table))?;
    Ok(())
}

/// Read every record of the processed CSV.
///
/// Row numbers in errors are 1-based data rows (header excluded).
pub fn read_processed<P: AsRef<Path>>(path: P) -> LoadResult<Vec<TraficRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::InputNotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    if !headers.iter().eq(OUTPUT_COLUMNS.iter().copied()) {
        return Err(LoadError::UnexpectedHeader {
            expected: OUTPUT_COLUMNS.join(","),
            found: headers.iter().collect::<Vec<_>>().join(","),
        });
    }

    let mut records = Vec::new();
    for (idx, result) in reader.deserialize::<TraficRecord>().enumerate() {
        let record = result?;
        if record.kind.as_deref().map_or(true, str::is_empty) {
            return Err(LoadError::MissingType { row: idx + 1 });
        }
        records.push(record);
    }

    Ok(records)
}

/// Write `records` to `table` in a single transaction.
///
/// Returns the number of inserted rows.
pub fn write_records(
    conn: &mut Connection,
    table: &str,
    records: &[TraficRecord],
    mode: LoadMode,
) -> LoadResult<usize> {
    let tx = conn.transaction()?;

    if mode == LoadMode::Replace {
        let removed = tx.execute(&format!(r#"DELETE FROM "{table}""#), [])?;
        debug!(removed, "cleared table");
    }

    {
        let mut stmt = tx.prepare(&insert_sql(table))?;
        for r in records {
            stmt.execute(params![
                r.track_id,
                r.kind,
                r.traveled_d,
                r.avg_speed,
                r.lat,
                r.lon,
                r.speed,
                r.lon_acc,
                r.lat_acc,
                r.time,
            ])?;
        }
    }

    tx.commit()?;
    Ok(records.len())
}

/// Number of rows currently in `table`.
pub fn count_rows(conn: &Connection, table: &str) -> LoadResult<usize> {
    let count: i64 =
        conn.query_row(&format!(r#"SELECT COUNT(*) FROM "{table}""#), [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Load `config.processed_output` into `config.table`.
#[instrument(level = "info", skip(config), fields(table = %config.table, mode = ?config.load_mode))]
pub fn load_file(config: &PipelineConfig) -> LoadResult<LoadReport> {
    let start = Instant::now();

    let mut conn = open_store(&config.database)?;
    ensure_table(&conn, &config.table)?;

    let records = read_processed(&config.processed_output)?;
    info!(rows = records.len(), input = %config.processed_output.display(), "read processed file");

    let rows_written = write_records(&mut conn, &config.table, &records, config.load_mode)?;
    let table_rows = count_rows(&conn, &config.table)?;
    info!(rows_written, table_rows, elapsed = ?start.elapsed(), "load complete");

    Ok(LoadReport {
        table: config.table.clone(),
        database: config.database.clone(),
        mode: config.load_mode,
        rows_written,
        table_rows,
    })
}
