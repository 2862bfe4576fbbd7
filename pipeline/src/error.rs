//! Error types for the trafic ingestion pipeline.
//!
//! One error type per stage:
//!
//! - [`ConfigError`] - Configuration resolution errors
//! - [`TransformError`] - Raw file reshaping errors
//! - [`LoadError`] - Database load errors
//! - [`DagError`] - Task graph errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while resolving the pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Config file is not valid TOML.
    #[error("Invalid config file: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Table name is not a plain SQL identifier.
    #[error("Invalid table name '{0}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidTable(String),

    /// An environment override could not be interpreted.
    #[error("Invalid value for {var}: {message}")]
    InvalidEnv { var: String, message: String },
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors while reshaping the raw traffic file.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Raw input file does not exist.
    #[error("Raw input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Failed to read or write a file.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to write the processed CSV.
    #[error("CSV write error: {0}")]
    CsvError(#[from] csv::Error),

    /// A line ended with an incomplete measurement group (reject policy only).
    #[error("Line {line}: trailing group has {len} of 6 fields")]
    ShortGroup { line: usize, len: usize },
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while loading the processed CSV into the database.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Processed file does not exist.
    #[error("Processed file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Failed to open the database file or its directory.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to read or deserialize the processed CSV.
    #[error("CSV read error: {0}")]
    CsvError(#[from] csv::Error),

    /// Processed file header does not match the output columns.
    #[error("Unexpected header: expected [{expected}], found [{found}]")]
    UnexpectedHeader { expected: String, found: String },

    /// Row has no `type`, which the table requires.
    #[error("Row {row}: missing required field 'type'")]
    MissingType { row: usize },
}

// =============================================================================
// DAG Errors
// =============================================================================

/// Errors in the task graph definition.
#[derive(Debug, Error)]
pub enum DagError {
    /// The task graph contains a cycle.
    #[error("Task graph contains a cycle through: {0}")]
    Cycle(String),

    /// An edge refers to a task that is not in the graph.
    #[error("Edge refers to unknown task: {0}")]
    UnknownTask(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// Wraps every stage error so that the CLI and the DAG runner
/// can handle a single type.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Transformation error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Load error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Task graph error.
    #[error("DAG error: {0}")]
    Dag(#[from] DagError),

    /// A scheduled run panicked or was cancelled.
    #[error("Run aborted: {0}")]
    Aborted(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for DAG operations.
pub type DagResult<T> = Result<T, DagError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
