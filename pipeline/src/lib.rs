//! # Trafic - traffic record ingestion pipeline
//!
//! Reshapes the raw semicolon-delimited traffic file (one line per tracked
//! object, with a variable number of 6-field measurement groups) into a flat
//! 10-column CSV, then loads that CSV into a SQLite table.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  trafic.csv │────▶│   Parser    │────▶│   Reshape    │────▶│ processed.csv│
//! │ (raw, ';')  │     │ (auto-enc)  │     │ (1 row/group)│     │  (10 cols)   │
//! └─────────────┘     └─────────────┘     └──────────────┘     └──────┬───────┘
//!                                                                     │
//!                                         ┌──────────────┐            │
//!                                         │ trafic_record│◀───────────┘
//!                                         │  (SQLite)    │   Loader (replace)
//!                                         └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trafic::{Dag, PipelineConfig};
//!
//! let config = PipelineConfig::from_workdir("/usr/local/airflow");
//! let run = Dag::trafic_ingestion().run(&config)?;
//! assert!(run.succeeded());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Path and mode resolution
//! - [`models`] - Row layout and domain types
//! - [`parser`] - Raw file decoding and line splitting
//! - [`transform`] - `transform_data` task
//! - [`load`] - `load_data` task
//! - [`dag`] - Task graph and scheduler

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Tasks
pub mod load;
pub mod transform;

// Orchestration
pub mod dag;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, DagError, LoadError, PipelineError, TransformError};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{ConfigOverrides, PipelineConfig};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{RawRecord, TableShape, TraficRecord, TraficRow, OUTPUT_COLUMNS};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_encoding, parse_raw_line, read_raw_lines, split_fields,
    split_into_chunks, RawInput,
};

// =============================================================================
// Re-exports - Tasks
// =============================================================================

pub use transform::{reshape, transform_file, write_processed, ShortGroupPolicy, TransformReport};

pub use load::{
    count_rows, ensure_table, load_file, open_store, read_processed, write_records, LoadMode,
    LoadReport,
};

// =============================================================================
// Re-exports - Orchestration
// =============================================================================

pub use dag::{run_schedule, run_schedule_until, Dag, DagRun, ScheduleOptions, ScheduleSummary, TaskId, TaskState};
