//! Transformation module.
//!
//! This module handles raw file to processed CSV reshaping:
//! - Reshape: raw records to one row per measurement group
//! - Writer: processed CSV output
//! - Pipeline: the `transform_data` task

pub mod pipeline;
pub mod reshape;
pub mod writer;

pub use pipeline::{transform_file, TransformReport};
pub use reshape::{reshape, ReshapeOutcome, ShortGroupPolicy};
pub use writer::write_processed;
