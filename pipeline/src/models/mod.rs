//! Domain models for the trafic ingestion pipeline.
//!
//! - [`RawRecord`] - One raw line split into its header and measurement groups
//! - [`TraficRow`] - One reshaped output row (header + one group)
//! - [`TraficRecord`] - One typed row read back from the processed CSV
//! - [`TableShape`] - Row/column count of a produced table

use serde::{Deserialize, Serialize};

// =============================================================================
// Layout
// =============================================================================

/// Number of leading fields describing the tracked object.
pub const HEADER_FIELDS: usize = 4;

/// Number of fields in one per-timestep measurement group.
pub const GROUP_SIZE: usize = 6;

/// Column names of the processed CSV, in output order.
pub const OUTPUT_COLUMNS: [&str; HEADER_FIELDS + GROUP_SIZE] = [
    "track_id",
    "type",
    "traveled_d",
    "avg_speed",
    "lat",
    "lon",
    "speed",
    "lon_acc",
    "lat_acc",
    "time",
];

// =============================================================================
// Raw Record
// =============================================================================

/// A raw line after splitting.
///
/// `header` holds at most [`HEADER_FIELDS`] values. Every group holds
/// [`GROUP_SIZE`] values except possibly the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 1-based physical line number in the raw file.
    pub line: usize,
    pub header: Vec<String>,
    pub groups: Vec<Vec<String>>,
}

impl RawRecord {
    /// Whether the last group is shorter than [`GROUP_SIZE`].
    pub fn has_short_group(&self) -> bool {
        self.groups.last().is_some_and(|g| g.len() < GROUP_SIZE)
    }
}

// =============================================================================
// Output Row
// =============================================================================

/// One reshaped row: the header fields followed by one measurement group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraficRow {
    pub fields: Vec<String>,
}

impl TraficRow {
    pub fn new(header: &[String], group: &[String]) -> Self {
        let mut fields = Vec::with_capacity(header.len() + group.len());
        fields.extend_from_slice(header);
        fields.extend_from_slice(group);
        Self { fields }
    }

    /// True when the row carries all [`OUTPUT_COLUMNS`].
    pub fn is_complete(&self) -> bool {
        self.fields.len() == OUTPUT_COLUMNS.len()
    }

    /// Header part of the row (track_id, type, traveled_d, avg_speed).
    pub fn header(&self) -> &[String] {
        &self.fields[..self.fields.len().min(HEADER_FIELDS)]
    }

    /// Measurement part of the row (lat .. time).
    pub fn group(&self) -> &[String] {
        &self.fields[self.fields.len().min(HEADER_FIELDS)..]
    }
}

// =============================================================================
// Typed Record
// =============================================================================

/// A processed row as stored in the `trafic_record` table.
///
/// Empty CSV cells deserialize to `None` and are stored as NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraficRecord {
    pub track_id: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub traveled_d: Option<f64>,
    pub avg_speed: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub speed: Option<f64>,
    pub lon_acc: Option<f64>,
    pub lat_acc: Option<f64>,
    pub time: Option<f64>,
}

// =============================================================================
// Table Shape
// =============================================================================

/// Shape of a produced table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableShape {
    pub rows: usize,
    pub columns: usize,
}

impl std::fmt::Display for TableShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.rows, self.columns)
    }
}
