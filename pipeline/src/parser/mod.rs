//! Raw traffic file parser.
//!
//! Reads the semicolon-delimited raw file, with encoding auto-detection,
//! and splits each line into a header and fixed-width measurement groups.
//!
//! ```text
//! 1 ; Car ; 100.5 ; 20.3 ; lat;lon;speed;lon_acc;lat_acc;time ; lat;... ; <dropped>
//! └──────── header ─────┘ └──────────── group 1 ─────────────┘ └ group 2 ┘
//! ```

use std::path::Path;

use crate::error::{TransformError, TransformResult};
use crate::models::{RawRecord, GROUP_SIZE, HEADER_FIELDS};

/// Field separator of the raw file.
pub const RAW_DELIMITER: char = ';';

/// Decoded raw file content, first line already skipped.
#[derive(Debug, Clone)]
pub struct RawInput {
    /// Detected encoding
    pub encoding: String,
    /// Data lines as (1-based line number, text). Blank lines are dropped.
    pub lines: Vec<(usize, String)>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names; other labels are passed through to encoding_rs
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "latin-1" => "iso-8859-1".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding label.
///
/// Any WHATWG label chardet reports is honored (e.g. `iso-8859-9`);
/// unknown labels fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding_rs::Encoding::for_label(encoding.as_bytes()) {
        Some(enc) => enc.decode(bytes).0.into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Split a line on `delimiter`, trimming surrounding whitespace from every field.
pub fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter).map(|f| f.trim().to_string()).collect()
}

/// Split `items` into consecutive chunks of `n`, in order.
///
/// The last chunk is kept even when shorter than `n`.
pub fn split_into_chunks<T: Clone>(items: &[T], n: usize) -> Vec<Vec<T>> {
    items.chunks(n.max(1)).map(|c| c.to_vec()).collect()
}

/// Split one raw line into its header and measurement groups.
///
/// The last field of the line is always discarded. Lines with fewer than
/// `HEADER_FIELDS + 2` fields carry no groups.
pub fn parse_raw_line(line_no: usize, line: &str) -> RawRecord {
    let fields = split_fields(line, RAW_DELIMITER);

    let header_end = fields.len().min(HEADER_FIELDS);
    let header = fields[..header_end].to_vec();

    let payload_end = fields.len().saturating_sub(1);
    let payload = if payload_end > HEADER_FIELDS {
        &fields[HEADER_FIELDS..payload_end]
    } else {
        &[][..]
    };

    RawRecord {
        line: line_no,
        header,
        groups: split_into_chunks(payload, GROUP_SIZE),
    }
}

/// Decode raw bytes and return data lines.
///
/// The first physical line is a caption and is skipped unconditionally.
pub fn decode_raw(bytes: &[u8]) -> RawInput {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);

    let lines = content
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| (idx + 1, line.to_string()))
        .collect();

    RawInput { encoding, lines }
}

/// Read the raw file at `path`.
pub fn read_raw_lines<P: AsRef<Path>>(path: P) -> TransformResult<RawInput> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(TransformError::InputNotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    Ok(decode_raw(&bytes))
}

/// Parse all data lines of a decoded raw file.
pub fn parse_raw_input(input: &RawInput) -> Vec<RawRecord> {
    input
        .lines
        .iter()
        .map(|(line_no, line)| parse_raw_line(*line_no, line))
        .collect()
}
