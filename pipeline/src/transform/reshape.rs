//! Reshape raw records into one row per measurement group.
//!
//! ```text
//! Raw record                              Output rows
//! ┌───────────────────────────────┐      ┌──────────────────────┐
//! │ header: 1, Car, 100.5, 20.3   │      │ 1,Car,100.5,20.3,g1… │
//! │ groups: [g1], [g2]            │  →   │ 1,Car,100.5,20.3,g2… │
//! └───────────────────────────────┘      └──────────────────────┘
//! ```

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{TransformError, TransformResult};
use crate::models::{RawRecord, TraficRow};

/// What to do with a trailing group that has fewer than 6 fields.
///
/// Raw lines whose payload is not a multiple of 6 have always produced a
/// short final row. `Emit` keeps that behavior; the other variants exist so
/// the choice is explicit and can be changed per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ShortGroupPolicy {
    /// Emit the short row as-is.
    #[default]
    Emit,
    /// Drop the short row.
    Skip,
    /// Fail the transform.
    Reject,
}

/// Rows produced by [`reshape`] plus per-run counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReshapeOutcome {
    pub rows: Vec<TraficRow>,
    /// Short rows seen (emitted or skipped, depending on policy)
    pub short_rows: usize,
    /// Lines that carried no measurement group
    pub empty_lines: usize,
}

/// Emit one row per group, in line order then group order.
pub fn reshape(records: &[RawRecord], policy: ShortGroupPolicy) -> TransformResult<ReshapeOutcome> {
    let mut outcome = ReshapeOutcome::default();

    for record in records {
        if record.groups.is_empty() {
            outcome.empty_lines += 1;
            continue;
        }

        for group in &record.groups {
            let row = TraficRow::new(&record.header, group);
            if !row.is_complete() {
                outcome.short_rows += 1;
                match policy {
                    ShortGroupPolicy::Emit => {
                        warn!(line = record.line, fields = row.fields.len(), "emitting short row");
                    }
                    ShortGroupPolicy::Skip => {
                        warn!(line = record.line, fields = row.fields.len(), "skipping short row");
                        continue;
                    }
                    ShortGroupPolicy::Reject => {
                        return Err(TransformError::ShortGroup {
                            line: record.line,
                            len: group.len(),
                        });
                    }
                }
            }
            outcome.rows.push(row);
        }
    }

    Ok(outcome)
}
