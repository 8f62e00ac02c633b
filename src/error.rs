//! Error types for planning and scheduling.
//!
//! Fatal conditions are `ScheduleError` values. Malformed downtime rows
//! are not fatal: they surface as [`MalformedDowntime`] warnings next to
//! the normalized calendar (see `models::DowntimeCalendar::from_raw`).

use thiserror::Error;

use crate::validation::ValidationError;

/// Result type for planning operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Planning and scheduling errors.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// A configuration value is out of range or missing.
    #[error("invalid configuration `{field}`: {reason}")]
    Configuration { field: String, reason: String },

    /// Structural problems in the operation list or machine list.
    #[error("input validation failed: {}", summarize(.0))]
    Validation(Vec<ValidationError>),

    /// A re-ingested plan row lacks required fields.
    #[error("plan row {row} is missing required fields: {}", .missing.join(", "))]
    IngestMissingFields { row: usize, missing: Vec<String> },

    /// A re-ingested plan row has a field that cannot be interpreted.
    #[error("plan row {row} is invalid: {reason}")]
    IngestInvalidRow { row: usize, reason: String },

    /// The run was cancelled between assignments.
    #[error("scheduling cancelled after {scheduled} of {total} operations")]
    Cancelled { scheduled: usize, total: usize },

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading a configuration or plan file failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ScheduleError {
    /// Shorthand for a configuration error.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A downtime row that was dropped during normalization.
///
/// Reported to the caller and logged, but never aborts a run.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("skipped downtime row {index} on machine `{machine}`: {reason}")]
pub struct MalformedDowntime {
    /// Machine the row was declared for.
    pub machine: String,
    /// Position of the row within that machine's list.
    pub index: usize,
    /// Why the row was rejected.
    pub reason: String,
}
