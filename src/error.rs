use std::path::PathBuf;
use thiserror::Error;

use crate::types::Column;

/// Errors raised while loading the dataset or shaping aggregations.
///
/// Empty filter results are deliberately absent: a filter that matches
/// nothing produces an empty view and empty shaped results.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The source file is missing or unreadable.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row could not be turned into a typed record.
    #[error("malformed row at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// An aggregation referenced a column the dataset does not carry.
    #[error("column `{column}` is not present in the dataset")]
    Schema { column: Column },

    /// The aggregation request itself is inconsistent.
    #[error("invalid aggregation: {message}")]
    InvalidSpec { message: String },

    /// A filter was requested on a column that cannot be filtered.
    #[error("column `{column}` cannot be used as a filter")]
    InvalidFilter { column: Column },

    /// The boundary file parsed but is not a usable region collection.
    #[error("boundary file: {0}")]
    Boundary(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }
}
