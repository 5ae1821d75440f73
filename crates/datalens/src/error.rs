//! Error types for the datalens library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for datalens operations.
#[derive(Debug, Error)]
pub enum DataLensError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Decode or format-structure failure while loading a file.
    #[error("Load error: {0}")]
    Load(String),

    /// File format not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Empty file or no data to analyze.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// A named column does not exist in the table.
    #[error("Column not found: '{0}'")]
    ColumnNotFound(String),

    /// A numeric operation was requested on a non-numeric column.
    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),

    /// Not enough data for the requested analysis.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Unrecognized algorithm or strategy name.
    #[error("Invalid method: '{0}'")]
    InvalidMethod(String),

    /// Malformed cleaning or analysis configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A cleaning step failed; the whole pipeline run is aborted.
    #[error("Cleaning step '{step}' failed: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<DataLensError>,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DataLensError {
    /// Wrap an error with the cleaning step it occurred in.
    pub(crate) fn in_step(self, step: &str) -> Self {
        DataLensError::Step {
            step: step.to_string(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for datalens operations.
pub type Result<T> = std::result::Result<T, DataLensError>;
