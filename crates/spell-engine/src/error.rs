//! Error types for spell reconciliation.
//!
//! Only structural problems are errors. Per-entity data-quality conditions are
//! reported as [`crate::merger::Anomaly`] values and never abort a batch.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpellError {
    /// A row violated the table contract (bad identifier, unparseable cell,
    /// wrong field count). Includes the 1-based data row number.
    #[error("Malformed input at row {row}: {message}")]
    MalformedInput { row: usize, message: String },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SpellError>;
