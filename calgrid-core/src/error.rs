//! Error types for calgrid.

use thiserror::Error;

/// Errors that can occur in calgrid operations.
///
/// Malformed recurrence rules never show up here; they expand to nothing.
#[derive(Error, Debug)]
pub enum CalGridError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Invalid time span: end {end} is before start {start}")]
    InvalidSpan { start: String, end: String },

    #[error("Event store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for calgrid operations.
pub type CalGridResult<T> = Result<T, CalGridError>;
