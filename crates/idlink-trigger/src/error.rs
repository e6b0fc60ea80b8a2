//! Error types for trigger event handling

use std::io;

/// Result type for trigger operations
pub type Result<T> = std::result::Result<T, TriggerError>;

/// Errors that can occur while reading or writing trigger events
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    /// No event was supplied
    #[error("No trigger event supplied")]
    EmptyInput,

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
