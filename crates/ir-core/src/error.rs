//! Error types for the bridge core

use thiserror::Error;

/// Errors that can occur in the command library and coordinator
#[derive(Error, Debug)]
pub enum CoreError {
    /// Name failed validation
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// Hub request failed
    #[error("Hub error: {0}")]
    Client(#[from] extender_client::ClientError),

    /// IO error (persistence)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// True for errors caused by a bad caller-supplied name.
    #[must_use] pub fn is_invalid_name(&self) -> bool {
        matches!(self, CoreError::InvalidName(_))
    }
}
