// Error types for the relay core

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors that can occur while relaying device events
#[derive(Debug, Error)]
pub enum RelayError {
    /// The device reader failed to produce a message
    #[error("Device read error: {0}")]
    Device(String),

    /// Snapshot could not be loaded or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing or invalid startup parameter
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Create a device read error
    pub fn device(msg: impl Into<String>) -> Self {
        RelayError::Device(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        RelayError::Persistence(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        RelayError::Configuration(msg.into())
    }
}
