//! Domain error types

use thiserror::Error;

/// Errors that can occur while building or configuring a synchronizer
///
/// Runtime decode failures (bad CRC, unknown header fields) are not errors:
/// they are reported through the frame callback's validity flags.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Header error: {0}")]
    Header(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for synchronizer operations
pub type SyncResult<T> = Result<T, SyncError>;
