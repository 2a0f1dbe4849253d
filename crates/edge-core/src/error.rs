//! Error types for the edge-detect bridge

use thiserror::Error;

/// Errors surfaced by the bridge
#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("Invalid buffer: {0}")]
    InvalidBuffer(String),

    #[error("Processor not initialized")]
    SessionNotInitialized,

    /// Output buffer could not be allocated. Fatal, never retried.
    #[error("Allocation of {requested} bytes failed")]
    Allocation { requested: usize },

    #[error("Processing failed: {0}")]
    Processing(#[from] ProcessingFailure),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures raised inside the image capability.
///
/// These never reach the caller of a processing operation; the session
/// converts them into a passthrough result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessingFailure {
    #[error("Format conversion failed: {0}")]
    Conversion(String),

    #[error("Image operation failed: {0}")]
    Capability(String),

    #[error("Image operation panicked: {0}")]
    Panicked(String),
}

impl From<serde_json::Error> for EdgeError {
    fn from(e: serde_json::Error) -> Self {
        EdgeError::Config(format!("JSON error: {}", e))
    }
}

impl From<toml::de::Error> for EdgeError {
    fn from(e: toml::de::Error) -> Self {
        EdgeError::Config(format!("TOML error: {}", e))
    }
}

impl From<std::io::Error> for EdgeError {
    fn from(e: std::io::Error) -> Self {
        EdgeError::Config(format!("IO error: {}", e))
    }
}
