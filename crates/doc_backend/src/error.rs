//! Error types for backend primitives

use thiserror::Error;

/// Failures raised by a backend primitive.
///
/// A primitive that the application merely declines (no document, cursor not in
/// a table, ...) returns `Ok(false)` instead; these variants are reserved for
/// calls that could not be carried out at all.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend is not connected")]
    NotConnected,

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BackendError>;
