//! Error types for document assembly

use doc_backend::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Failed to connect to the editing backend")]
    BackendUnavailable,

    /// Malformed request: empty data, bad coordinates, unknown types
    #[error("{0}")]
    Validation(String),

    #[error("Failed to parse table data: {0}")]
    Parse(String),

    /// A backend call failed part way through a table traversal
    #[error("Table fill failed at cell ({row}, {col}): {reason}")]
    Fill { row: usize, col: usize, reason: String },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// A primitive was declined by the backend
    #[error("{0}")]
    Rejected(String),
}

impl AssemblyError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, AssemblyError>;

/// Turn a declined primitive into a `Rejected` error
pub(crate) fn accepted(ok: bool, failure: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(AssemblyError::Rejected(failure.to_string()))
    }
}
