//! Caller-facing result values

use crate::AssemblyError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    /// The document was created but a later step (usually saving) failed
    PartialSuccess,
    Error,
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }
}

/// Result of composing a whole document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_path: Option<String>,
}

impl DocumentOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            saved_path: None,
        }
    }

    pub fn partial(message: impl Into<String>) -> Self {
        Self {
            status: Status::PartialSuccess,
            message: message.into(),
            saved_path: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            saved_path: None,
        }
    }

    pub fn with_saved_path(mut self, path: impl Into<String>) -> Self {
        self.saved_path = Some(path.into());
        self
    }
}

impl From<AssemblyError> for DocumentOutcome {
    fn from(err: AssemblyError) -> Self {
        Self::error(err.to_string())
    }
}
