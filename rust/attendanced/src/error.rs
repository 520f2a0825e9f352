use crate::keys::KeyError;
use crate::store::StoreError;
use thiserror::Error;

/// Failures surfaced by session, roster and class operations.
///
/// None of these end the process; the IPC layer turns each into an error
/// response and the daemon keeps serving.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid password")]
    Authentication,

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("no teacher is logged in")]
    NotAuthenticated,

    #[error("{0}")]
    Workflow(&'static str),

    #[error("student not found: {0}")]
    NotFound(String),
}

impl AttendanceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::Authentication => "auth_failed",
            Self::Storage(_) => "storage_failed",
            Self::NotAuthenticated => "not_authenticated",
            Self::Workflow(_) => "workflow_state",
            Self::NotFound(_) => "not_found",
        }
    }
}

impl From<KeyError> for AttendanceError {
    fn from(e: KeyError) -> Self {
        Self::Validation(e.to_string())
    }
}
