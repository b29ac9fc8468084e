//! Error types for the alerting layer.

use thiserror::Error;
use vigil_model::ModelError;
use vigil_storage::StorageError;
use vigil_types::RestStatus;

/// Result type for alerting operations.
pub type AlertingResult<T> = Result<T, AlertingError>;

/// Errors reported to callers of the alerting actions.
///
/// Each variant maps to exactly one [`RestStatus`].
#[derive(Debug, Error)]
pub enum AlertingError {
    /// A policy or permission check refused the request.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The stored document moved on since the caller read it.
    #[error("version conflict: {0}")]
    VersionConflict(String),

    /// The request itself is malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AlertingError {
    #[must_use]
    pub fn status(&self) -> RestStatus {
        match self {
            Self::Forbidden(_) => RestStatus::Forbidden,
            Self::NotFound(_) => RestStatus::NotFound,
            Self::VersionConflict(_) => RestStatus::Conflict,
            Self::BadRequest(_) => RestStatus::BadRequest,
            Self::Internal(_) => RestStatus::InternalServerError,
        }
    }

    /// Classifies a store failure.
    #[must_use]
    pub fn wrap(err: StorageError) -> Self {
        match err {
            StorageError::VersionConflict { .. } => Self::VersionConflict(err.to_string()),
            StorageError::IndexNotFound(_) => Self::NotFound(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for AlertingError {
    fn from(err: StorageError) -> Self {
        Self::wrap(err)
    }
}

impl From<ModelError> for AlertingError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation(msg) => Self::BadRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}
