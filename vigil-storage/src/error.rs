//! Error types for the storage layer.

use std::time::Duration;
use thiserror::Error;
use vigil_types::{PrimaryTerm, SeqNo};

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from DuckDB.
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no such index [{0}]")]
    IndexNotFound(String),

    #[error("index [{0}] already exists")]
    ResourceAlreadyExists(String),

    /// A conditional write did not match the document's current version.
    #[error(
        "[{id}]: version conflict, required seqNo [{expected_seq_no}], primary term [{expected_primary_term}]. current document has seqNo [{current_seq_no}] and primary term [{current_primary_term}]"
    )]
    VersionConflict {
        id: String,
        expected_seq_no: SeqNo,
        expected_primary_term: PrimaryTerm,
        current_seq_no: SeqNo,
        current_primary_term: PrimaryTerm,
    },

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// A blocking task failed to complete.
    #[error("storage task failed: {0}")]
    Task(String),
}
