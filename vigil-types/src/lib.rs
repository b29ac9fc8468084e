//! Core type definitions for Vigil.
//!
//! This crate defines the fundamental, resource-agnostic types used throughout
//! the alerting control plane:
//! - Document identifiers assigned by the shared index
//! - Sequence-number / primary-term concurrency tokens
//! - Caller identity (authenticated user or disabled security)
//! - REST-style status, method and refresh-policy enums
//! - The binary stream codec used by request/response envelopes
//!
//! Resource models (destinations, monitors) live in `vigil-model`.

mod ids;
mod rest;
mod seqno;
pub mod stream;
mod user;

pub use ids::JobId;
pub use rest::{RefreshPolicy, RestMethod, RestStatus};
pub use seqno::{PrimaryTerm, SeqNo};
pub use stream::{Readable, StreamError, StreamInput, StreamOutput, WireEnum, Writeable};
pub use user::{Caller, User, ALL_ACCESS_ROLE};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid document id: {0:?}")]
    InvalidId(String),

    #[error("invalid refresh policy: {0:?}")]
    InvalidRefreshPolicy(String),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
}
