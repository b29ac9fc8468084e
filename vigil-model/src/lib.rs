//! Scheduled-job resource models for Vigil.
//!
//! Defines the resources stored in the shared scheduled-jobs index:
//! - [`Destination`]: a notification target (Chime, Slack, webhook, ...)
//! - [`Monitor`]: a periodically evaluated query with triggers
//! - [`ScheduledJob`]: what the writer needs from any stored resource
//! - [`JobDocument`]: the type-discriminated document body
//! - [`StoredJob`]: a resource together with its store-assigned version
//!
//! Documents written by older releases must keep parsing: every field added
//! after the first schema version is optional on read.

mod destination;
mod job;
mod monitor;

pub use destination::{
    Chime, CustomWebhook, Destination, DestinationConfig, DestinationType, Email, Slack, Sns,
};
pub use job::{now_millis, JobDocument, ScheduledJob, StoredJob};
pub use monitor::{
    IntervalUnit, Monitor, MonitorType, Schedule, MONITOR_MAX_INPUTS, MONITOR_MAX_TRIGGERS,
};

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating or (de)serializing resources.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),

    #[error("expected a {expected} document, found {found}")]
    WrongJobType {
        expected: &'static str,
        found: &'static str,
    },
}
