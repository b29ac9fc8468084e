//! Alerting control plane for Vigil.
//!
//! Persists monitors and notification destinations into the shared
//! scheduled-jobs index. A write passes, in order:
//!
//! 1. the [`AccessGate`] pre-check on the caller's backend roles,
//! 2. the [`TypeAllowList`] for the resource's sub-type,
//! 3. [`ScheduledJobIndices::ensure_ready`], which creates the index or
//!    updates its mapping at most once per process,
//! 4. for updates, a point read and an ownership post-check,
//! 5. the [`JobWriter`]'s conditional write.
//!
//! Concurrent writers are serialized only by the store's seq-no/primary-term
//! check; nothing here locks a resource.

pub mod action;
mod allow_list;
mod error;
mod indices;
mod schema_state;
mod security;
pub mod settings;
mod writer;

pub use action::TransportAction;
pub use allow_list::TypeAllowList;
pub use error::{AlertingError, AlertingResult};
pub use indices::{
    scheduled_job_mappings, ScheduledJobIndices, SCHEDULED_JOBS_INDEX,
    SCHEDULED_JOB_INDEX_SCHEMA_VERSION,
};
pub use schema_state::SchemaState;
pub use security::AccessGate;
pub use settings::{AlertingSettings, BackoffPolicy, ClusterSettings, SettingsError};
pub use writer::{check_shards_failure, JobWrite, JobWriter, WriteOutcome};

use action::{GetMonitorAction, IndexDestinationAction, IndexMonitorAction};
use std::sync::Arc;
use vigil_storage::JobIndexClient;

/// Every action wired to one store and one settings source.
pub struct AlertingService {
    pub index_destination: IndexDestinationAction,
    pub index_monitor: IndexMonitorAction,
    pub get_monitor: GetMonitorAction,
    indices: ScheduledJobIndices,
    settings: ClusterSettings,
}

impl AlertingService {
    pub fn new(client: Arc<dyn JobIndexClient>, settings: ClusterSettings) -> Self {
        let gate = AccessGate::new(settings.subscribe());
        let indices = ScheduledJobIndices::new(Arc::clone(&client), Arc::new(SchemaState::new()));
        let writer = JobWriter::new(client, gate.clone(), settings.subscribe());

        Self {
            index_destination: IndexDestinationAction::new(
                gate.clone(),
                TypeAllowList::destinations(settings.subscribe()),
                indices.clone(),
                writer.clone(),
            ),
            index_monitor: IndexMonitorAction::new(
                gate.clone(),
                TypeAllowList::monitors(settings.subscribe()),
                indices.clone(),
                writer.clone(),
            ),
            get_monitor: GetMonitorAction::new(gate, writer),
            indices,
            settings,
        }
    }

    #[must_use]
    pub fn indices(&self) -> &ScheduledJobIndices {
        &self.indices
    }

    #[must_use]
    pub fn settings(&self) -> &ClusterSettings {
        &self.settings
    }
}
