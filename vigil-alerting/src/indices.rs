//! Lifecycle of the shared scheduled-jobs index.

use crate::error::{AlertingError, AlertingResult};
use crate::schema_state::SchemaState;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use vigil_storage::{IndexMapping, JobIndexClient, StorageError};

/// Name of the index every scheduled job is stored in.
pub const SCHEDULED_JOBS_INDEX: &str = ".opendistro-alerting-config";

/// Schema version of [`scheduled_job_mappings`].
pub const SCHEDULED_JOB_INDEX_SCHEMA_VERSION: i32 = 4;

/// Mapping of the scheduled-jobs index.
#[must_use]
pub fn scheduled_job_mappings() -> IndexMapping {
    let user = json!({
        "properties": {
            "name": { "type": "text", "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } } },
            "backend_roles": { "type": "text", "fields": { "keyword": { "type": "keyword" } } },
            "roles": { "type": "text", "fields": { "keyword": { "type": "keyword" } } },
            "custom_attribute_names": { "type": "text", "fields": { "keyword": { "type": "keyword" } } }
        }
    });
    IndexMapping {
        schema_version: SCHEDULED_JOB_INDEX_SCHEMA_VERSION,
        properties: json!({
            "monitor": {
                "dynamic": "false",
                "properties": {
                    "schema_version": { "type": "integer" },
                    "name": { "type": "text", "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } } },
                    "monitor_type": { "type": "keyword" },
                    "user": user,
                    "enabled": { "type": "boolean" },
                    "enabled_time": { "type": "date", "format": "strict_date_time||epoch_millis" },
                    "last_update_time": { "type": "date", "format": "strict_date_time||epoch_millis" },
                    "schedule": { "type": "object", "enabled": false },
                    "inputs": { "type": "nested" },
                    "triggers": { "type": "nested" }
                }
            },
            "destination": {
                "dynamic": "false",
                "properties": {
                    "schema_version": { "type": "integer" },
                    "name": { "type": "text", "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } } },
                    "user": user,
                    "type": { "type": "keyword" },
                    "last_update_time": { "type": "date", "format": "strict_date_time||epoch_millis" },
                    "chime": { "properties": { "url": { "type": "text" } } },
                    "slack": { "properties": { "url": { "type": "text" } } },
                    "custom_webhook": {
                        "properties": {
                            "url": { "type": "text" },
                            "host": { "type": "text" },
                            "port": { "type": "integer" },
                            "path": { "type": "keyword" }
                        }
                    },
                    "email": {
                        "properties": {
                            "email_account_id": { "type": "keyword" },
                            "recipients": { "type": "keyword" }
                        }
                    },
                    "sns": {
                        "properties": {
                            "topic_arn": { "type": "keyword" },
                            "role_arn": { "type": "keyword" }
                        }
                    }
                }
            }
        }),
    }
}

/// Makes sure the scheduled-jobs index exists with a current mapping.
#[derive(Clone)]
pub struct ScheduledJobIndices {
    client: Arc<dyn JobIndexClient>,
    state: Arc<SchemaState>,
}

impl ScheduledJobIndices {
    pub fn new(client: Arc<dyn JobIndexClient>, state: Arc<SchemaState>) -> Self {
        Self { client, state }
    }

    #[must_use]
    pub fn schema_state(&self) -> &Arc<SchemaState> {
        &self.state
    }

    pub async fn scheduled_job_index_exists(&self) -> AlertingResult<bool> {
        Ok(self.client.index_exists(SCHEDULED_JOBS_INDEX).await?)
    }

    /// Creates the index or updates its mapping, whichever is needed.
    ///
    /// Once the mapping is known to be current this returns without touching
    /// the store. Failures are not retried.
    pub async fn ensure_ready(&self) -> AlertingResult<()> {
        if self.state.is_current() {
            return Ok(());
        }
        let mapping = scheduled_job_mappings();

        if !self.scheduled_job_index_exists().await? {
            match self.client.create_index(SCHEDULED_JOBS_INDEX, &mapping).await {
                Ok(response) if response.acknowledged => {
                    info!("Created {} with mappings.", SCHEDULED_JOBS_INDEX);
                    self.state.mark_current();
                    return Ok(());
                }
                Ok(_) => {
                    error!("Create {} mappings call not acknowledged.", SCHEDULED_JOBS_INDEX);
                    return Err(AlertingError::Internal(format!(
                        "Create {SCHEDULED_JOBS_INDEX} mappings call not acknowledged"
                    )));
                }
                // Another writer created it first; fall through to the mapping update.
                Err(StorageError::ResourceAlreadyExists(_)) => {}
                Err(e) => return Err(AlertingError::Internal(e.to_string())),
            }
        }

        let response = self
            .client
            .put_mapping(SCHEDULED_JOBS_INDEX, &mapping)
            .await
            .map_err(|e| AlertingError::Internal(e.to_string()))?;
        if !response.acknowledged {
            error!("Update {} mappings call not acknowledged.", SCHEDULED_JOBS_INDEX);
            return Err(AlertingError::Internal(format!(
                "Updated {SCHEDULED_JOBS_INDEX} mappings call not acknowledged."
            )));
        }
        info!("Updated {} with mappings.", SCHEDULED_JOBS_INDEX);
        self.state.mark_current();
        Ok(())
    }
}
