//! Conditional create/update of scheduled jobs.

use crate::error::{AlertingError, AlertingResult};
use crate::indices::{SCHEDULED_JOBS_INDEX, SCHEDULED_JOB_INDEX_SCHEMA_VERSION};
use crate::security::AccessGate;
use crate::settings::AlertingSettings;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};
use vigil_model::{now_millis, ScheduledJob, StoredJob};
use vigil_storage::{IndexRequest, IndexResponse, JobIndexClient};
use vigil_types::{Caller, JobId, PrimaryTerm, RefreshPolicy, RestMethod, RestStatus, SeqNo};

/// One write of a scheduled job, as requested by a caller.
#[derive(Debug, Clone)]
pub struct JobWrite<J> {
    pub id: Option<JobId>,
    pub method: RestMethod,
    pub if_seq_no: SeqNo,
    pub if_primary_term: PrimaryTerm,
    pub refresh: RefreshPolicy,
    pub job: J,
}

/// A written job and the status to report for it.
#[derive(Debug, Clone)]
pub struct WriteOutcome<J> {
    pub stored: StoredJob<J>,
    pub status: RestStatus,
}

/// Concatenated reasons of every failed shard copy, if any failed.
#[must_use]
pub fn check_shards_failure(response: &IndexResponse) -> Option<String> {
    if response.shard_info.failed() == 0 {
        return None;
    }
    Some(
        response
            .shard_info
            .failures
            .iter()
            .map(|f| f.reason.as_str())
            .collect::<String>(),
    )
}

/// Writes jobs to the shared index under seq-no/primary-term preconditions.
#[derive(Clone)]
pub struct JobWriter {
    client: Arc<dyn JobIndexClient>,
    gate: AccessGate,
    settings: watch::Receiver<AlertingSettings>,
}

impl JobWriter {
    pub fn new(
        client: Arc<dyn JobIndexClient>,
        gate: AccessGate,
        settings: watch::Receiver<AlertingSettings>,
    ) -> Self {
        Self {
            client,
            gate,
            settings,
        }
    }

    /// Point read of a job; `None` if there is no such document.
    pub async fn get<J: ScheduledJob>(&self, id: &JobId) -> AlertingResult<Option<StoredJob<J>>> {
        let timeout = self.settings.borrow().request_timeout;
        let response = self.client.get(SCHEDULED_JOBS_INDEX, id, timeout).await?;
        if !response.found {
            return Ok(None);
        }
        let source = response.source.ok_or_else(|| {
            AlertingError::Internal(format!("document {id} was found without a source"))
        })?;
        let stored = StoredJob::from_source(
            response.id,
            response.version,
            response.seq_no,
            response.primary_term,
            source,
        )
        .map_err(|e| AlertingError::Internal(e.to_string()))?;
        Ok(Some(stored))
    }

    /// Creates (`method != Put`) or conditionally updates (`Put`) a job.
    /// A create ignores any id on the request.
    ///
    /// The update branch checks the caller against the stored owner before
    /// writing, and passes the caller's expected seq-no/primary-term through
    /// unchanged.
    pub async fn write<J: ScheduledJob>(
        &self,
        caller: &Caller,
        request: JobWrite<J>,
    ) -> AlertingResult<WriteOutcome<J>> {
        let JobWrite {
            id,
            method,
            if_seq_no,
            if_primary_term,
            refresh,
            mut job,
        } = request;
        job.set_schema_version(SCHEDULED_JOB_INDEX_SCHEMA_VERSION);
        job.touch(now_millis());

        let (id, status) = if method == RestMethod::Put {
            let id = id.ok_or_else(|| {
                AlertingError::BadRequest(format!("Missing {} ID", J::JOB_TYPE))
            })?;
            self.check_existing::<J>(caller, &id).await?;
            (Some(id), RestStatus::Ok)
        } else {
            // creates always get a fresh id from the store
            (None, RestStatus::Created)
        };

        let source = job
            .clone()
            .into_document()
            .to_source()
            .map_err(|e| AlertingError::Internal(e.to_string()))?;
        let timeout = self.settings.borrow().index_timeout;
        let mut index_request = IndexRequest::new(SCHEDULED_JOBS_INDEX, source)
            .if_seq_no(if_seq_no)
            .if_primary_term(if_primary_term)
            .refresh(refresh)
            .timeout(timeout);
        if let Some(id) = id {
            index_request = index_request.id(id);
        }

        let response = self.client.index(index_request).await?;
        if let Some(reasons) = check_shards_failure(&response) {
            warn!(
                "{} {} written with failed shards: {}",
                J::DISPLAY_NAME,
                response.id,
                reasons
            );
            return Err(AlertingError::Internal(reasons));
        }
        debug!(
            "{} {} written at seq_no {}",
            J::DISPLAY_NAME,
            response.id,
            response.seq_no
        );

        Ok(WriteOutcome {
            stored: StoredJob {
                id: response.id,
                version: response.version,
                seq_no: response.seq_no,
                primary_term: response.primary_term,
                job,
            },
            status,
        })
    }

    async fn check_existing<J: ScheduledJob>(&self, caller: &Caller, id: &JobId) -> AlertingResult<()> {
        let Some(existing) = self.get::<J>(id).await? else {
            return Err(AlertingError::NotFound(format!(
                "{} with {} is not found",
                J::DISPLAY_NAME,
                id
            )));
        };
        self.gate.check_user_permissions_with_resource(
            caller,
            existing.job.owner(),
            J::JOB_TYPE,
            id.as_str(),
        )
    }
}
