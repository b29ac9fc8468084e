//! Create or update a destination or monitor.

use super::TransportAction;
use crate::allow_list::TypeAllowList;
use crate::error::{AlertingError, AlertingResult};
use crate::indices::ScheduledJobIndices;
use crate::security::AccessGate;
use crate::writer::{JobWrite, JobWriter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use tracing::info;
use vigil_model::{Destination, Monitor, ScheduledJob};
use vigil_types::{
    Caller, JobId, PrimaryTerm, Readable, RefreshPolicy, RestMethod, RestStatus, SeqNo,
    StreamError, StreamInput, StreamOutput, Writeable,
};

/// Write request for a scheduled job.
///
/// `id` is absent for creates. Unassigned `seq_no`/`primary_term` mean the
/// write carries no precondition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexJobRequest<J> {
    pub id: Option<JobId>,
    pub seq_no: SeqNo,
    pub primary_term: PrimaryTerm,
    pub refresh_policy: RefreshPolicy,
    pub method: RestMethod,
    pub job: J,
}

pub type IndexDestinationRequest = IndexJobRequest<Destination>;
pub type IndexMonitorRequest = IndexJobRequest<Monitor>;

impl<J: ScheduledJob> IndexJobRequest<J> {
    /// A create request without preconditions.
    pub fn create(job: J) -> Self {
        Self {
            id: None,
            seq_no: SeqNo::UNASSIGNED,
            primary_term: PrimaryTerm::UNASSIGNED,
            refresh_policy: RefreshPolicy::default(),
            method: RestMethod::Post,
            job,
        }
    }

    /// An update of `id` expecting the given version.
    pub fn update(id: JobId, seq_no: SeqNo, primary_term: PrimaryTerm, job: J) -> Self {
        Self {
            id: Some(id),
            seq_no,
            primary_term,
            refresh_policy: RefreshPolicy::default(),
            method: RestMethod::Put,
            job,
        }
    }

    #[must_use]
    pub fn with_refresh_policy(mut self, refresh_policy: RefreshPolicy) -> Self {
        self.refresh_policy = refresh_policy;
        self
    }

    pub fn validate(&self) -> AlertingResult<()> {
        if self.method == RestMethod::Put && self.id.is_none() {
            return Err(AlertingError::BadRequest(format!("Missing {} ID", J::JOB_TYPE)));
        }
        self.job.validate()?;
        Ok(())
    }
}

impl<J: Writeable> Writeable for IndexJobRequest<J> {
    fn write_to(&self, out: &mut StreamOutput) {
        out.write_optional(self.id.as_ref());
        self.seq_no.write_to(out);
        self.primary_term.write_to(out);
        out.write_enum(self.refresh_policy);
        out.write_enum(self.method);
        self.job.write_to(out);
    }
}

impl<J: Readable> Readable for IndexJobRequest<J> {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        Ok(Self {
            id: input.read_optional()?,
            seq_no: SeqNo::read_from(input)?,
            primary_term: PrimaryTerm::read_from(input)?,
            refresh_policy: input.read_enum()?,
            method: input.read_enum()?,
            job: J::read_from(input)?,
        })
    }
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexJobResponse<J> {
    pub id: JobId,
    pub version: i64,
    pub seq_no: SeqNo,
    pub primary_term: PrimaryTerm,
    pub status: RestStatus,
    pub job: J,
}

pub type IndexDestinationResponse = IndexJobResponse<Destination>;
pub type IndexMonitorResponse = IndexJobResponse<Monitor>;

impl<J: Writeable> Writeable for IndexJobResponse<J> {
    fn write_to(&self, out: &mut StreamOutput) {
        self.id.write_to(out);
        out.write_i64(self.version);
        self.seq_no.write_to(out);
        self.primary_term.write_to(out);
        out.write_enum(self.status);
        self.job.write_to(out);
    }
}

impl<J: Readable> Readable for IndexJobResponse<J> {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        Ok(Self {
            id: JobId::read_from(input)?,
            version: input.read_i64()?,
            seq_no: SeqNo::read_from(input)?,
            primary_term: PrimaryTerm::read_from(input)?,
            status: input.read_enum()?,
            job: J::read_from(input)?,
        })
    }
}

/// Validates, authorizes and writes one scheduled job.
///
/// Order of checks: caller backend roles, request shape, allow-list, index
/// readiness, then (for updates) the stored owner and the version
/// precondition.
pub struct IndexJobAction<J> {
    gate: AccessGate,
    allow_list: TypeAllowList,
    indices: ScheduledJobIndices,
    writer: JobWriter,
    _job: PhantomData<fn() -> J>,
}

pub type IndexDestinationAction = IndexJobAction<Destination>;
pub type IndexMonitorAction = IndexJobAction<Monitor>;

impl<J: ScheduledJob> IndexJobAction<J> {
    pub fn new(
        gate: AccessGate,
        allow_list: TypeAllowList,
        indices: ScheduledJobIndices,
        writer: JobWriter,
    ) -> Self {
        Self {
            gate,
            allow_list,
            indices,
            writer,
            _job: PhantomData,
        }
    }
}

#[async_trait]
impl<J: ScheduledJob> TransportAction for IndexJobAction<J> {
    type Request = IndexJobRequest<J>;
    type Response = IndexJobResponse<J>;

    async fn execute(&self, request: Self::Request, caller: &Caller) -> AlertingResult<Self::Response> {
        self.gate.validate_user_backend_roles(caller)?;
        request.validate()?;

        let IndexJobRequest {
            id,
            seq_no,
            primary_term,
            refresh_policy,
            method,
            mut job,
        } = request;
        job.set_owner(caller.owner());
        self.allow_list.check(job.sub_type())?;
        self.indices.ensure_ready().await?;

        let outcome = self
            .writer
            .write(
                caller,
                JobWrite {
                    id,
                    method,
                    if_seq_no: seq_no,
                    if_primary_term: primary_term,
                    refresh: refresh_policy,
                    job,
                },
            )
            .await?;

        info!(
            "{} {} {} by [{}]",
            J::DISPLAY_NAME,
            outcome.stored.id,
            if outcome.status == RestStatus::Created {
                "created"
            } else {
                "updated"
            },
            caller.name()
        );
        Ok(IndexJobResponse {
            id: outcome.stored.id,
            version: outcome.stored.version,
            seq_no: outcome.stored.seq_no,
            primary_term: outcome.stored.primary_term,
            status: outcome.status,
            job: outcome.stored.job,
        })
    }
}
