//! Fetch a single monitor.

use super::TransportAction;
use crate::error::{AlertingError, AlertingResult};
use crate::security::AccessGate;
use crate::writer::JobWriter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vigil_model::{Monitor, ScheduledJob};
use vigil_types::{
    Caller, JobId, PrimaryTerm, Readable, RestMethod, RestStatus, SeqNo, StreamError,
    StreamInput, StreamOutput, Writeable,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMonitorRequest {
    pub monitor_id: JobId,
    /// Expected document version; `None` matches any.
    pub version: Option<i64>,
    pub method: RestMethod,
    pub fetch_source: bool,
}

impl GetMonitorRequest {
    pub fn new(monitor_id: JobId) -> Self {
        Self {
            monitor_id,
            version: None,
            method: RestMethod::Get,
            fetch_source: true,
        }
    }

    /// A `HEAD` request never returns the source.
    pub fn head(monitor_id: JobId) -> Self {
        Self {
            monitor_id,
            version: None,
            method: RestMethod::Head,
            fetch_source: false,
        }
    }
}

impl Writeable for GetMonitorRequest {
    fn write_to(&self, out: &mut StreamOutput) {
        self.monitor_id.write_to(out);
        out.write_optional_i64(self.version);
        out.write_enum(self.method);
        out.write_bool(self.fetch_source);
    }
}

impl Readable for GetMonitorRequest {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        Ok(Self {
            monitor_id: JobId::read_from(input)?,
            version: input.read_optional_i64()?,
            method: input.read_enum()?,
            fetch_source: input.read_bool()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetMonitorResponse {
    pub id: JobId,
    pub version: i64,
    pub seq_no: SeqNo,
    pub primary_term: PrimaryTerm,
    pub status: RestStatus,
    pub monitor: Option<Monitor>,
}

impl Writeable for GetMonitorResponse {
    fn write_to(&self, out: &mut StreamOutput) {
        self.id.write_to(out);
        out.write_i64(self.version);
        self.seq_no.write_to(out);
        self.primary_term.write_to(out);
        out.write_enum(self.status);
        out.write_optional(self.monitor.as_ref());
    }
}

impl Readable for GetMonitorResponse {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        Ok(Self {
            id: JobId::read_from(input)?,
            version: input.read_i64()?,
            seq_no: SeqNo::read_from(input)?,
            primary_term: PrimaryTerm::read_from(input)?,
            status: input.read_enum()?,
            monitor: input.read_optional()?,
        })
    }
}

/// Reads a monitor, checking the caller against its owner.
pub struct GetMonitorAction {
    gate: AccessGate,
    writer: JobWriter,
}

impl GetMonitorAction {
    pub fn new(gate: AccessGate, writer: JobWriter) -> Self {
        Self { gate, writer }
    }
}

#[async_trait]
impl TransportAction for GetMonitorAction {
    type Request = GetMonitorRequest;
    type Response = GetMonitorResponse;

    async fn execute(&self, request: Self::Request, caller: &Caller) -> AlertingResult<Self::Response> {
        self.gate.validate_user_backend_roles(caller)?;

        let stored = self
            .writer
            .get::<Monitor>(&request.monitor_id)
            .await?
            .ok_or_else(|| AlertingError::NotFound("Monitor not found.".into()))?;

        if let Some(expected) = request.version
            && expected != stored.version
        {
            return Err(AlertingError::VersionConflict(format!(
                "[{}]: version conflict, current version [{}] is different than the one provided [{}]",
                request.monitor_id, stored.version, expected
            )));
        }

        self.gate.check_user_permissions_with_resource(
            caller,
            stored.job.owner(),
            Monitor::JOB_TYPE,
            request.monitor_id.as_str(),
        )?;

        let include_source = request.fetch_source && request.method != RestMethod::Head;
        Ok(GetMonitorResponse {
            id: stored.id,
            version: stored.version,
            seq_no: stored.seq_no,
            primary_term: stored.primary_term,
            status: RestStatus::Ok,
            monitor: include_source.then_some(stored.job),
        })
    }
}
