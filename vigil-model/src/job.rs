//! The common shape of resources stored in the scheduled-jobs index.

use crate::{Destination, ModelError, ModelResult, Monitor};
use serde::{Deserialize, Serialize};
use vigil_types::{
    JobId, PrimaryTerm, Readable, SeqNo, StreamError, StreamInput, StreamOutput, User, Writeable,
};

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A resource that lives in the shared scheduled-jobs index.
pub trait ScheduledJob:
    Clone + Send + Sync + 'static + Writeable + Readable + std::fmt::Debug
{
    /// Top-level key of the stored document.
    const JOB_TYPE: &'static str;

    /// Human-readable kind used in error messages.
    const DISPLAY_NAME: &'static str;

    /// The sub-type consulted by the allow-list.
    fn sub_type(&self) -> &'static str;

    fn owner(&self) -> Option<&User>;

    fn set_owner(&mut self, owner: User);

    fn schema_version(&self) -> i32;

    fn set_schema_version(&mut self, version: i32);

    /// Stamps the last-update time.
    fn touch(&mut self, now: i64);

    fn validate(&self) -> ModelResult<()>;

    fn into_document(self) -> JobDocument;

    fn from_document(doc: JobDocument) -> ModelResult<Self>;
}

/// A stored document body, keyed by its job type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobDocument {
    Destination(Destination),
    Monitor(Monitor),
}

impl JobDocument {
    #[must_use]
    pub fn job_type(&self) -> &'static str {
        match self {
            Self::Destination(_) => Destination::JOB_TYPE,
            Self::Monitor(_) => Monitor::JOB_TYPE,
        }
    }

    pub fn to_source(&self) -> ModelResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_source(source: serde_json::Value) -> ModelResult<Self> {
        Ok(serde_json::from_value(source)?)
    }
}

impl ScheduledJob for Destination {
    const JOB_TYPE: &'static str = "destination";
    const DISPLAY_NAME: &'static str = "Destination";

    fn sub_type(&self) -> &'static str {
        self.destination_type().as_str()
    }

    fn owner(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn set_owner(&mut self, owner: User) {
        self.user = Some(owner);
    }

    fn schema_version(&self) -> i32 {
        self.schema_version
    }

    fn set_schema_version(&mut self, version: i32) {
        self.schema_version = version;
    }

    fn touch(&mut self, now: i64) {
        self.last_update_time = Some(now);
    }

    fn validate(&self) -> ModelResult<()> {
        Destination::validate(self)
    }

    fn into_document(self) -> JobDocument {
        JobDocument::Destination(self)
    }

    fn from_document(doc: JobDocument) -> ModelResult<Self> {
        match doc {
            JobDocument::Destination(d) => Ok(d),
            other => Err(ModelError::WrongJobType {
                expected: Self::JOB_TYPE,
                found: other.job_type(),
            }),
        }
    }
}

impl ScheduledJob for Monitor {
    const JOB_TYPE: &'static str = "monitor";
    const DISPLAY_NAME: &'static str = "Monitor";

    fn sub_type(&self) -> &'static str {
        self.monitor_type.as_str()
    }

    fn owner(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn set_owner(&mut self, owner: User) {
        self.user = Some(owner);
    }

    fn schema_version(&self) -> i32 {
        self.schema_version
    }

    fn set_schema_version(&mut self, version: i32) {
        self.schema_version = version;
    }

    fn touch(&mut self, now: i64) {
        Monitor::touch(self, now);
    }

    fn validate(&self) -> ModelResult<()> {
        Monitor::validate(self)
    }

    fn into_document(self) -> JobDocument {
        JobDocument::Monitor(self)
    }

    fn from_document(doc: JobDocument) -> ModelResult<Self> {
        match doc {
            JobDocument::Monitor(m) => Ok(m),
            other => Err(ModelError::WrongJobType {
                expected: Self::JOB_TYPE,
                found: other.job_type(),
            }),
        }
    }
}

/// A resource together with the version the store assigned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredJob<J> {
    pub id: JobId,
    pub version: i64,
    pub seq_no: SeqNo,
    pub primary_term: PrimaryTerm,
    pub job: J,
}

impl<J: ScheduledJob> StoredJob<J> {
    /// Decodes a stored source into a typed job.
    pub fn from_source(
        id: JobId,
        version: i64,
        seq_no: SeqNo,
        primary_term: PrimaryTerm,
        source: serde_json::Value,
    ) -> ModelResult<Self> {
        let job = J::from_document(JobDocument::from_source(source)?)?;
        Ok(Self {
            id,
            version,
            seq_no,
            primary_term,
            job,
        })
    }
}

impl<J: Writeable> Writeable for StoredJob<J> {
    fn write_to(&self, out: &mut StreamOutput) {
        self.id.write_to(out);
        out.write_i64(self.version);
        self.seq_no.write_to(out);
        self.primary_term.write_to(out);
        self.job.write_to(out);
    }
}

impl<J: Readable> Readable for StoredJob<J> {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, StreamError> {
        Ok(Self {
            id: JobId::read_from(input)?,
            version: input.read_i64()?,
            seq_no: SeqNo::read_from(input)?,
            primary_term: PrimaryTerm::read_from(input)?,
            job: J::read_from(input)?,
        })
    }
}
