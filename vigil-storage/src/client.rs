//! The store boundary: what the alerting layer needs from a shared index.

use crate::StorageResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vigil_types::{JobId, PrimaryTerm, RefreshPolicy, SeqNo};

/// Mapping definition offered when creating or updating an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMapping {
    /// Version recorded under `_meta.schema_version`.
    pub schema_version: i32,
    pub properties: serde_json::Value,
}

impl IndexMapping {
    /// Mapping body as sent to the store.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "_meta": { "schema_version": self.schema_version },
            "properties": self.properties,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgedResponse {
    pub acknowledged: bool,
}

impl AcknowledgedResponse {
    #[must_use]
    pub const fn acknowledged() -> Self {
        Self { acknowledged: true }
    }

    #[must_use]
    pub const fn unacknowledged() -> Self {
        Self {
            acknowledged: false,
        }
    }
}

/// A single-document write.
///
/// Without an id the store assigns one. With an assigned `if_seq_no` the
/// write only succeeds if the stored document still carries that version.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRequest {
    pub index: String,
    pub id: Option<JobId>,
    pub source: serde_json::Value,
    pub if_seq_no: SeqNo,
    pub if_primary_term: PrimaryTerm,
    pub refresh: RefreshPolicy,
    pub timeout: Duration,
}

impl IndexRequest {
    pub fn new(index: impl Into<String>, source: serde_json::Value) -> Self {
        Self {
            index: index.into(),
            id: None,
            source,
            if_seq_no: SeqNo::UNASSIGNED,
            if_primary_term: PrimaryTerm::UNASSIGNED,
            refresh: RefreshPolicy::default(),
            timeout: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn id(mut self, id: JobId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn if_seq_no(mut self, seq_no: SeqNo) -> Self {
        self.if_seq_no = seq_no;
        self
    }

    #[must_use]
    pub fn if_primary_term(mut self, primary_term: PrimaryTerm) -> Self {
        self.if_primary_term = primary_term;
        self
    }

    #[must_use]
    pub fn refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocWriteResult {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardFailure {
    pub shard_id: u32,
    pub reason: String,
}

/// Replication outcome of a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardInfo {
    pub total: u32,
    pub successful: u32,
    pub failures: Vec<ShardFailure>,
}

impl ShardInfo {
    /// All `total` copies applied the write.
    #[must_use]
    pub fn success(total: u32) -> Self {
        Self {
            total,
            successful: total,
            failures: Vec::new(),
        }
    }

    #[must_use]
    pub fn failed(&self) -> u32 {
        u32::try_from(self.failures.len()).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResponse {
    pub id: JobId,
    pub version: i64,
    pub seq_no: SeqNo,
    pub primary_term: PrimaryTerm,
    pub result: DocWriteResult,
    pub shard_info: ShardInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetResponse {
    pub id: JobId,
    pub found: bool,
    pub version: i64,
    pub seq_no: SeqNo,
    pub primary_term: PrimaryTerm,
    pub source: Option<serde_json::Value>,
}

impl GetResponse {
    #[must_use]
    pub fn not_found(id: JobId) -> Self {
        Self {
            id,
            found: false,
            version: -1,
            seq_no: SeqNo::UNASSIGNED,
            primary_term: PrimaryTerm::UNASSIGNED,
            source: None,
        }
    }
}

/// Async access to the shared index.
///
/// Every call completes exactly once with either a response or an error.
#[async_trait]
pub trait JobIndexClient: Send + Sync {
    async fn index_exists(&self, index: &str) -> StorageResult<bool>;

    /// Fails with [`StorageError::ResourceAlreadyExists`](crate::StorageError::ResourceAlreadyExists)
    /// if the index is already there.
    async fn create_index(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> StorageResult<AcknowledgedResponse>;

    async fn put_mapping(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> StorageResult<AcknowledgedResponse>;

    async fn get(&self, index: &str, id: &JobId, timeout: Duration) -> StorageResult<GetResponse>;

    async fn index(&self, request: IndexRequest) -> StorageResult<IndexResponse>;
}
