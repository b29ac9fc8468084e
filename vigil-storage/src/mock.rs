//! A recording, fault-injecting client for tests.

use crate::client::{
    AcknowledgedResponse, GetResponse, IndexMapping, IndexRequest, IndexResponse, JobIndexClient,
    ShardFailure,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use vigil_types::JobId;

/// Faults applied to calls passing through a [`RecordingClient`].
#[derive(Debug, Default)]
struct Faults {
    unacknowledged_create: bool,
    unacknowledged_put_mapping: bool,
    shard_failures: Vec<ShardFailure>,
    fail_index: Option<String>,
    fail_get: Option<String>,
}

/// Per-operation call counts.
#[derive(Debug, Default)]
struct Counters {
    index_exists: AtomicUsize,
    create_index: AtomicUsize,
    put_mapping: AtomicUsize,
    get: AtomicUsize,
    index: AtomicUsize,
}

/// Wraps a client, counting calls and optionally corrupting responses.
pub struct RecordingClient {
    inner: Arc<dyn JobIndexClient>,
    counters: Counters,
    faults: Mutex<Faults>,
    requests: Mutex<Vec<IndexRequest>>,
}

impl RecordingClient {
    pub fn new(inner: Arc<dyn JobIndexClient>) -> Self {
        Self {
            inner,
            counters: Counters::default(),
            faults: Mutex::new(Faults::default()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Index creation reports `acknowledged: false` (the index is still created).
    pub fn unacknowledge_create(&self) {
        self.faults().unacknowledged_create = true;
    }

    /// Mapping updates report `acknowledged: false` (the mapping is still applied).
    pub fn unacknowledge_put_mapping(&self) {
        self.faults().unacknowledged_put_mapping = true;
    }

    /// Successful writes report these shard failures.
    pub fn fail_shards(&self, failures: Vec<ShardFailure>) {
        self.faults().shard_failures = failures;
    }

    /// Writes fail with [`StorageError::InvalidData`] carrying `reason`.
    pub fn fail_writes(&self, reason: impl Into<String>) {
        self.faults().fail_index = Some(reason.into());
    }

    /// Reads fail with [`StorageError::InvalidData`] carrying `reason`.
    pub fn fail_reads(&self, reason: impl Into<String>) {
        self.faults().fail_get = Some(reason.into());
    }

    /// Removes every injected fault.
    pub fn clear_faults(&self) {
        *self.faults() = Faults::default();
    }

    #[must_use]
    pub fn index_exists_calls(&self) -> usize {
        self.counters.index_exists.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn create_index_calls(&self) -> usize {
        self.counters.create_index.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn put_mapping_calls(&self) -> usize {
        self.counters.put_mapping.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.counters.get.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn index_calls(&self) -> usize {
        self.counters.index.load(Ordering::SeqCst)
    }

    /// Sum of all store calls.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.index_exists_calls()
            + self.create_index_calls()
            + self.put_mapping_calls()
            + self.get_calls()
            + self.index_calls()
    }

    /// Write requests seen so far, in order.
    #[must_use]
    pub fn index_requests(&self) -> Vec<IndexRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl JobIndexClient for RecordingClient {
    async fn index_exists(&self, index: &str) -> StorageResult<bool> {
        self.counters.index_exists.fetch_add(1, Ordering::SeqCst);
        self.inner.index_exists(index).await
    }

    async fn create_index(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> StorageResult<AcknowledgedResponse> {
        self.counters.create_index.fetch_add(1, Ordering::SeqCst);
        let response = self.inner.create_index(index, mapping).await?;
        if self.faults().unacknowledged_create {
            return Ok(AcknowledgedResponse::unacknowledged());
        }
        Ok(response)
    }

    async fn put_mapping(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> StorageResult<AcknowledgedResponse> {
        self.counters.put_mapping.fetch_add(1, Ordering::SeqCst);
        let response = self.inner.put_mapping(index, mapping).await?;
        if self.faults().unacknowledged_put_mapping {
            return Ok(AcknowledgedResponse::unacknowledged());
        }
        Ok(response)
    }

    async fn get(&self, index: &str, id: &JobId, timeout: Duration) -> StorageResult<GetResponse> {
        self.counters.get.fetch_add(1, Ordering::SeqCst);
        let injected = self.faults().fail_get.clone();
        if let Some(reason) = injected {
            return Err(StorageError::InvalidData(reason));
        }
        self.inner.get(index, id, timeout).await
    }

    async fn index(&self, request: IndexRequest) -> StorageResult<IndexResponse> {
        self.counters.index.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let (injected, shard_failures) = {
            let faults = self.faults();
            (faults.fail_index.clone(), faults.shard_failures.clone())
        };
        if let Some(reason) = injected {
            return Err(StorageError::InvalidData(reason));
        }
        let mut response = self.inner.index(request).await?;
        if !shard_failures.is_empty() {
            response.shard_info.total += u32::try_from(shard_failures.len()).unwrap_or(0);
            response.shard_info.failures = shard_failures;
        }
        Ok(response)
    }
}
