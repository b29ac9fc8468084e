use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use vigil_alerting::{
    scheduled_job_mappings, AlertingError, ScheduledJobIndices, SchemaState,
    SCHEDULED_JOBS_INDEX, SCHEDULED_JOB_INDEX_SCHEMA_VERSION,
};
use vigil_storage::mock::RecordingClient;
use vigil_storage::{
    AcknowledgedResponse, DuckDbJobStore, GetResponse, IndexMapping, IndexRequest, IndexResponse,
    JobIndexClient, StorageResult,
};
use vigil_types::JobId;

fn setup() -> (DuckDbJobStore, Arc<RecordingClient>, ScheduledJobIndices) {
    let store = DuckDbJobStore::open_in_memory().unwrap();
    let client = Arc::new(RecordingClient::new(Arc::new(store.clone())));
    let indices = ScheduledJobIndices::new(client.clone(), Arc::new(SchemaState::new()));
    (store, client, indices)
}

#[test]
fn mapping_carries_schema_version() {
    let mapping = scheduled_job_mappings();
    assert_eq!(mapping.schema_version, SCHEDULED_JOB_INDEX_SCHEMA_VERSION);
    let body = mapping.to_json();
    assert_eq!(
        body["_meta"]["schema_version"],
        serde_json::json!(SCHEDULED_JOB_INDEX_SCHEMA_VERSION)
    );
    assert!(body["properties"]["destination"].is_object());
    assert!(body["properties"]["monitor"].is_object());
}

#[tokio::test]
async fn creates_missing_index_once() {
    let (store, client, indices) = setup();

    indices.ensure_ready().await.unwrap();
    assert!(indices.schema_state().is_current());
    assert_eq!(client.create_index_calls(), 1);
    assert_eq!(client.put_mapping_calls(), 0);

    let calls = client.total_calls();
    indices.ensure_ready().await.unwrap();
    assert_eq!(client.total_calls(), calls);
    assert_eq!(client.create_index_calls(), 1);

    let stored = store.mapping(SCHEDULED_JOBS_INDEX).await.unwrap().unwrap();
    assert_eq!(stored.schema_version, SCHEDULED_JOB_INDEX_SCHEMA_VERSION);
}

#[tokio::test]
async fn updates_mapping_of_existing_index_once() {
    let (store, client, indices) = setup();
    let old = IndexMapping {
        schema_version: 1,
        properties: serde_json::json!({}),
    };
    store.create_index(SCHEDULED_JOBS_INDEX, &old).await.unwrap();

    indices.ensure_ready().await.unwrap();
    indices.ensure_ready().await.unwrap();
    assert_eq!(client.create_index_calls(), 0);
    assert_eq!(client.put_mapping_calls(), 1);

    let stored = store.mapping(SCHEDULED_JOBS_INDEX).await.unwrap().unwrap();
    assert_eq!(stored.schema_version, SCHEDULED_JOB_INDEX_SCHEMA_VERSION);
}

#[tokio::test]
async fn unacknowledged_create_fails_and_stays_stale() {
    let (_store, client, indices) = setup();
    client.unacknowledge_create();

    let err = indices.ensure_ready().await.unwrap_err();
    assert!(matches!(err, AlertingError::Internal(ref m) if m.contains("not acknowledged")));
    assert!(!indices.schema_state().is_current());

    // The index now exists, so the retry goes through a mapping update.
    client.clear_faults();
    indices.ensure_ready().await.unwrap();
    assert_eq!(client.create_index_calls(), 1);
    assert_eq!(client.put_mapping_calls(), 1);
}

#[tokio::test]
async fn unacknowledged_mapping_update_fails() {
    let (store, client, indices) = setup();
    store
        .create_index(SCHEDULED_JOBS_INDEX, &scheduled_job_mappings())
        .await
        .unwrap();
    client.unacknowledge_put_mapping();

    let err = indices.ensure_ready().await.unwrap_err();
    assert!(matches!(err, AlertingError::Internal(_)));
    assert!(!indices.schema_state().is_current());
}

#[tokio::test]
async fn concurrent_first_callers_both_succeed() {
    let (store, _client, indices) = setup();
    let other = indices.clone();

    let (a, b) = tokio::join!(indices.ensure_ready(), other.ensure_ready());
    a.unwrap();
    b.unwrap();
    assert!(store.index_exists(SCHEDULED_JOBS_INDEX).await.unwrap());
}

/// Answers `index_exists` with `false` even after the index was created,
/// as a reader racing another writer's creation would see it.
struct StaleExistsClient {
    inner: DuckDbJobStore,
}

#[async_trait]
impl JobIndexClient for StaleExistsClient {
    async fn index_exists(&self, _index: &str) -> StorageResult<bool> {
        Ok(false)
    }

    async fn create_index(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> StorageResult<AcknowledgedResponse> {
        self.inner.create_index(index, mapping).await
    }

    async fn put_mapping(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> StorageResult<AcknowledgedResponse> {
        self.inner.put_mapping(index, mapping).await
    }

    async fn get(&self, index: &str, id: &JobId, timeout: Duration) -> StorageResult<GetResponse> {
        self.inner.get(index, id, timeout).await
    }

    async fn index(&self, request: IndexRequest) -> StorageResult<IndexResponse> {
        self.inner.index(request).await
    }
}

#[tokio::test]
async fn losing_the_creation_race_falls_through_to_mapping_update() {
    let store = DuckDbJobStore::open_in_memory().unwrap();
    let old = IndexMapping {
        schema_version: 1,
        properties: serde_json::json!({}),
    };
    store.create_index(SCHEDULED_JOBS_INDEX, &old).await.unwrap();
    let client = Arc::new(RecordingClient::new(Arc::new(StaleExistsClient {
        inner: store.clone(),
    })));
    let indices = ScheduledJobIndices::new(client.clone(), Arc::new(SchemaState::new()));

    indices.ensure_ready().await.unwrap();
    assert!(indices.schema_state().is_current());
    assert_eq!(client.create_index_calls(), 1);
    assert_eq!(client.put_mapping_calls(), 1);

    let stored = store.mapping(SCHEDULED_JOBS_INDEX).await.unwrap().unwrap();
    assert_eq!(stored.schema_version, SCHEDULED_JOB_INDEX_SCHEMA_VERSION);
}

#[tokio::test]
async fn shared_state_skips_store() {
    let (_store, client, indices) = setup();
    indices.schema_state().mark_current();
    indices.ensure_ready().await.unwrap();
    assert_eq!(client.total_calls(), 0);
}
