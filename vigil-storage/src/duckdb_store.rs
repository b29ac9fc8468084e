//! DuckDB-backed shared index.
//!
//! Each logical index is a row in `index_catalog`; its documents live in
//! `documents`. Sequence numbers are allocated per index inside the write
//! transaction, so two writers holding the same expected version can never
//! both succeed.

use crate::client::{
    AcknowledgedResponse, DocWriteResult, GetResponse, IndexMapping, IndexRequest, IndexResponse,
    JobIndexClient, ShardInfo,
};
use crate::{open_duckdb_with_wal_recovery, StorageError, StorageResult};
use async_trait::async_trait;
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;
use vigil_types::{JobId, PrimaryTerm, SeqNo};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS index_catalog (
        index_name VARCHAR PRIMARY KEY,
        schema_version INTEGER NOT NULL,
        mapping VARCHAR NOT NULL,
        next_seq_no BIGINT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS documents (
        index_name VARCHAR NOT NULL,
        doc_id VARCHAR NOT NULL,
        version BIGINT NOT NULL,
        seq_no BIGINT NOT NULL,
        primary_term BIGINT NOT NULL,
        source VARCHAR NOT NULL,
        PRIMARY KEY (index_name, doc_id)
    );
";

/// Shared index stored in a DuckDB database.
#[derive(Clone)]
pub struct DuckDbJobStore {
    conn: Arc<Mutex<Connection>>,
    primary_term: PrimaryTerm,
}

impl DuckDbJobStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_duckdb_with_wal_recovery(path)?;
        Self::open_with_conn(Arc::new(Mutex::new(conn)))
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::open_with_conn(Arc::new(Mutex::new(conn)))
    }

    /// Uses an already opened connection.
    pub fn open_with_conn(conn: Arc<Mutex<Connection>>) -> StorageResult<Self> {
        {
            let guard = conn.lock().map_err(|_| StorageError::LockPoisoned)?;
            guard.execute_batch(SCHEMA)?;
        }
        Ok(Self {
            conn,
            primary_term: PrimaryTerm::new(1),
        })
    }

    /// Sets the primary term stamped on subsequent writes.
    #[must_use]
    pub fn with_primary_term(mut self, primary_term: PrimaryTerm) -> Self {
        self.primary_term = primary_term;
        self
    }

    /// The mapping currently recorded for `index`, if the index exists.
    pub async fn mapping(&self, index: &str) -> StorageResult<Option<IndexMapping>> {
        let index = index.to_string();
        self.run(None, move |conn| read_mapping(conn, &index)).await
    }

    /// Number of documents in `index`.
    pub async fn document_count(&self, index: &str) -> StorageResult<u64> {
        let index = index.to_string();
        self.run(None, move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE index_name = ?",
                params![index],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
        .await
    }

    /// Runs `op` on the blocking pool while holding the connection.
    async fn run<T, F>(&self, timeout: Option<Duration>, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let task = tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StorageError::LockPoisoned)?;
            op(&mut guard)
        });
        let joined = match timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| StorageError::Timeout(limit))?,
            None => task.await,
        };
        joined.map_err(|e| StorageError::Task(e.to_string()))?
    }
}

fn index_exists(conn: &Connection, index: &str) -> StorageResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM index_catalog WHERE index_name = ?",
        params![index],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn read_mapping(conn: &Connection, index: &str) -> StorageResult<Option<IndexMapping>> {
    let row = conn.query_row(
        "SELECT schema_version, mapping FROM index_catalog WHERE index_name = ?",
        params![index],
        |row| Ok((row.get::<_, i32>(0)?, row.get::<_, String>(1)?)),
    );
    match row {
        Ok((schema_version, properties)) => Ok(Some(IndexMapping {
            schema_version,
            properties: serde_json::from_str(&properties)?,
        })),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Version tokens of a stored document.
struct Current {
    version: i64,
    seq_no: SeqNo,
    primary_term: PrimaryTerm,
}

fn read_current(conn: &Connection, index: &str, id: &str) -> StorageResult<Option<Current>> {
    let row = conn.query_row(
        "SELECT version, seq_no, primary_term FROM documents WHERE index_name = ? AND doc_id = ?",
        params![index, id],
        |row| {
            Ok(Current {
                version: row.get(0)?,
                seq_no: SeqNo::new(row.get(1)?),
                primary_term: PrimaryTerm::new(row.get(2)?),
            })
        },
    );
    match row {
        Ok(current) => Ok(Some(current)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn create_index(conn: &mut Connection, index: &str, mapping: &IndexMapping) -> StorageResult<()> {
    let tx = conn.transaction()?;
    if index_exists(&tx, index)? {
        return Err(StorageError::ResourceAlreadyExists(index.to_string()));
    }
    tx.execute(
        "INSERT INTO index_catalog (index_name, schema_version, mapping, next_seq_no) VALUES (?, ?, ?, 0)",
        params![index, mapping.schema_version, mapping.properties.to_string()],
    )?;
    tx.commit()?;
    Ok(())
}

fn put_mapping(conn: &mut Connection, index: &str, mapping: &IndexMapping) -> StorageResult<()> {
    let tx = conn.transaction()?;
    let Some(stored) = read_mapping(&tx, index)? else {
        return Err(StorageError::IndexNotFound(index.to_string()));
    };
    if mapping.schema_version < stored.schema_version {
        debug!(
            "Keeping mapping v{} of {}, offered v{}",
            stored.schema_version, index, mapping.schema_version
        );
        return Ok(());
    }
    tx.execute(
        "UPDATE index_catalog SET schema_version = ?, mapping = ? WHERE index_name = ?",
        params![mapping.schema_version, mapping.properties.to_string(), index],
    )?;
    tx.commit()?;
    Ok(())
}

fn get_document(conn: &Connection, index: &str, id: &JobId) -> StorageResult<GetResponse> {
    if !index_exists(conn, index)? {
        return Err(StorageError::IndexNotFound(index.to_string()));
    }
    let row = conn.query_row(
        "SELECT version, seq_no, primary_term, source FROM documents WHERE index_name = ? AND doc_id = ?",
        params![index, id.as_str()],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    );
    match row {
        Ok((version, seq_no, primary_term, source)) => Ok(GetResponse {
            id: id.clone(),
            found: true,
            version,
            seq_no: SeqNo::new(seq_no),
            primary_term: PrimaryTerm::new(primary_term),
            source: Some(serde_json::from_str(&source)?),
        }),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(GetResponse::not_found(id.clone())),
        Err(e) => Err(e.into()),
    }
}

/// Writes one document. Past `deadline` the transaction is rolled back
/// instead of committed, so a timed-out write never lands.
fn write_document(
    conn: &mut Connection,
    request: &IndexRequest,
    primary_term: PrimaryTerm,
    deadline: Instant,
) -> StorageResult<IndexResponse> {
    let tx = conn.transaction()?;
    let next_seq_no = match tx.query_row(
        "SELECT next_seq_no FROM index_catalog WHERE index_name = ?",
        params![request.index],
        |row| row.get::<_, i64>(0),
    ) {
        Ok(seq_no) => seq_no,
        Err(duckdb::Error::QueryReturnedNoRows) => {
            return Err(StorageError::IndexNotFound(request.index.clone()));
        }
        Err(e) => return Err(e.into()),
    };

    let id = request.id.clone().unwrap_or_else(JobId::generate);
    let current = read_current(&tx, &request.index, id.as_str())?;

    if request.if_seq_no.is_assigned() {
        let (current_seq_no, current_primary_term) = current
            .as_ref()
            .map_or((SeqNo::UNASSIGNED, PrimaryTerm::UNASSIGNED), |c| {
                (c.seq_no, c.primary_term)
            });
        let term_matches = !request.if_primary_term.is_assigned()
            || request.if_primary_term == current_primary_term;
        if current.is_none() || current_seq_no != request.if_seq_no || !term_matches {
            return Err(StorageError::VersionConflict {
                id: id.to_string(),
                expected_seq_no: request.if_seq_no,
                expected_primary_term: request.if_primary_term,
                current_seq_no,
                current_primary_term,
            });
        }
    }

    let source = serde_json::to_string(&request.source)?;
    let (version, result) = match current {
        Some(current) => {
            let version = current.version + 1;
            tx.execute(
                "UPDATE documents SET version = ?, seq_no = ?, primary_term = ?, source = ? WHERE index_name = ? AND doc_id = ?",
                params![version, next_seq_no, primary_term.value(), source, request.index, id.as_str()],
            )?;
            (version, DocWriteResult::Updated)
        }
        None => {
            tx.execute(
                "INSERT INTO documents (index_name, doc_id, version, seq_no, primary_term, source) VALUES (?, ?, 1, ?, ?, ?)",
                params![request.index, id.as_str(), next_seq_no, primary_term.value(), source],
            )?;
            (1, DocWriteResult::Created)
        }
    };
    tx.execute(
        "UPDATE index_catalog SET next_seq_no = next_seq_no + 1 WHERE index_name = ?",
        params![request.index],
    )?;
    if Instant::now() >= deadline {
        debug!("Rolling back {}/{}: deadline passed", request.index, id);
        return Err(StorageError::Timeout(request.timeout));
    }
    tx.commit()?;

    debug!(
        "Indexed {}/{} v{} seq_no={} refresh={}",
        request.index,
        id,
        version,
        next_seq_no,
        request.refresh.value()
    );
    Ok(IndexResponse {
        id,
        version,
        seq_no: SeqNo::new(next_seq_no),
        primary_term,
        result,
        shard_info: ShardInfo::success(1),
    })
}

#[async_trait]
impl JobIndexClient for DuckDbJobStore {
    async fn index_exists(&self, index: &str) -> StorageResult<bool> {
        let index = index.to_string();
        self.run(None, move |conn| index_exists(conn, &index)).await
    }

    async fn create_index(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> StorageResult<AcknowledgedResponse> {
        let index = index.to_string();
        let mapping = mapping.clone();
        self.run(None, move |conn| create_index(conn, &index, &mapping))
            .await?;
        Ok(AcknowledgedResponse::acknowledged())
    }

    async fn put_mapping(
        &self,
        index: &str,
        mapping: &IndexMapping,
    ) -> StorageResult<AcknowledgedResponse> {
        let index = index.to_string();
        let mapping = mapping.clone();
        self.run(None, move |conn| put_mapping(conn, &index, &mapping))
            .await?;
        Ok(AcknowledgedResponse::acknowledged())
    }

    async fn get(&self, index: &str, id: &JobId, timeout: Duration) -> StorageResult<GetResponse> {
        let index = index.to_string();
        let id = id.clone();
        self.run(Some(timeout), move |conn| get_document(conn, &index, &id))
            .await
    }

    async fn index(&self, request: IndexRequest) -> StorageResult<IndexResponse> {
        let timeout = request.timeout;
        let primary_term = self.primary_term;
        let deadline = Instant::now() + timeout;
        self.run(Some(timeout), move |conn| {
            write_document(conn, &request, primary_term, deadline)
        })
        .await
    }
}
