//! Shared scheduled-jobs index for Vigil.
//!
//! # Architecture
//!
//! - [`JobIndexClient`] is the async store boundary the alerting layer talks to
//! - [`DuckDbJobStore`] implements it on DuckDB, with per-index sequence numbers
//!   and compare-and-swap writes
//! - [`mock::RecordingClient`] wraps any client to count calls and inject faults

mod client;
mod duckdb_store;
mod error;
pub mod mock;

pub use client::{
    AcknowledgedResponse, DocWriteResult, GetResponse, IndexMapping, IndexRequest, IndexResponse,
    JobIndexClient, ShardFailure, ShardInfo,
};
pub use duckdb_store::DuckDbJobStore;
pub use error::{StorageError, StorageResult};

use tracing::warn;

/// Open a DuckDB connection with stale WAL recovery.
///
/// If the initial open fails and a `.wal` file exists alongside the database,
/// it is removed and the open is retried once. This handles the common case
/// where an unclean shutdown leaves a WAL file that prevents reopening.
pub fn open_duckdb_with_wal_recovery(path: &std::path::Path) -> StorageResult<duckdb::Connection> {
    match duckdb::Connection::open(path) {
        Ok(conn) => Ok(conn),
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if wal_path.exists() {
                warn!(
                    "DuckDB open failed, removing stale WAL and retrying: {}",
                    wal_path.display()
                );
                if std::fs::remove_file(&wal_path).is_ok() {
                    return duckdb::Connection::open(path).map_err(Into::into);
                }
            }
            Err(first_err.into())
        }
    }
}
