//! Record store seam
//!
//! The ingest pipeline only needs the operations on [`RecordStore`]; it never
//! touches a pool or SQL directly. [`SqliteRecordStore`] is the production
//! implementation and also carries the manual CRUD operations used by the
//! HTTP API.

mod sqlite;

pub use sqlite::{ListQuery, SqliteRecordStore, SORTABLE_COLUMNS};

use crate::db::models::{FaultFields, FaultPatch, FaultRecord};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// Persistence operations the ingest and edit paths rely on
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every bulletin number currently stored.
    ///
    /// Read once per ingest call; the caller accepts that a concurrent writer
    /// may add keys afterwards and relies on `insert_all` to catch that.
    async fn existing_keys(&self) -> Result<HashSet<String>>;

    /// The candidates the store does NOT hold yet
    async fn filter_new_keys(&self, candidates: &HashSet<String>) -> Result<HashSet<String>>;

    /// Insert every record in a single transaction.
    ///
    /// If any record would duplicate a stored key the whole call fails with
    /// `Error::KeyConflict` and nothing is persisted.
    async fn insert_all(&self, records: &[FaultFields]) -> Result<u64>;

    /// Apply `patch` to record `id`.
    ///
    /// The (possibly changed) bulletin number is checked against every other
    /// record first; a collision returns `Error::KeyConflict` and leaves the
    /// record untouched. Unknown ids return `Error::NotFound`.
    async fn update_by_key(&self, id: i64, patch: &FaultPatch) -> Result<FaultRecord>;
}
