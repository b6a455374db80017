use core::fmt;

use serde::{Deserialize, Serialize};

/// Preference key under which the applied migration version is kept.
pub const MAPPING_VERSION_KEY: &str = "mapping_version";

/// One row of the launcher favorites table, as seen by the migration.
///
/// Only the two columns the migration needs are exposed: the row id and the
/// serialized intent. Rows are owned by the record store; the migration
/// rewrites or removes them but never creates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// The `_id` column.
    pub id: i64,
    /// The `intent` column. `None` when the row has no intent (folders,
    /// widgets).
    pub intent: Option<String>,
}

impl StoredRecord {
    /// Convenience constructor for a row with an intent.
    pub fn new(id: i64, intent: impl Into<String>) -> Self {
        Self {
            id,
            intent: Some(intent.into()),
        }
    }
}

/// Persistence for the single "which migrations have run" integer.
///
/// Backends implement [`load_version`](VersionStore::load_version) and
/// [`set`](VersionStore::set). Callers normally use
/// [`get`](VersionStore::get), which never fails: a missing or unreadable
/// slot reads as version 0.
pub trait VersionStore {
    /// Error type for this backend.
    type Error: fmt::Debug + fmt::Display;

    /// Read the stored version. `Ok(None)` if it was never written.
    fn load_version(&self) -> Result<Option<u32>, Self::Error>;

    /// Durably persist `version`. Must not return before the write is
    /// committed.
    fn set(&mut self, version: u32) -> Result<(), Self::Error>;

    /// The last committed version, or 0.
    fn get(&self) -> u32 {
        match self.load_version() {
            Ok(Some(v)) => v,
            Ok(None) => 0,
            Err(e) => {
                tracing::debug!(error = %e, "version store unreadable, assuming version 0");
                0
            }
        }
    }
}

/// The tabular store holding launcher favorites.
///
/// Backends must treat updates and deletes of ids that no longer exist as
/// no-ops, not errors.
pub trait RecordStore {
    /// Error type for this backend.
    type Error: fmt::Debug + fmt::Display;

    /// Read every row's `_id` and `intent` columns, ordered by id.
    fn query_all(&self) -> Result<Vec<StoredRecord>, Self::Error>;

    /// Replace the intent of row `id`.
    fn update(&mut self, id: i64, intent: &str) -> Result<(), Self::Error>;

    /// Remove row `id`.
    fn delete(&mut self, id: i64) -> Result<(), Self::Error>;

    /// Number of rows in the store.
    fn count(&self) -> Result<u64, Self::Error> {
        Ok(self.query_all()?.len() as u64)
    }
}
