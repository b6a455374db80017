//! Pure-Rust backend using [`redb`](https://docs.rs/redb).
//!
//! No C dependencies — useful for devices where you can't cross-compile
//! SQLite. Values are encoded with `postcard`.
//!
//! Enable with `features = ["redb"]`.
//!
//! ```no_run
//! use oti_store::{RedbStore, VersionStore};
//!
//! let mut prefs = RedbStore::open("/tmp/oti-prefs.redb").unwrap();
//! prefs.set(1).unwrap();
//! ```

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::{RecordStore, StoredRecord, VersionStore, MAPPING_VERSION_KEY};

// ── Table definitions ───────────────────────────────────────────────

const PREFS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("preferences");
const FAVORITES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("favorites");

// ── Error type ──────────────────────────────────────────────────────

/// Errors returned by [`RedbStore`] operations.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RedbError(String);

fn err(e: impl std::fmt::Display) -> RedbError {
    RedbError(e.to_string())
}

// ── Row encoding ────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct FavoriteRow {
    title: Option<String>,
    intent: Option<String>,
}

fn encode_row(row: &FavoriteRow) -> Result<Vec<u8>, RedbError> {
    postcard::to_allocvec(row).map_err(err)
}

fn decode_row(bytes: &[u8]) -> Result<FavoriteRow, RedbError> {
    postcard::from_bytes(bytes).map_err(err)
}

// ── Store ───────────────────────────────────────────────────────────

/// A pure-Rust persistence backend built on [`redb`].
///
/// Uses two tables: `preferences` (string keys, postcard values) and
/// `favorites` (keyed by `_id`). Every write runs in its own committed
/// transaction, so [`VersionStore::set`] is durable when it returns.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RedbError> {
        let db = Database::create(path).map_err(err)?;
        Self::init(db)
    }

    /// Create an in-memory redb database (for testing).
    pub fn open_in_memory() -> Result<Self, RedbError> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(err)?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self, RedbError> {
        // Ensure tables exist by opening a write txn.
        let txn = db.begin_write().map_err(err)?;
        txn.open_table(PREFS_TABLE).map_err(err)?;
        txn.open_table(FAVORITES_TABLE).map_err(err)?;
        txn.commit().map_err(err)?;
        Ok(Self { db })
    }

    /// Insert a favorite row and return its `_id` (one past the largest).
    pub fn insert_favorite(
        &mut self,
        title: Option<&str>,
        intent: Option<&str>,
    ) -> Result<i64, RedbError> {
        let row = encode_row(&FavoriteRow {
            title: title.map(str::to_string),
            intent: intent.map(str::to_string),
        })?;
        let txn = self.db.begin_write().map_err(err)?;
        let id = {
            let mut table = txn.open_table(FAVORITES_TABLE).map_err(err)?;
            let id = match table.last().map_err(err)? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };
            table.insert(id, row.as_slice()).map_err(err)?;
            id
        };
        txn.commit().map_err(err)?;
        Ok(id)
    }
}

// ── VersionStore ────────────────────────────────────────────────────

impl VersionStore for RedbStore {
    type Error = RedbError;

    fn load_version(&self) -> Result<Option<u32>, RedbError> {
        let txn = self.db.begin_read().map_err(err)?;
        let table = txn.open_table(PREFS_TABLE).map_err(err)?;
        match table.get(MAPPING_VERSION_KEY).map_err(err)? {
            Some(guard) => Ok(Some(postcard::from_bytes(guard.value()).map_err(err)?)),
            None => Ok(None),
        }
    }

    fn set(&mut self, version: u32) -> Result<(), RedbError> {
        let value = postcard::to_allocvec(&version).map_err(err)?;
        let txn = self.db.begin_write().map_err(err)?;
        {
            let mut table = txn.open_table(PREFS_TABLE).map_err(err)?;
            table
                .insert(MAPPING_VERSION_KEY, value.as_slice())
                .map_err(err)?;
        }
        txn.commit().map_err(err)?;
        Ok(())
    }
}

// ── RecordStore ─────────────────────────────────────────────────────

impl RecordStore for RedbStore {
    type Error = RedbError;

    fn query_all(&self) -> Result<Vec<StoredRecord>, RedbError> {
        let txn = self.db.begin_read().map_err(err)?;
        let table = txn.open_table(FAVORITES_TABLE).map_err(err)?;

        let mut records = Vec::new();
        for item in table.iter().map_err(err)? {
            let (key_guard, val_guard) = item.map_err(err)?;
            let row = decode_row(val_guard.value())?;
            records.push(StoredRecord {
                id: key_guard.value(),
                intent: row.intent,
            });
        }
        Ok(records)
    }

    fn update(&mut self, id: i64, intent: &str) -> Result<(), RedbError> {
        let txn = self.db.begin_write().map_err(err)?;
        {
            let mut table = txn.open_table(FAVORITES_TABLE).map_err(err)?;
            let existing = match table.get(id).map_err(err)? {
                Some(guard) => Some(decode_row(guard.value())?),
                None => None,
            };
            if let Some(mut row) = existing {
                row.intent = Some(intent.to_string());
                let bytes = encode_row(&row)?;
                table.insert(id, bytes.as_slice()).map_err(err)?;
            }
        }
        txn.commit().map_err(err)?;
        Ok(())
    }

    fn delete(&mut self, id: i64) -> Result<(), RedbError> {
        let txn = self.db.begin_write().map_err(err)?;
        {
            let mut table = txn.open_table(FAVORITES_TABLE).map_err(err)?;
            table.remove(id).map_err(err)?;
        }
        txn.commit().map_err(err)?;
        Ok(())
    }
}
