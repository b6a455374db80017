use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::traits::{RecordStore, StoredRecord, VersionStore};

/// Error type for the in-memory backends.
///
/// These backends only fail when a failure has been injected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("MemoryStore error: {0}")]
pub struct MemoryError(String);

/// In-memory version slot.
///
/// # Example
///
/// ```
/// use oti_store::{MemoryVersionStore, VersionStore};
///
/// let mut prefs = MemoryVersionStore::new();
/// assert_eq!(prefs.get(), 0);
/// prefs.set(1).unwrap();
/// assert_eq!(prefs.get(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryVersionStore {
    version: Option<u32>,
    writes: usize,
    fail_writes: bool,
}

impl MemoryVersionStore {
    /// Create an empty slot (reads as version 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot that already holds `version`.
    pub fn with_version(version: u32) -> Self {
        Self {
            version: Some(version),
            ..Self::default()
        }
    }

    /// Make every subsequent [`set`](VersionStore::set) fail.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl VersionStore for MemoryVersionStore {
    type Error = MemoryError;

    fn load_version(&self) -> Result<Option<u32>, Self::Error> {
        Ok(self.version)
    }

    fn set(&mut self, version: u32) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MemoryError("version write rejected".into()));
        }
        self.version = Some(version);
        self.writes += 1;
        Ok(())
    }
}

/// Counts of calls made against a [`MemoryRecordStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounts {
    pub queries: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl OpCounts {
    /// Total number of calls of any kind.
    pub fn total(&self) -> usize {
        self.queries + self.updates + self.deletes
    }
}

/// In-memory favorites table.
///
/// Rows live in a `BTreeMap` keyed by id, so queries come back in id order.
/// Every call is counted, and query or per-row write failures can be
/// injected, which makes this the backend of choice for engine tests.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    rows: BTreeMap<i64, Option<String>>,
    queries: Cell<usize>,
    updates: usize,
    deletes: usize,
    fail_queries: bool,
    failing_ids: BTreeSet<i64>,
}

impl MemoryRecordStore {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding `records`.
    pub fn with_records<I: IntoIterator<Item = StoredRecord>>(records: I) -> Self {
        let mut store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert or replace a row. Not counted as an operation.
    pub fn insert(&mut self, record: StoredRecord) {
        self.rows.insert(record.id, record.intent);
    }

    /// Current intent of row `id`, `None` if the row is absent.
    pub fn intent(&self, id: i64) -> Option<Option<&str>> {
        self.rows.get(&id).map(|i| i.as_deref())
    }

    /// Whether row `id` exists.
    pub fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Calls made so far.
    pub fn ops(&self) -> OpCounts {
        OpCounts {
            queries: self.queries.get(),
            updates: self.updates,
            deletes: self.deletes,
        }
    }

    /// Make [`query_all`](RecordStore::query_all) fail, simulating an
    /// unavailable store.
    pub fn fail_queries(&mut self, fail: bool) {
        self.fail_queries = fail;
    }

    /// Make updates and deletes of row `id` fail.
    pub fn fail_writes_for(&mut self, id: i64) {
        self.failing_ids.insert(id);
    }

    /// Snapshot of every row, ordered by id.
    pub fn records(&self) -> Vec<StoredRecord> {
        self.rows
            .iter()
            .map(|(id, intent)| StoredRecord {
                id: *id,
                intent: intent.clone(),
            })
            .collect()
    }

    fn check_write(&self, id: i64) -> Result<(), MemoryError> {
        if self.failing_ids.contains(&id) {
            return Err(MemoryError(format!("write to row {id} rejected")));
        }
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    type Error = MemoryError;

    fn query_all(&self) -> Result<Vec<StoredRecord>, Self::Error> {
        self.queries.set(self.queries.get() + 1);
        if self.fail_queries {
            return Err(MemoryError("favorites unavailable".into()));
        }
        Ok(self.records())
    }

    fn update(&mut self, id: i64, intent: &str) -> Result<(), Self::Error> {
        self.updates += 1;
        self.check_write(id)?;
        if let Some(slot) = self.rows.get_mut(&id) {
            *slot = Some(intent.to_string());
        }
        Ok(())
    }

    fn delete(&mut self, id: i64) -> Result<(), Self::Error> {
        self.deletes += 1;
        self.check_write(id)?;
        self.rows.remove(&id);
        Ok(())
    }

    fn count(&self) -> Result<u64, Self::Error> {
        Ok(self.rows.len() as u64)
    }
}
