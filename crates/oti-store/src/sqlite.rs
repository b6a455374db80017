//! SQLite persistence backend using rusqlite.
//!
//! Holds the launcher `favorites` table and a small `preferences` key-value
//! table for the mapping version. The two usually live in different files
//! (the launcher database and the initializer's private preferences), so
//! open one `SqliteStore` per file.
//!
//! The launcher database belongs to the launcher: open it with
//! [`SqliteStore::open_existing`] (or [`SqliteStore::open_read_only`]), which
//! never creates the file, its tables, or changes its journal mode.
//!
//! # Example
//!
//! ```no_run
//! use oti_store::{RecordStore, SqliteStore, VersionStore};
//!
//! let mut prefs = SqliteStore::open("oti-prefs.db").unwrap();
//! let launcher = SqliteStore::open_existing("launcher.db").unwrap();
//!
//! if prefs.get() < 1 {
//!     for row in launcher.query_all().unwrap() {
//!         println!("{} {:?}", row.id, row.intent);
//!     }
//!     prefs.set(1).unwrap();
//! }
//! ```

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use thiserror::Error;

use crate::traits::{RecordStore, StoredRecord, VersionStore, MAPPING_VERSION_KEY};
use crate::FavoritesInfo;

const CREATE_FAVORITES: &str = "CREATE TABLE IF NOT EXISTS favorites (
    _id         INTEGER PRIMARY KEY,
    title       TEXT,
    intent      TEXT,
    container   INTEGER NOT NULL DEFAULT -100,
    screen      INTEGER NOT NULL DEFAULT 0,
    cellX       INTEGER NOT NULL DEFAULT 0,
    cellY       INTEGER NOT NULL DEFAULT 0,
    itemType    INTEGER NOT NULL DEFAULT 0
);";

const CREATE_PREFERENCES: &str = "CREATE TABLE IF NOT EXISTS preferences (
    key         TEXT PRIMARY KEY,
    value       INTEGER NOT NULL
);";

/// SQLite configuration options.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Journal mode to switch the file to on open. `None` leaves the file's
    /// current mode alone. Defaults to WAL.
    pub journal_mode: Option<JournalMode>,
    /// Busy timeout in milliseconds. Defaults to 5000.
    pub busy_timeout_ms: u32,
}

impl SqliteConfig {
    /// Settings for a database owned by someone else: no journal mode change.
    pub fn foreign() -> Self {
        Self {
            journal_mode: None,
            ..Self::default()
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            journal_mode: Some(JournalMode::Wal),
            busy_timeout_ms: 5000,
        }
    }
}

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    /// Write-Ahead Logging.
    Wal,
    /// Traditional rollback journal.
    Delete,
}

impl JournalMode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
        }
    }
}

/// Error type for the SQLite backend.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// An error from rusqlite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored version does not fit in `u32`.
    #[error("stored version {0} out of range")]
    VersionRange(i64),
    /// Lock poisoned.
    #[error("sqlite lock poisoned")]
    LockPoisoned,
}

/// SQLite persistence backend.
///
/// Wraps a `rusqlite::Connection` behind a `Mutex` for safe shared access.
/// [`open`](Self::open) creates the file and schema; the other constructors
/// take the file as they find it.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path with default config.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SqliteError> {
        Self::open_with_config(path, SqliteConfig::default())
    }

    /// Open (or create) with custom configuration.
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: SqliteConfig,
    ) -> Result<Self, SqliteError> {
        let conn = Connection::open(path)?;
        Self::init_connection(&conn, &config)?;
        Self::create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an existing database for reading and writing.
    ///
    /// Fails if the file does not exist. No tables are created up front and
    /// the journal mode is left as is; the `preferences` table is created on
    /// the first [`set`](VersionStore::set).
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self, SqliteError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        Self::init_connection(&conn, &SqliteConfig::foreign())?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an existing database read-only. Every write fails.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, SqliteError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        Self::init_connection(&conn, &SqliteConfig::foreign())?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, SqliteError> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(&conn, &SqliteConfig::default())?;
        Self::create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_connection(conn: &Connection, config: &SqliteConfig) -> Result<(), SqliteError> {
        if let Some(mode) = config.journal_mode {
            conn.execute_batch(&format!("PRAGMA journal_mode = {};", mode.as_str()))?;
        }
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};
             PRAGMA synchronous = FULL;",
            config.busy_timeout_ms,
        ))?;
        Ok(())
    }

    fn create_schema(conn: &Connection) -> Result<(), SqliteError> {
        conn.execute_batch(CREATE_FAVORITES)?;
        conn.execute_batch(CREATE_PREFERENCES)?;
        Ok(())
    }

    /// Whether `table` exists in the main schema.
    pub fn has_table(&self, table: &str) -> Result<bool, SqliteError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteError> {
        self.conn.lock().map_err(|_| SqliteError::LockPoisoned)
    }

    /// Insert a favorite row and return its `_id`.
    ///
    /// The migration never creates rows; this exists for seeding and tests.
    pub fn insert_favorite(
        &mut self,
        title: Option<&str>,
        intent: Option<&str>,
    ) -> Result<i64, SqliteError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO favorites (title, intent) VALUES (?1, ?2)",
            params![title, intent],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Title of favorite `id`, if the row exists and has one.
    pub fn title(&self, id: i64) -> Result<Option<String>, SqliteError> {
        let conn = self.lock()?;
        let title = conn
            .query_row(
                "SELECT title FROM favorites WHERE _id = ?1",
                params![id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(title.flatten())
    }

    /// Summary counts for the favorites table and the version slot.
    pub fn favorites_info(&self) -> Result<FavoritesInfo, SqliteError> {
        let conn = self.lock()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM favorites", [], |row| row.get(0))?;
        let with_intent: i64 = conn.query_row(
            "SELECT COUNT(*) FROM favorites WHERE intent IS NOT NULL AND intent != ''",
            [],
            |row| row.get(0),
        )?;
        drop(conn);

        Ok(FavoritesInfo {
            total: total as u64,
            with_intent: with_intent as u64,
            mapping_version: self.load_version()?,
        })
    }

    /// Get the database file size in bytes (0 for in-memory).
    pub fn file_size(&self) -> Result<u64, SqliteError> {
        let conn = self.lock()?;
        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
        Ok((page_count * page_size) as u64)
    }

    /// Get the current journal mode.
    pub fn journal_mode(&self) -> Result<String, SqliteError> {
        let conn = self.lock()?;
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        Ok(mode)
    }
}

impl VersionStore for SqliteStore {
    type Error = SqliteError;

    fn load_version(&self) -> Result<Option<u32>, Self::Error> {
        // A file nobody has committed a version to may lack the table.
        if !self.has_table("preferences")? {
            return Ok(None);
        }
        let conn = self.lock()?;
        let value: Option<i64> = conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![MAPPING_VERSION_KEY],
                |row| row.get(0),
            )
            .optional()?;
        value
            .map(|v| u32::try_from(v).map_err(|_| SqliteError::VersionRange(v)))
            .transpose()
    }

    fn set(&mut self, version: u32) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        conn.execute_batch(CREATE_PREFERENCES)?;
        conn.execute(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![MAPPING_VERSION_KEY, version as i64],
        )?;
        Ok(())
    }
}

impl RecordStore for SqliteStore {
    type Error = SqliteError;

    fn query_all(&self) -> Result<Vec<StoredRecord>, Self::Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT _id, intent FROM favorites ORDER BY _id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredRecord {
                    id: row.get(0)?,
                    intent: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn update(&mut self, id: i64, intent: &str) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE favorites SET intent = ?1 WHERE _id = ?2",
            params![intent, id],
        )?;
        Ok(())
    }

    fn delete(&mut self, id: i64) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM favorites WHERE _id = ?1", params![id])?;
        Ok(())
    }

    fn count(&self) -> Result<u64, Self::Error> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM favorites", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn version_defaults_to_zero() {
        let store = test_store();
        assert_eq!(store.load_version().unwrap(), None);
        assert_eq!(store.get(), 0);
    }

    #[test]
    fn version_set_overwrites() {
        let mut store = test_store();
        store.set(1).unwrap();
        assert_eq!(store.get(), 1);
        store.set(2).unwrap();
        assert_eq!(store.load_version().unwrap(), Some(2));
    }

    #[test]
    fn favorites_query_update_delete() {
        let mut store = test_store();
        let a = store
            .insert_favorite(Some("Clock"), Some("#Intent;action=x;end"))
            .unwrap();
        let b = store.insert_favorite(Some("Folder"), None).unwrap();

        let rows = store.query_all().unwrap();
        assert_eq!(
            rows,
            vec![
                StoredRecord::new(a, "#Intent;action=x;end"),
                StoredRecord { id: b, intent: None },
            ]
        );

        store.update(a, "#Intent;action=y;end").unwrap();
        assert_eq!(
            store.query_all().unwrap()[0].intent.as_deref(),
            Some("#Intent;action=y;end")
        );
        // Other columns untouched.
        assert_eq!(store.title(a).unwrap().as_deref(), Some("Clock"));

        store.delete(b).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn writes_to_missing_rows_are_noops() {
        let mut store = test_store();
        store.update(99, "x").unwrap();
        store.delete(99).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn favorites_info_counts() {
        let mut store = test_store();
        store.insert_favorite(Some("a"), Some("#Intent;end")).unwrap();
        store.insert_favorite(Some("b"), Some("")).unwrap();
        store.insert_favorite(Some("c"), None).unwrap();
        store.set(1).unwrap();

        let info = store.favorites_info().unwrap();
        assert_eq!(info.total, 3);
        assert_eq!(info.with_intent, 1);
        assert_eq!(info.mapping_version, Some(1));
    }

    #[test]
    fn open_file_based() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("prefs.db");

        {
            let mut store = SqliteStore::open(&db_path).unwrap();
            store.set(1).unwrap();
        }

        // Reopen and verify the version persisted
        let store = SqliteStore::open(&db_path).unwrap();
        assert_eq!(store.get(), 1);
    }

    fn launcher_file(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("launcher.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE favorites (_id INTEGER PRIMARY KEY, title TEXT, intent TEXT);
             INSERT INTO favorites (title, intent) VALUES ('Clock', '#Intent;end');",
        )
        .unwrap();
        path
    }

    fn tables(path: &Path) -> Vec<String> {
        let conn = Connection::open(path).unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap();
        names
    }

    #[test]
    fn open_existing_refuses_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typo.db");
        assert!(SqliteStore::open_existing(&path).is_err());
        assert!(SqliteStore::open_read_only(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn open_existing_leaves_schema_and_journal_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = launcher_file(dir.path());

        let store = SqliteStore::open_existing(&path).unwrap();
        assert_eq!(store.journal_mode().unwrap(), "delete");
        assert_eq!(store.query_all().unwrap().len(), 1);
        assert_eq!(store.load_version().unwrap(), None);
        drop(store);

        assert_eq!(tables(&path), vec!["favorites"]);
    }

    #[test]
    fn open_existing_creates_preferences_on_first_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = launcher_file(dir.path());

        let mut store = SqliteStore::open_existing(&path).unwrap();
        store.set(1).unwrap();
        assert_eq!(store.get(), 1);
        drop(store);

        assert_eq!(tables(&path), vec!["favorites", "preferences"]);
    }

    #[test]
    fn read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = launcher_file(dir.path());

        let mut store = SqliteStore::open_read_only(&path).unwrap();
        assert_eq!(store.get(), 0);
        assert!(store.set(1).is_err());
        assert!(store.delete(1).is_err());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn missing_favorites_table_is_a_query_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (x INTEGER);")
            .unwrap();

        let store = SqliteStore::open_existing(&path).unwrap();
        assert!(store.query_all().is_err());
    }

    #[test]
    fn configured_journal_mode_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteConfig {
            journal_mode: Some(JournalMode::Delete),
            ..SqliteConfig::default()
        };
        let store = SqliteStore::open_with_config(dir.path().join("prefs.db"), config).unwrap();
        assert_eq!(store.journal_mode().unwrap(), "delete");
    }

    #[test]
    fn wal_mode_enabled() {
        let store = test_store();
        let mode = store.journal_mode().unwrap();
        // In-memory databases may report "memory" instead of "wal"
        assert!(mode == "wal" || mode == "memory", "got: {mode}");
    }
}
