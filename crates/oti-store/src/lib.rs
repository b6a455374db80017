//! # oti-store
//!
//! Storage collaborators for the one-time launcher initializer.
//!
//! The migration touches two stores: a single-slot preference holding the
//! applied mapping version, and the launcher's favorites table whose
//! `intent` column gets rewritten. Both are expressed as traits
//! ([`VersionStore`], [`RecordStore`]) so the engine never depends on a
//! concrete backend.
//!
//! ## Quick Start
//!
//! ```
//! use oti_store::{MemoryRecordStore, MemoryVersionStore, RecordStore, StoredRecord, VersionStore};
//!
//! let prefs = MemoryVersionStore::new();
//! assert_eq!(prefs.get(), 0);
//!
//! let favorites = MemoryRecordStore::with_records([StoredRecord::new(1, "#Intent;end")]);
//! assert_eq!(favorites.query_all().unwrap().len(), 1);
//! ```
//!
//! ## Backends
//!
//! | Backend | Feature flag | Use case |
//! |---------|-------------|----------|
//! | [`MemoryVersionStore`], [`MemoryRecordStore`] | *(always available)* | Testing, embedding |
//! | `SqliteStore` | `sqlite` (default) | Launcher databases, preference files |
//! | `RedbStore` | `redb` | Pure-Rust devices without C deps |

mod memory;
#[cfg(feature = "redb")]
mod redb;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

pub use memory::{MemoryError, MemoryRecordStore, MemoryVersionStore, OpCounts};
#[cfg(feature = "redb")]
pub use redb::{RedbError, RedbStore};
#[cfg(feature = "sqlite")]
pub use sqlite::{JournalMode, SqliteConfig, SqliteError, SqliteStore};
pub use traits::*;

/// Summary of a favorites database, as shown by `oti status`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FavoritesInfo {
    /// Number of rows.
    pub total: u64,
    /// Rows with a non-empty intent.
    pub with_intent: u64,
    /// Mapping version stored in the same file, if any.
    pub mapping_version: Option<u32>,
}
