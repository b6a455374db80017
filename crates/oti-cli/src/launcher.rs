//! The launcher database as the migration engine sees it.

use std::path::{Path, PathBuf};

use oti_store::{RecordStore, SqliteError, SqliteStore, StoredRecord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("launcher database {path} unavailable: {reason}")]
    Unavailable { path: PathBuf, reason: String },
    #[error(transparent)]
    Sqlite(#[from] SqliteError),
}

/// A launcher database that may have failed to open.
///
/// An unopenable file behaves like a provider that refuses every query, so
/// the engine's `advance_on_store_failure` setting decides what happens.
pub enum Launcher {
    Open(SqliteStore),
    Unavailable { path: PathBuf, reason: String },
}

impl Launcher {
    /// Open an existing launcher database. Never creates the file.
    pub fn open(path: &Path) -> Self {
        match SqliteStore::open_existing(path) {
            Ok(store) => Self::Open(store),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot open launcher database");
                Self::Unavailable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn store(&self) -> Result<&SqliteStore, LauncherError> {
        match self {
            Self::Open(store) => Ok(store),
            Self::Unavailable { path, reason } => Err(LauncherError::Unavailable {
                path: path.clone(),
                reason: reason.clone(),
            }),
        }
    }

    fn store_mut(&mut self) -> Result<&mut SqliteStore, LauncherError> {
        match self {
            Self::Open(store) => Ok(store),
            Self::Unavailable { path, reason } => Err(LauncherError::Unavailable {
                path: path.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

impl RecordStore for Launcher {
    type Error = LauncherError;

    fn query_all(&self) -> Result<Vec<StoredRecord>, Self::Error> {
        Ok(self.store()?.query_all()?)
    }

    fn update(&mut self, id: i64, intent: &str) -> Result<(), Self::Error> {
        Ok(self.store_mut()?.update(id, intent)?)
    }

    fn delete(&mut self, id: i64) -> Result<(), Self::Error> {
        Ok(self.store_mut()?.delete(id)?)
    }
}
