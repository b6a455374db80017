//! Loading the mapping configuration from TOML.
//!
//! ```toml
//! old_components = ["com.old/.Main", "com.gone/.Legacy"]
//! new_components = ["com.new/.Main", ""]
//!
//! [engine]
//! advance_on_store_failure = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::component::ComponentError;
use crate::engine::MigrationConfig;
use crate::mapping::ComponentMappingTable;

/// A fatal problem with the mapping configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or has the wrong shape.
    #[error("invalid mapping config: {0}")]
    Toml(#[from] toml::de::Error),
    /// An entry is not `package/class`.
    #[error("{list}[{index}]: {source}")]
    InvalidEntry {
        list: &'static str,
        index: usize,
        #[source]
        source: ComponentError,
    },
    /// The two arrays are not parallel.
    #[error("old_components has {old} entries but new_components has {new}")]
    LengthMismatch { old: usize, new: usize },
}

/// Top-level structure of a mapping file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingFile {
    /// Components to look for, `package/class`.
    #[serde(default)]
    pub old_components: Option<Vec<String>>,
    /// Replacement for each old component; `""` removes the favorite.
    #[serde(default)]
    pub new_components: Option<Vec<String>>,
    /// Engine options.
    #[serde(default)]
    pub engine: MigrationConfig,
}

impl MappingFile {
    /// Parse a mapping file from TOML source.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a mapping file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Resolve the component arrays into a mapping table.
    pub fn table(&self) -> Result<ComponentMappingTable, ConfigError> {
        ComponentMappingTable::from_arrays(
            self.old_components.as_deref(),
            self.new_components.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentRef;

    #[test]
    fn parses_arrays_and_engine_options() {
        let file = MappingFile::from_toml_str(
            r#"
            old_components = ["com.android.contacts/.DialtactsActivity", "com.gone/.A"]
            new_components = ["com.android.dialer/.DialtactsActivity", ""]

            [engine]
            advance_on_store_failure = false
            "#,
        )
        .unwrap();

        assert!(!file.engine.advance_on_store_failure);
        let table = file.table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.entries()[0].new,
            Some(ComponentRef::new(
                "com.android.dialer",
                "com.android.dialer.DialtactsActivity"
            ))
        );
    }

    #[test]
    fn empty_file_is_an_empty_table() {
        let file = MappingFile::from_toml_str("").unwrap();
        assert!(file.table().unwrap().is_empty());
        assert!(file.engine.advance_on_store_failure);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            MappingFile::from_toml_str("old_component = []"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.toml");
        std::fs::write(
            &path,
            "old_components = [\"a/.A\"]\nnew_components = [\"b/.B\"]\n",
        )
        .unwrap();

        let file = MappingFile::load(&path).unwrap();
        assert_eq!(file.table().unwrap().len(), 1);

        let missing = MappingFile::load(dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
