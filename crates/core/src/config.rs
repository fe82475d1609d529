//! Table configuration via TOML
//!
//! Lets deployments describe table layout (namespaces, locking, index
//! payload modes) in a file instead of code. The file mirrors
//! [`TableOptions`] and [`IndexOptions`]; code still supplies key
//! functions, codecs and the change consumer.

use crate::error::{Error, Result};
use crate::options::{
    IndexOptions, NamespaceOptions, TableOptions, ValueStoreMode, WriteOptions,
    DEFAULT_LOCK_COUNT,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Index section of a table config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Namespace name; a random one is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Opaque store options for the namespace.
    #[serde(default, skip_serializing_if = "NamespaceOptions::is_empty")]
    pub namespace_options: NamespaceOptions,
    /// `"full_value"` (default) or `"reference"`.
    #[serde(default)]
    pub value_store_mode: ValueStoreMode,
}

/// Table configuration loaded from TOML.
///
/// # Example
///
/// ```toml
/// namespace = "students"
/// enable_concurrent_changes_within_row = true
/// lock_count = 64
///
/// [indexes.passport]
/// namespace = "students_by_passport"
/// value_store_mode = "reference"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Namespace name; a random one is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Opaque store options for the namespace.
    #[serde(default, skip_serializing_if = "NamespaceOptions::is_empty")]
    pub namespace_options: NamespaceOptions,
    /// Enable row-level locking.
    #[serde(default)]
    pub enable_concurrent_changes_within_row: bool,
    /// Number of row-lock buckets.
    #[serde(default = "default_lock_count")]
    pub lock_count: usize,
    /// Write options for implicit transactions.
    #[serde(default)]
    pub write: WriteOptions,
    /// Index sections keyed by a logical index name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub indexes: BTreeMap<String, IndexConfig>,
}

fn default_lock_count() -> usize {
    DEFAULT_LOCK_COUNT
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            namespace_options: NamespaceOptions::default(),
            enable_concurrent_changes_within_row: false,
            lock_count: DEFAULT_LOCK_COUNT,
            write: WriteOptions::default(),
            indexes: BTreeMap::new(),
        }
    }
}

impl TableConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# rowtable table configuration
#
# Namespace holding the table rows (default: random UUID)
# namespace = "students"

# Row-level locking around read-modify-write (default: false)
# Enable when several threads mutate the same key and indexes or change
# consumers must stay consistent.
enable_concurrent_changes_within_row = false

# Number of lock buckets, must be greater than zero (default: 64)
lock_count = 64

[write]
# Ask the store to sync each implicit commit (default: false)
sync = false

# Index sections, looked up by logical name when the index is created.
# [indexes.passport]
# namespace = "students_by_passport"
# value_store_mode = "full_value"   # or "reference"
"#
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid TOML for this
    /// schema, or [`Error::InvalidConfiguration`] if the values are invalid.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TableConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse table config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML text.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize table config: {}", e)))
    }

    /// Look up an index section by logical name.
    pub fn index(&self, name: &str) -> Option<&IndexConfig> {
        self.indexes.get(name)
    }

    fn validate(&self) -> Result<()> {
        if self.lock_count == 0 {
            return Err(Error::invalid_configuration(
                "lock_count must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl<K, V> TableOptions<K, V> {
    /// Build options from a parsed config.
    ///
    /// The change consumer is not part of the file and must be attached
    /// with [`TableOptions::with_change_consumer`].
    pub fn from_config(config: &TableConfig) -> Result<Self> {
        let mut options = TableOptions::new()
            .with_namespace_options(config.namespace_options.clone())
            .with_concurrent_changes_within_row(config.enable_concurrent_changes_within_row)
            .with_lock_count(config.lock_count)
            .with_write_options(config.write);
        if let Some(namespace) = &config.namespace {
            options = options.with_namespace(namespace.clone());
        }
        options.validate()?;
        Ok(options)
    }
}

impl IndexOptions {
    /// Build options from a parsed index section.
    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        let mut options = IndexOptions::new()
            .with_namespace_options(config.namespace_options.clone())
            .with_value_store_mode(config.value_store_mode);
        if let Some(namespace) = &config.namespace {
            options = options.with_namespace(namespace.clone());
        }
        options.validate()?;
        Ok(options)
    }
}
