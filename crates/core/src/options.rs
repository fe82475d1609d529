//! Table and index options
//!
//! Options are plain values built fluently and handed to `Table::new` or
//! to the index factory methods. Validation happens at construction time,
//! before the store is touched.
//!
//! ```ignore
//! let options = TableOptions::<i32, Student>::new()
//!     .with_namespace("students")
//!     .enable_concurrent_changes_within_row()
//!     .with_lock_count(128);
//! ```

use crate::change::ChangeConsumer;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Default number of row-lock buckets per table
pub const DEFAULT_LOCK_COUNT: usize = 64;

/// Generate a random namespace name (UUID v4).
pub fn random_namespace() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// Modes
// ============================================================================

/// What a dependent index stores next to each index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueStoreMode {
    /// A full copy of the serialized row
    #[default]
    FullValue,
    /// The encoded primary key; reads resolve the row through the table
    Reference,
}

/// Where a first-value lookup positions its cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeekMode {
    /// First entry at or after the prefix, only if it matches the prefix
    #[default]
    SeekToFirst,
    /// Last entry at or before the prefix, whether or not it matches
    SeekToPrev,
}

// ============================================================================
// Store pass-through options
// ============================================================================

/// Opaque namespace tuning options.
///
/// Passed through to the store untouched when a namespace is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceOptions(BTreeMap<String, String>);

impl NamespaceOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, returning self for chaining
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get an option by name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterate options in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check whether no options are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-write durability options, forwarded to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Ask the store to make the write durable before returning
    #[serde(default)]
    pub sync: bool,
}

// ============================================================================
// Table options
// ============================================================================

/// Options for a table with primary key `K` and rows `V`.
pub struct TableOptions<K, V> {
    namespace: String,
    namespace_options: NamespaceOptions,
    change_consumer: Option<Arc<dyn ChangeConsumer<K, V>>>,
    concurrent_changes_within_row: bool,
    lock_count: usize,
    write_options: WriteOptions,
}

impl<K, V> TableOptions<K, V> {
    /// Create options with defaults
    ///
    /// - namespace: random UUID
    /// - no change consumer
    /// - row locking disabled, 64 buckets when enabled
    pub fn new() -> Self {
        Self {
            namespace: random_namespace(),
            namespace_options: NamespaceOptions::default(),
            change_consumer: None,
            concurrent_changes_within_row: false,
            lock_count: DEFAULT_LOCK_COUNT,
            write_options: WriteOptions::default(),
        }
    }

    /// Set the namespace the table's rows live in
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set opaque store options for the table namespace
    pub fn with_namespace_options(mut self, options: NamespaceOptions) -> Self {
        self.namespace_options = options;
        self
    }

    /// Deliver committed changes to `consumer`
    ///
    /// A consumer forces a read of the current row on every mutation, so
    /// it can receive the previous value.
    pub fn with_change_consumer(mut self, consumer: Arc<dyn ChangeConsumer<K, V>>) -> Self {
        self.change_consumer = Some(consumer);
        self
    }

    /// Enable row-level locking around read-modify-write sequences
    ///
    /// Required for consistent indexes and notifications when several
    /// threads mutate the same key concurrently.
    pub fn enable_concurrent_changes_within_row(self) -> Self {
        self.with_concurrent_changes_within_row(true)
    }

    /// Enable or disable row-level locking
    pub fn with_concurrent_changes_within_row(mut self, enabled: bool) -> Self {
        self.concurrent_changes_within_row = enabled;
        self
    }

    /// Set the number of row-lock buckets (must be greater than zero)
    pub fn with_lock_count(mut self, lock_count: usize) -> Self {
        self.lock_count = lock_count;
        self
    }

    /// Set the write options used by implicit transactions
    pub fn with_write_options(mut self, write_options: WriteOptions) -> Self {
        self.write_options = write_options;
        self
    }

    /// Namespace name
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Store options for the namespace
    pub fn namespace_options(&self) -> &NamespaceOptions {
        &self.namespace_options
    }

    /// Configured change consumer, if any
    pub fn change_consumer(&self) -> Option<&Arc<dyn ChangeConsumer<K, V>>> {
        self.change_consumer.as_ref()
    }

    /// Whether row-level locking is enabled
    pub fn concurrent_changes_within_row(&self) -> bool {
        self.concurrent_changes_within_row
    }

    /// Number of row-lock buckets
    pub fn lock_count(&self) -> usize {
        self.lock_count
    }

    /// Write options for implicit transactions
    pub fn write_options(&self) -> WriteOptions {
        self.write_options
    }

    /// Validate the options
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the lock count is zero or
    /// the namespace name is empty.
    pub fn validate(&self) -> Result<()> {
        if self.lock_count == 0 {
            return Err(Error::invalid_configuration(
                "lock_count must be greater than zero",
            ));
        }
        if self.namespace.is_empty() {
            return Err(Error::invalid_configuration("namespace must not be empty"));
        }
        Ok(())
    }
}

impl<K, V> Default for TableOptions<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for TableOptions<K, V> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            namespace_options: self.namespace_options.clone(),
            change_consumer: self.change_consumer.clone(),
            concurrent_changes_within_row: self.concurrent_changes_within_row,
            lock_count: self.lock_count,
            write_options: self.write_options,
        }
    }
}

impl<K, V> fmt::Debug for TableOptions<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableOptions")
            .field("namespace", &self.namespace)
            .field("namespace_options", &self.namespace_options)
            .field("change_consumer", &self.change_consumer.is_some())
            .field(
                "concurrent_changes_within_row",
                &self.concurrent_changes_within_row,
            )
            .field("lock_count", &self.lock_count)
            .field("write_options", &self.write_options)
            .finish()
    }
}

// ============================================================================
// Index options
// ============================================================================

/// Options for a dependent index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    namespace: String,
    namespace_options: NamespaceOptions,
    value_store_mode: ValueStoreMode,
}

impl IndexOptions {
    /// Create options with defaults (random namespace, full-value mode)
    pub fn new() -> Self {
        Self {
            namespace: random_namespace(),
            namespace_options: NamespaceOptions::default(),
            value_store_mode: ValueStoreMode::FullValue,
        }
    }

    /// Set the namespace the index entries live in
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set opaque store options for the index namespace
    pub fn with_namespace_options(mut self, options: NamespaceOptions) -> Self {
        self.namespace_options = options;
        self
    }

    /// Choose between full-value and reference payloads
    pub fn with_value_store_mode(mut self, mode: ValueStoreMode) -> Self {
        self.value_store_mode = mode;
        self
    }

    /// Namespace name
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Store options for the namespace
    pub fn namespace_options(&self) -> &NamespaceOptions {
        &self.namespace_options
    }

    /// Payload mode
    pub fn value_store_mode(&self) -> ValueStoreMode {
        self.value_store_mode
    }

    /// Validate the options
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the namespace name is empty.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::invalid_configuration("namespace must not be empty"));
        }
        Ok(())
    }
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self::new()
    }
}
