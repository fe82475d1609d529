//! Ordered key-value store contract
//!
//! Tables and indexes never talk to a concrete engine; they go through
//! [`OrderedStore`]. A store offers:
//! - named namespaces (column families), created once and never dropped
//! - point reads
//! - single writes and atomic multi-namespace [`WriteBatch`]es
//! - forward cursors with seek / seek-for-prev and optional bounds
//!
//! Keys compare as unsigned bytes (lexicographic order).

use rowtable_core::{NamespaceOptions, Result, WriteOptions};

/// Handle of a namespace inside a store.
///
/// Only meaningful for the store that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(u32);

impl NamespaceId {
    /// Wrap a raw store-assigned id
    pub const fn new(raw: u32) -> Self {
        NamespaceId(raw)
    }

    /// Raw id
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Raw id as an index
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// Write batch
// ============================================================================

/// One mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite `key`
    Put {
        /// Target namespace
        namespace: NamespaceId,
        /// Encoded key
        key: Vec<u8>,
        /// Encoded value
        value: Vec<u8>,
    },
    /// Delete `key` if present
    Delete {
        /// Target namespace
        namespace: NamespaceId,
        /// Encoded key
        key: Vec<u8>,
    },
}

impl BatchOp {
    /// Namespace the operation targets
    pub fn namespace(&self) -> NamespaceId {
        match self {
            BatchOp::Put { namespace, .. } | BatchOp::Delete { namespace, .. } => *namespace,
        }
    }
}

/// Ordered list of mutations applied all-or-nothing.
///
/// Later operations on the same key win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put; key and value are copied
    pub fn put(&mut self, namespace: NamespaceId, key: &[u8], value: &[u8]) {
        self.ops.push(BatchOp::Put {
            namespace,
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Queue a delete; the key is copied
    pub fn delete(&mut self, namespace: NamespaceId, key: &[u8]) {
        self.ops.push(BatchOp::Delete {
            namespace,
            key: key.to_vec(),
        });
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Drop all queued operations, keeping capacity
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Most recent queued operation on `key`
    ///
    /// `Some(Some(value))` for a put, `Some(None)` for a delete, `None` when
    /// the batch does not touch `key`.
    pub fn latest(&self, namespace: NamespaceId, key: &[u8]) -> Option<Option<&[u8]>> {
        self.ops.iter().rev().find_map(|op| match op {
            BatchOp::Put {
                namespace: ns,
                key: k,
                value,
            } if *ns == namespace && k.as_slice() == key => Some(Some(value.as_slice())),
            BatchOp::Delete { namespace: ns, key: k } if *ns == namespace && k.as_slice() == key => {
                Some(None)
            }
            _ => None,
        })
    }

    /// Queued operations in order
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Consume the batch into its operations
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Iteration bounds for a cursor.
///
/// A cursor created with bounds only ever lands on keys in
/// `[lower_bound, upper_bound)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    lower_bound: Option<Vec<u8>>,
    upper_bound: Option<Vec<u8>>,
}

impl ReadOptions {
    /// Unbounded iteration
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to keys `>= bound`
    pub fn with_lower_bound(mut self, bound: impl Into<Vec<u8>>) -> Self {
        self.lower_bound = Some(bound.into());
        self
    }

    /// Restrict to keys `< bound`
    pub fn with_upper_bound(mut self, bound: impl Into<Vec<u8>>) -> Self {
        self.upper_bound = Some(bound.into());
        self
    }

    /// Inclusive lower bound
    pub fn lower_bound(&self) -> Option<&[u8]> {
        self.lower_bound.as_deref()
    }

    /// Exclusive upper bound
    pub fn upper_bound(&self) -> Option<&[u8]> {
        self.upper_bound.as_deref()
    }

    /// Check whether `key` lies inside the bounds
    pub fn contains(&self, key: &[u8]) -> bool {
        self.lower_bound().map_or(true, |lower| key >= lower)
            && self.upper_bound().map_or(true, |upper| key < upper)
    }
}

/// Forward cursor over one namespace.
///
/// A fresh cursor is unpositioned (`valid() == false`) until one of the
/// seek methods is called.
pub trait StoreCursor {
    /// Position at the first key inside the bounds
    fn seek_to_first(&mut self);

    /// Position at the first key `>= target`
    fn seek(&mut self, target: &[u8]);

    /// Position at the last key `<= target`
    fn seek_for_prev(&mut self, target: &[u8]);

    /// Advance to the next key
    fn next(&mut self);

    /// Whether the cursor is positioned on an entry
    fn valid(&self) -> bool;

    /// Current key; empty when not valid
    fn key(&self) -> &[u8];

    /// Current value; empty when not valid
    fn value(&self) -> &[u8];
}

// ============================================================================
// Store
// ============================================================================

/// Ordered byte-keyed store used by tables and indexes.
///
/// # Thread Safety
///
/// All methods take `&self`; implementations must be `Send + Sync` and
/// make every [`OrderedStore::write_batch`] visible atomically to readers.
pub trait OrderedStore: Send + Sync {
    /// Create a namespace, or return the existing one with this name.
    ///
    /// `options` are passed through to the engine untouched.
    fn create_namespace(&self, name: &str, options: &NamespaceOptions) -> Result<NamespaceId>;

    /// Point read
    fn get(&self, namespace: NamespaceId, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Apply every operation in `batch` atomically.
    ///
    /// # Errors
    ///
    /// On error nothing from the batch is visible.
    fn write_batch(&self, batch: WriteBatch, options: &WriteOptions) -> Result<()>;

    /// Single put, used by pass-through transactions
    fn put(
        &self,
        namespace: NamespaceId,
        key: &[u8],
        value: &[u8],
        options: &WriteOptions,
    ) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(namespace, key, value);
        self.write_batch(batch, options)
    }

    /// Single delete, used by pass-through transactions
    fn delete(&self, namespace: NamespaceId, key: &[u8], options: &WriteOptions) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(namespace, key);
        self.write_batch(batch, options)
    }

    /// Open a cursor over `namespace`
    fn cursor(&self, namespace: NamespaceId, options: ReadOptions)
        -> Result<Box<dyn StoreCursor + '_>>;
}
