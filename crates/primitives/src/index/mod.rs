//! Dependent indexes
//!
//! A dependent index is a secondary namespace derived from a table's rows.
//! The table feeds every registered index on each mutation, inside the same
//! transaction as the primary row, so index and table commit together.
//!
//! ## Entry layout
//!
//! | kind | entry key | payload |
//! |------|-----------|---------|
//! | Unique | `index_key` | row bytes (FullValue) or pk bytes (Reference) |
//! | NotUnique | `index_key ++ pk` | row bytes (FullValue) or pk bytes (Reference) |
//!
//! NotUnique entry keys are opaque sort keys and never decoded: the group of
//! rows sharing an index key is the byte-prefix `index_key`, ordered by
//! primary key within the group.
//!
//! ## Maintenance
//!
//! `put(pk, value_bytes, old, new)`:
//! 1. `old` present with a different index key: delete the old entry and
//!    mark the reference for re-adding.
//! 2. `old` absent: mark the reference for re-adding.
//! 3. Write the new entry in FullValue mode, or in Reference mode when
//!    marked. An unchanged Reference entry already points at the right pk.
//!
//! `remove(pk, value)` deletes the entry derived from `value`.

mod not_unique;
mod unique;

pub use not_unique::NotUniqueIndex;
pub use unique::UniqueIndex;

use std::fmt;
use std::sync::Arc;

use rowtable_concurrency::ChangeTransaction;
use rowtable_core::{Codec, Result, ValueStoreMode};
use rowtable_storage::{NamespaceId, PooledBuffer};

/// Index key extractor shared by a table and the typed index handle
pub(crate) type KeyOf<V, IK> = Arc<dyn Fn(&V) -> IK + Send + Sync>;

/// Index variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// One entry per distinct index key
    Unique,
    /// One entry per `(index key, primary key)` pair
    NotUnique,
}

/// Type-erased index key derivation
pub(crate) trait DeriveIndexKey<V>: Send + Sync {
    /// Append the encoded index key of `value` to `buf`
    fn encode_key(&self, value: &V, buf: &mut Vec<u8>) -> Result<()>;

    /// Whether two rows have the same index key
    fn same_key(&self, a: &V, b: &V) -> bool;
}

pub(crate) struct IndexKeySpec<IK, V> {
    key_of: KeyOf<V, IK>,
    codec: Arc<dyn Codec<IK>>,
}

impl<IK, V> IndexKeySpec<IK, V> {
    pub(crate) fn new(key_of: KeyOf<V, IK>, codec: Arc<dyn Codec<IK>>) -> Self {
        Self { key_of, codec }
    }
}

impl<IK: PartialEq, V> DeriveIndexKey<V> for IndexKeySpec<IK, V> {
    fn encode_key(&self, value: &V, buf: &mut Vec<u8>) -> Result<()> {
        let key = (self.key_of)(value);
        self.codec.encode(&key, buf)?;
        Ok(())
    }

    fn same_key(&self, a: &V, b: &V) -> bool {
        (self.key_of)(a) == (self.key_of)(b)
    }
}

/// An index registered on a table.
///
/// Owned by the table; end users read through [`UniqueIndex`] or
/// [`NotUniqueIndex`] and never mutate it directly.
pub struct DependentIndex<V> {
    kind: IndexKind,
    mode: ValueStoreMode,
    namespace: NamespaceId,
    key: Box<dyn DeriveIndexKey<V>>,
}

impl<V> DependentIndex<V> {
    pub(crate) fn new(
        kind: IndexKind,
        mode: ValueStoreMode,
        namespace: NamespaceId,
        key: Box<dyn DeriveIndexKey<V>>,
    ) -> Self {
        Self {
            kind,
            mode,
            namespace,
            key,
        }
    }

    /// Unique or not-unique
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// What entries store as payload
    pub fn value_store_mode(&self) -> ValueStoreMode {
        self.mode
    }

    /// Namespace holding the entries
    pub fn namespace(&self) -> NamespaceId {
        self.namespace
    }

    /// Reflect a put of `new` (replacing `old`) under primary key `pk`
    pub(crate) fn put(
        &self,
        pk: &[u8],
        value_bytes: &[u8],
        old: Option<&V>,
        new: &V,
        tx: &mut ChangeTransaction,
    ) -> Result<()> {
        let re_add = match old {
            Some(old) if self.key.same_key(old, new) => false,
            Some(old) => {
                let old_entry = self.entry_key(old, pk)?;
                tracing::trace!(
                    namespace = self.namespace.as_u32(),
                    kind = ?self.kind,
                    "index.remove_old_key"
                );
                tx.delete(self.namespace, old_entry.written())?;
                true
            }
            None => true,
        };

        if self.mode == ValueStoreMode::FullValue || re_add {
            let entry = self.entry_key(new, pk)?;
            let payload = match self.mode {
                ValueStoreMode::FullValue => value_bytes,
                ValueStoreMode::Reference => pk,
            };
            tracing::trace!(
                namespace = self.namespace.as_u32(),
                kind = ?self.kind,
                "index.put"
            );
            tx.put(self.namespace, entry.written(), payload)?;
        }
        Ok(())
    }

    /// Reflect the removal of `value` stored under primary key `pk`
    pub(crate) fn remove(&self, pk: &[u8], value: &V, tx: &mut ChangeTransaction) -> Result<()> {
        let entry = self.entry_key(value, pk)?;
        tracing::trace!(
            namespace = self.namespace.as_u32(),
            kind = ?self.kind,
            "index.remove"
        );
        tx.delete(self.namespace, entry.written())
    }

    fn entry_key(&self, value: &V, pk: &[u8]) -> Result<PooledBuffer> {
        let mut buf = PooledBuffer::acquire();
        self.key.encode_key(value, &mut buf)?;
        if self.kind == IndexKind::NotUnique {
            buf.extend_from_slice(pk);
        }
        Ok(buf)
    }
}

impl<V> fmt::Debug for DependentIndex<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependentIndex")
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .field("namespace", &self.namespace)
            .finish()
    }
}
