//! NotUniqueIndex: read handle over a non-unique dependent index
//!
//! Entry keys are `index_key ++ pk`. They are never decoded; every query
//! here is a prefix or bounds scan over the encoded index key.

use std::fmt;

use rowtable_core::{Codec, Result, SeekMode, ValueStoreMode};
use rowtable_storage::{KeyValueStoreBase, NamespaceId, Scan};

use super::KeyOf;

/// Read handle of a non-unique index.
///
/// Created by [`Table::create_not_unique_index`](crate::Table::create_not_unique_index).
pub struct NotUniqueIndex<IK, V> {
    base: KeyValueStoreBase<IK, V>,
    key_of: KeyOf<V, IK>,
    mode: ValueStoreMode,
}

impl<IK, V> NotUniqueIndex<IK, V> {
    pub(crate) fn new(
        base: KeyValueStoreBase<IK, V>,
        key_of: KeyOf<V, IK>,
        mode: ValueStoreMode,
    ) -> Self {
        Self { base, key_of, mode }
    }

    /// Namespace holding the entries
    pub fn namespace(&self) -> NamespaceId {
        self.base.namespace()
    }

    /// What entries store as payload
    pub fn value_store_mode(&self) -> ValueStoreMode {
        self.mode
    }

    /// Whether any entry key starts with the encoding of `key`
    pub fn has_any(&self, key: &IK) -> Result<bool> {
        let prefix = self.base.encode_key(key)?;
        self.base.has_any_key_by_prefix_bytes(prefix.written())
    }

    /// First row near the encoding of `key`
    ///
    /// Prefix semantics, see [`KeyValueStoreBase::first_value_by_prefix`].
    pub fn get_first_value(&self, key: &IK, mode: SeekMode) -> Result<Option<V>> {
        let prefix = self.base.encode_key(key)?;
        self.base.first_value_by_prefix_bytes(prefix.written(), mode)
    }

    /// Rows whose index key is `key`, in primary key order
    ///
    /// Scans the `key` prefix group and keeps rows whose derived index key
    /// equals `key`, so an encoding that is a byte-prefix of another does
    /// not leak foreign rows into the group.
    pub fn all_values_by_key<'a>(
        &'a self,
        key: &'a IK,
    ) -> Result<impl Iterator<Item = Result<V>> + 'a>
    where
        IK: PartialEq,
    {
        let prefix = self.base.encode_key(key)?.to_vec();
        let scan = self.base.all_values_by_prefix_bytes(prefix)?;
        let key_of = &self.key_of;
        Ok(scan.filter(move |item| match item {
            Ok(value) => key_of(value) == *key,
            Err(_) => true,
        }))
    }

    /// Rows whose entry key starts with the encoding of `prefix`
    pub fn all_values_by_prefix<P>(&self, prefix: &P, codec: &dyn Codec<P>) -> Result<Scan<'_, V>> {
        self.base.all_values_by_prefix(prefix, codec)
    }

    /// Rows with index keys in `[start, end)`
    pub fn all_values_by_bounds(&self, start: &IK, end: &IK) -> Result<Scan<'_, V>> {
        self.base.all_values_by_bounds(start, end)
    }
}

impl<IK, V> Clone for NotUniqueIndex<IK, V> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            key_of: self.key_of.clone(),
            mode: self.mode,
        }
    }
}

impl<IK, V> fmt::Debug for NotUniqueIndex<IK, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotUniqueIndex")
            .field("namespace", &self.base.namespace())
            .field("mode", &self.mode)
            .finish()
    }
}
