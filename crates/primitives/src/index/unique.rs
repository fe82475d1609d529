//! UniqueIndex: read handle over a unique dependent index

use std::fmt;

use rowtable_core::{Codec, Result, SeekMode, ValueStoreMode};
use rowtable_storage::{KeyValueStoreBase, NamespaceId, Scan};

/// Read handle of a unique index.
///
/// Entries are keyed by the encoded index key alone, so a lookup returns at
/// most one row. Created by [`Table::create_unique_index`](crate::Table::create_unique_index);
/// the table keeps the index up to date.
pub struct UniqueIndex<IK, V> {
    base: KeyValueStoreBase<IK, V>,
    mode: ValueStoreMode,
}

impl<IK, V> UniqueIndex<IK, V> {
    pub(crate) fn new(base: KeyValueStoreBase<IK, V>, mode: ValueStoreMode) -> Self {
        Self { base, mode }
    }

    /// Namespace holding the entries
    pub fn namespace(&self) -> NamespaceId {
        self.base.namespace()
    }

    /// What entries store as payload
    pub fn value_store_mode(&self) -> ValueStoreMode {
        self.mode
    }

    /// Row whose index key is `key`
    pub fn get_by_key(&self, key: &IK) -> Result<Option<V>> {
        self.base.get_by_key(key)
    }

    /// Raw payload stored for `key`
    ///
    /// The serialized row in FullValue mode, the encoded primary key in
    /// Reference mode.
    pub fn get_raw(&self, key: &IK) -> Result<Option<Vec<u8>>> {
        let buf = self.base.encode_key(key)?;
        self.base.get_raw(buf.written())
    }

    /// Whether an entry exists for `key`
    pub fn has_exact_key(&self, key: &IK) -> Result<bool> {
        self.base.has_exact_key(key)
    }

    /// Whether any index key starts with the encoding of `prefix`
    pub fn has_any_key_by_prefix<P>(&self, prefix: &P, codec: &dyn Codec<P>) -> Result<bool> {
        self.base.has_any_key_by_prefix(prefix, codec)
    }

    /// All index keys in order
    pub fn all_keys(&self) -> Result<Scan<'_, IK>> {
        self.base.all_keys()
    }

    /// Index keys starting with the encoding of `prefix`
    pub fn all_keys_by_prefix<P>(&self, prefix: &P, codec: &dyn Codec<P>) -> Result<Scan<'_, IK>> {
        self.base.all_keys_by_prefix(prefix, codec)
    }

    /// All rows in index key order
    pub fn all_values(&self) -> Result<Scan<'_, V>> {
        self.base.all_values()
    }

    /// Rows whose index key starts with the encoding of `prefix`
    pub fn all_values_by_prefix<P>(&self, prefix: &P, codec: &dyn Codec<P>) -> Result<Scan<'_, V>> {
        self.base.all_values_by_prefix(prefix, codec)
    }

    /// See [`KeyValueStoreBase::first_value_by_prefix`]
    pub fn first_value_by_prefix<P>(
        &self,
        prefix: &P,
        codec: &dyn Codec<P>,
        mode: SeekMode,
    ) -> Result<Option<V>> {
        self.base.first_value_by_prefix(prefix, codec, mode)
    }

    /// Rows with index keys in `[start, end)`
    pub fn all_values_by_bounds(&self, start: &IK, end: &IK) -> Result<Scan<'_, V>> {
        self.base.all_values_by_bounds(start, end)
    }
}

impl<IK, V> Clone for UniqueIndex<IK, V> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            mode: self.mode,
        }
    }
}

impl<IK, V> fmt::Debug for UniqueIndex<IK, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniqueIndex")
            .field("namespace", &self.base.namespace())
            .field("mode", &self.mode)
            .finish()
    }
}
