//! KeyValueStoreBase: typed queries over one namespace
//!
//! Tables and indexes share the same read path: encode a key with the key
//! codec, hit the store, decode the payload. The payload decoding depends on
//! what the namespace stores, captured by [`ValueDecoder`]:
//!
//! - `Full`: the payload is the serialized row
//! - `Reference`: the payload is an encoded primary key; the row is fetched
//!   from the table namespace
//!
//! # Failure policy
//!
//! - Absent keys yield `None` or an empty scan, never an error.
//! - Decoding a corrupt record is [`Error::Codec`] and ends the scan.
//! - A reference whose row is gone (the row was removed between the index
//!   read and the row read) is treated as absent.
//!
//! # Scans
//!
//! Scans are lazy, single-pass iterators of `Result<T>`. They run over a
//! store cursor, which in `MemoryStore` is a snapshot, so the caller may
//! mutate the table while a scan is live.

use std::fmt;
use std::sync::Arc;

use rowtable_core::{Codec, Error, Result, SeekMode};

use crate::buffer::PooledBuffer;
use crate::store::{NamespaceId, OrderedStore, ReadOptions, StoreCursor};

// ============================================================================
// Value decoder
// ============================================================================

/// How the payload stored next to a key turns back into a row.
pub enum ValueDecoder<V> {
    /// The payload is the serialized row
    Full(Arc<dyn Codec<V>>),
    /// The payload is the encoded primary key of a row in `namespace`
    Reference {
        /// Store holding the table
        store: Arc<dyn OrderedStore>,
        /// Table namespace
        namespace: NamespaceId,
        /// Row codec
        codec: Arc<dyn Codec<V>>,
    },
}

impl<V> ValueDecoder<V> {
    /// Decode a payload.
    ///
    /// Returns `Ok(None)` only for a dangling reference.
    pub fn decode(&self, payload: &[u8]) -> Result<Option<V>> {
        match self {
            ValueDecoder::Full(codec) => Ok(Some(codec.decode(payload)?)),
            ValueDecoder::Reference {
                store,
                namespace,
                codec,
            } => match store.get(*namespace, payload)? {
                Some(row) => Ok(Some(codec.decode(&row)?)),
                None => {
                    tracing::trace!(
                        namespace = namespace.as_u32(),
                        "index reference points at a missing row"
                    );
                    Ok(None)
                }
            },
        }
    }

    /// Whether this decoder resolves references
    pub fn is_reference(&self) -> bool {
        matches!(self, ValueDecoder::Reference { .. })
    }
}

impl<V> Clone for ValueDecoder<V> {
    fn clone(&self) -> Self {
        match self {
            ValueDecoder::Full(codec) => ValueDecoder::Full(Arc::clone(codec)),
            ValueDecoder::Reference {
                store,
                namespace,
                codec,
            } => ValueDecoder::Reference {
                store: Arc::clone(store),
                namespace: *namespace,
                codec: Arc::clone(codec),
            },
        }
    }
}

impl<V> fmt::Debug for ValueDecoder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueDecoder::Full(_) => f.write_str("Full"),
            ValueDecoder::Reference { namespace, .. } => f
                .debug_struct("Reference")
                .field("namespace", namespace)
                .finish(),
        }
    }
}

// ============================================================================
// Scan iterator
// ============================================================================

type Project<'a, T> = Box<dyn FnMut(&[u8], &[u8]) -> Result<Option<T>> + 'a>;

/// Lazy forward scan over a positioned cursor.
///
/// Stops at the end of the namespace, at the bounds of the cursor, at the
/// first key outside the prefix (if one is set), or after the first error.
pub struct Scan<'a, T> {
    cursor: Box<dyn StoreCursor + 'a>,
    prefix: Option<Vec<u8>>,
    project: Project<'a, T>,
    done: bool,
}

impl<'a, T> Scan<'a, T> {
    fn new(
        cursor: Box<dyn StoreCursor + 'a>,
        prefix: Option<Vec<u8>>,
        project: Project<'a, T>,
    ) -> Self {
        Scan {
            cursor,
            prefix,
            project,
            done: false,
        }
    }
}

impl<T> Iterator for Scan<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && self.cursor.valid() {
            if let Some(prefix) = &self.prefix {
                if !self.cursor.key().starts_with(prefix) {
                    break;
                }
            }

            let item = (self.project)(self.cursor.key(), self.cursor.value());
            self.cursor.next();

            match item {
                Ok(Some(value)) => return Some(Ok(value)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        self.done = true;
        None
    }
}

impl<T> fmt::Debug for Scan<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scan")
            .field("prefix", &self.prefix)
            .field("done", &self.done)
            .finish()
    }
}

// ============================================================================
// Base
// ============================================================================

/// Shared read path for a table or an index namespace.
pub struct KeyValueStoreBase<K, V> {
    store: Arc<dyn OrderedStore>,
    namespace: NamespaceId,
    key_codec: Arc<dyn Codec<K>>,
    values: ValueDecoder<V>,
}

impl<K, V> KeyValueStoreBase<K, V> {
    /// Create a base over an existing namespace
    pub fn new(
        store: Arc<dyn OrderedStore>,
        namespace: NamespaceId,
        key_codec: Arc<dyn Codec<K>>,
        values: ValueDecoder<V>,
    ) -> Self {
        Self {
            store,
            namespace,
            key_codec,
            values,
        }
    }

    /// Store this base reads from
    pub fn store(&self) -> &Arc<dyn OrderedStore> {
        &self.store
    }

    /// Namespace this base reads from
    pub fn namespace(&self) -> NamespaceId {
        self.namespace
    }

    /// Key codec
    pub fn key_codec(&self) -> &Arc<dyn Codec<K>> {
        &self.key_codec
    }

    /// Payload decoder
    pub fn values(&self) -> &ValueDecoder<V> {
        &self.values
    }

    /// Encode `key` into a pooled buffer
    pub fn encode_key(&self, key: &K) -> Result<PooledBuffer> {
        let mut buf = PooledBuffer::acquire();
        self.key_codec.encode(key, &mut buf)?;
        Ok(buf)
    }

    /// Point read by encoded key
    pub fn get_by_key_bytes(&self, key: &[u8]) -> Result<Option<V>> {
        match self.store.get(self.namespace, key)? {
            Some(payload) => self.values.decode(&payload),
            None => Ok(None),
        }
    }

    /// Point read
    pub fn get_by_key(&self, key: &K) -> Result<Option<V>> {
        let buf = self.encode_key(key)?;
        self.get_by_key_bytes(buf.written())
    }

    /// Raw payload stored at `key`
    ///
    /// For a reference-mode index this is the encoded primary key.
    pub fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.get(self.namespace, key)
    }

    /// Whether `key` is present
    pub fn has_exact_key(&self, key: &K) -> Result<bool> {
        let buf = self.encode_key(key)?;
        Ok(self.store.get(self.namespace, buf.written())?.is_some())
    }

    /// Whether any key starts with the encoding of `prefix`
    pub fn has_any_key_by_prefix<P>(&self, prefix: &P, codec: &dyn Codec<P>) -> Result<bool> {
        let mut buf = PooledBuffer::acquire();
        codec.encode(prefix, &mut buf)?;
        self.has_any_key_by_prefix_bytes(buf.written())
    }

    /// Whether any key starts with `prefix`
    pub fn has_any_key_by_prefix_bytes(&self, prefix: &[u8]) -> Result<bool> {
        let mut cursor = self.store.cursor(self.namespace, ReadOptions::new())?;
        cursor.seek(prefix);
        Ok(cursor.valid() && cursor.key().starts_with(prefix))
    }

    /// All keys in order
    pub fn all_keys(&self) -> Result<Scan<'_, K>> {
        let mut cursor = self.store.cursor(self.namespace, ReadOptions::new())?;
        cursor.seek_to_first();
        Ok(Scan::new(cursor, None, self.key_projection()))
    }

    /// All values in key order
    pub fn all_values(&self) -> Result<Scan<'_, V>> {
        let mut cursor = self.store.cursor(self.namespace, ReadOptions::new())?;
        cursor.seek_to_first();
        Ok(Scan::new(cursor, None, self.value_projection()))
    }

    /// Keys starting with the encoding of `prefix`
    pub fn all_keys_by_prefix<P>(&self, prefix: &P, codec: &dyn Codec<P>) -> Result<Scan<'_, K>> {
        let prefix = encode_prefix(prefix, codec)?;
        let cursor = self.seek_prefix(&prefix)?;
        Ok(Scan::new(cursor, Some(prefix), self.key_projection()))
    }

    /// Values whose key starts with the encoding of `prefix`
    pub fn all_values_by_prefix<P>(&self, prefix: &P, codec: &dyn Codec<P>) -> Result<Scan<'_, V>> {
        let prefix = encode_prefix(prefix, codec)?;
        self.all_values_by_prefix_bytes(prefix)
    }

    /// Values whose key starts with `prefix`
    pub fn all_values_by_prefix_bytes(&self, prefix: Vec<u8>) -> Result<Scan<'_, V>> {
        let cursor = self.seek_prefix(&prefix)?;
        Ok(Scan::new(cursor, Some(prefix), self.value_projection()))
    }

    /// First value near the encoding of `prefix`
    ///
    /// - [`SeekMode::SeekToFirst`]: first entry at or after the prefix, only
    ///   if its key starts with the prefix
    /// - [`SeekMode::SeekToPrev`]: last entry at or before the prefix,
    ///   whether or not it matches (nearest preceding entry)
    pub fn first_value_by_prefix<P>(
        &self,
        prefix: &P,
        codec: &dyn Codec<P>,
        mode: SeekMode,
    ) -> Result<Option<V>> {
        let mut buf = PooledBuffer::acquire();
        codec.encode(prefix, &mut buf)?;
        self.first_value_by_prefix_bytes(buf.written(), mode)
    }

    /// [`Self::first_value_by_prefix`] over an already encoded prefix
    pub fn first_value_by_prefix_bytes(&self, prefix: &[u8], mode: SeekMode) -> Result<Option<V>> {
        let mut cursor = self.store.cursor(self.namespace, ReadOptions::new())?;
        match mode {
            SeekMode::SeekToFirst => {
                cursor.seek(prefix);
                if !cursor.valid() || !cursor.key().starts_with(prefix) {
                    return Ok(None);
                }
            }
            SeekMode::SeekToPrev => {
                cursor.seek_for_prev(prefix);
                if !cursor.valid() {
                    return Ok(None);
                }
            }
        }
        self.values.decode(cursor.value())
    }

    /// Values with keys in `[start, end)`
    pub fn all_values_by_bounds(&self, start: &K, end: &K) -> Result<Scan<'_, V>> {
        let start = self.encode_key(start)?.to_vec();
        let end = self.encode_key(end)?.to_vec();
        self.all_values_by_bounds_bytes(start, end)
    }

    /// Values with encoded keys in `[start, end)`
    pub fn all_values_by_bounds_bytes(&self, start: Vec<u8>, end: Vec<u8>) -> Result<Scan<'_, V>> {
        let options = ReadOptions::new()
            .with_lower_bound(start)
            .with_upper_bound(end);
        let mut cursor = self.store.cursor(self.namespace, options)?;
        cursor.seek_to_first();
        Ok(Scan::new(cursor, None, self.value_projection()))
    }

    fn seek_prefix(&self, prefix: &[u8]) -> Result<Box<dyn StoreCursor + '_>> {
        let mut cursor = self.store.cursor(self.namespace, ReadOptions::new())?;
        cursor.seek(prefix);
        Ok(cursor)
    }

    fn key_projection(&self) -> Project<'_, K> {
        let codec = &self.key_codec;
        Box::new(move |key: &[u8], _: &[u8]| -> Result<Option<K>> {
            Ok(Some(codec.decode(key)?))
        })
    }

    fn value_projection(&self) -> Project<'_, V> {
        let values = &self.values;
        Box::new(move |_: &[u8], payload: &[u8]| values.decode(payload))
    }
}

impl<K, V> Clone for KeyValueStoreBase<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: self.namespace,
            key_codec: Arc::clone(&self.key_codec),
            values: self.values.clone(),
        }
    }
}

impl<K, V> fmt::Debug for KeyValueStoreBase<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueStoreBase")
            .field("namespace", &self.namespace)
            .field("values", &self.values)
            .finish()
    }
}

fn encode_prefix<P>(prefix: &P, codec: &dyn Codec<P>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    codec.encode(prefix, &mut buf).map_err(Error::from)?;
    Ok(buf)
}
