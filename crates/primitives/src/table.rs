//! Table: typed primary store with dependent indexes
//!
//! ## Write path
//!
//! `put` and `remove` run against a [`ChangeTransaction`]. When the table
//! has indexes or a change consumer, every write first takes the row lock
//! (if row locking is enabled) and reads the current row, so the indexes can
//! diff old against new and the consumer can see the previous value:
//!
//! ```text
//! lock(key) -> read current -> index.put/remove ... -> primary write -> register change
//! ```
//!
//! All of it lands in the transaction's batch and commits atomically. A
//! table with neither indexes nor a consumer writes blindly.
//!
//! ## Implicit transactions
//!
//! `put`, `remove` and `try_apply_change` without a transaction argument
//! open one and commit it before returning. `put`/`remove` use a
//! pass-through transaction when the table has no indexes; a single write
//! does not need a batch.
//!
//! ## Row locking
//!
//! Off by default. Without it, concurrent writers of the same key may
//! interleave their read-modify-write sequences, leaving index entries or
//! notifications out of step with the row. Enable it with
//! [`TableOptions::enable_concurrent_changes_within_row`] whenever indexes
//! or a consumer must see a consistent history per row.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use rowtable_concurrency::{ChangeTransaction, LockId, RowLockTable, TableChange};
use rowtable_core::{
    ChangeConsumer, Codec, Error, IndexOptions, Result, SeekMode, TableOptions, ValueStoreMode,
    WriteOptions,
};
use rowtable_storage::{
    KeyValueStoreBase, NamespaceId, OrderedStore, PooledBuffer, Scan, ValueDecoder,
};

use crate::index::{
    DependentIndex, IndexKeySpec, IndexKind, KeyOf, NotUniqueIndex, UniqueIndex,
};

/// Typed table over one namespace of an [`OrderedStore`].
///
/// # Example
///
/// ```ignore
/// let mut students = Table::new(
///     store.clone(),
///     |s: &Student| s.id,
///     Arc::new(U64BeCodec),
///     Arc::new(BincodeCodec::<Student>::new()),
///     TableOptions::new().enable_concurrent_changes_within_row(),
/// )?;
/// let by_name = students.create_not_unique_index(
///     |s: &Student| s.name.clone(),
///     Arc::new(Utf8Codec),
///     IndexOptions::new(),
/// )?;
///
/// students.put(Student { id: 100, name: "John Doe".into(), passport_id: "P1".into() })?;
/// let johns: Vec<Student> = by_name.all_values_by_key(&"John Doe".into())?.collect::<Result<_>>()?;
/// ```
pub struct Table<K, V> {
    base: KeyValueStoreBase<K, V>,
    key_of: KeyOf<V, K>,
    value_codec: Arc<dyn Codec<V>>,
    indexes: Vec<DependentIndex<V>>,
    locks: Option<RowLockTable>,
    consumer: Option<Arc<dyn ChangeConsumer<K, V>>>,
    write_options: WriteOptions,
}

impl<K, V> Table<K, V>
where
    K: Clone + PartialEq + Hash + 'static,
    V: 'static,
{
    /// Create a table, creating its namespace in `store`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] for invalid options, checked before
    /// the store is touched; otherwise any store error from namespace
    /// creation.
    pub fn new(
        store: Arc<dyn OrderedStore>,
        key_of: impl Fn(&V) -> K + Send + Sync + 'static,
        key_codec: Arc<dyn Codec<K>>,
        value_codec: Arc<dyn Codec<V>>,
        options: TableOptions<K, V>,
    ) -> Result<Self> {
        options.validate()?;

        let locks = if options.concurrent_changes_within_row() {
            Some(RowLockTable::new(options.lock_count())?)
        } else {
            None
        };

        let namespace = store.create_namespace(options.namespace(), options.namespace_options())?;
        tracing::debug!(
            namespace = namespace.as_u32(),
            name = options.namespace(),
            row_locks = locks.as_ref().map_or(0, RowLockTable::len),
            "table opened"
        );

        let base = KeyValueStoreBase::new(
            store,
            namespace,
            key_codec,
            ValueDecoder::Full(Arc::clone(&value_codec)),
        );

        Ok(Self {
            base,
            key_of: Arc::new(key_of),
            value_codec,
            indexes: Vec::new(),
            locks,
            consumer: options.change_consumer().cloned(),
            write_options: options.write_options(),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Store this table lives in
    pub fn store(&self) -> &Arc<dyn OrderedStore> {
        self.base.store()
    }

    /// Table namespace
    pub fn namespace(&self) -> NamespaceId {
        self.base.namespace()
    }

    /// Primary key of `value`
    pub fn key_of(&self, value: &V) -> K {
        (self.key_of)(value)
    }

    /// Registered indexes, in registration order
    pub fn indexes(&self) -> &[DependentIndex<V>] {
        &self.indexes
    }

    /// Number of row-lock buckets, 0 when row locking is disabled
    pub fn lock_count_in_use(&self) -> usize {
        self.locks.as_ref().map_or(0, RowLockTable::len)
    }

    /// Open an explicit transaction against this table's store
    pub fn begin(&self) -> ChangeTransaction {
        ChangeTransaction::new(Arc::clone(self.base.store())).with_write_options(self.write_options)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Row stored under `key`
    pub fn get_by_key(&self, key: &K) -> Result<Option<V>> {
        self.base.get_by_key(key)
    }

    /// Row stored under the primary key of `value`
    pub fn get_by_value(&self, value: &V) -> Result<Option<V>> {
        self.base.get_by_key(&(self.key_of)(value))
    }

    /// Whether a row exists under `key`
    pub fn has_key(&self, key: &K) -> Result<bool> {
        self.base.has_exact_key(key)
    }

    /// Whether any primary key starts with the encoding of `prefix`
    pub fn has_any_key_by_prefix<P>(&self, prefix: &P, codec: &dyn Codec<P>) -> Result<bool> {
        self.base.has_any_key_by_prefix(prefix, codec)
    }

    /// All primary keys in order
    pub fn all_keys(&self) -> Result<Scan<'_, K>> {
        self.base.all_keys()
    }

    /// All rows in primary key order
    pub fn all_values(&self) -> Result<Scan<'_, V>> {
        self.base.all_values()
    }

    /// Primary keys starting with the encoding of `prefix`
    pub fn all_keys_by_prefix<P>(&self, prefix: &P, codec: &dyn Codec<P>) -> Result<Scan<'_, K>> {
        self.base.all_keys_by_prefix(prefix, codec)
    }

    /// Rows whose primary key starts with the encoding of `prefix`
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

    /// Rows with primary keys in `[start, end)`
    pub fn all_values_by_bounds(&self, start: &K, end: &K) -> Result<Scan<'_, V>> {
        self.base.all_values_by_bounds(start, end)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert or overwrite `value` in its own transaction
    pub fn put(&self, value: V) -> Result<()> {
        let mut tx = self.implicit_transaction();
        self.put_in(value, &mut tx)?;
        tx.commit()
    }

    /// Insert or overwrite `value` as part of `tx`
    pub fn put_in(&self, value: V, tx: &mut ChangeTransaction) -> Result<()> {
        self.check_transaction(tx)?;
        let key = (self.key_of)(&value);
        let key_bytes = self.base.encode_key(&key)?;

        let span = tracing::trace_span!(
            "table.put",
            namespace = self.namespace().as_u32(),
            key = %BASE64.encode(key_bytes.written())
        );
        let _enter = span.enter();

        self.put_encoded(key, key_bytes.written(), value, tx)
    }

    /// Remove the row under `key` in its own transaction
    ///
    /// Removing an absent key is a no-op.
    pub fn remove(&self, key: &K) -> Result<()> {
        let mut tx = self.implicit_transaction();
        self.remove_in(key, &mut tx)?;
        tx.commit()
    }

    /// Remove the row under `key` as part of `tx`
    pub fn remove_in(&self, key: &K, tx: &mut ChangeTransaction) -> Result<()> {
        self.check_transaction(tx)?;
        let key_bytes = self.base.encode_key(key)?;

        let span = tracing::trace_span!(
            "table.remove",
            namespace = self.namespace().as_u32(),
            key = %BASE64.encode(key_bytes.written())
        );
        let _enter = span.enter();

        self.remove_encoded(key, key_bytes.written(), tx)
    }

    /// Remove the row stored under the primary key of `value`
    pub fn remove_by_value(&self, value: &V) -> Result<()> {
        self.remove(&(self.key_of)(value))
    }

    /// [`Self::remove_by_value`] as part of `tx`
    pub fn remove_by_value_in(&self, value: &V, tx: &mut ChangeTransaction) -> Result<()> {
        self.remove_in(&(self.key_of)(value), tx)
    }

    /// Atomic read-modify-write of the row under `key`, in its own
    /// transaction
    ///
    /// `apply` receives the key, the current row and `change`, and returns
    /// `(apply, new_row)`:
    ///
    /// | result | effect |
    /// |--------|--------|
    /// | `(false, _)` | nothing written, returns `(false, None)` |
    /// | `(true, None)` | row removed if present |
    /// | `(true, Some(v))`, same key | `v` written in place |
    /// | `(true, Some(v))`, other key | old row removed, `v` written under its own key |
    ///
    /// The implicit transaction is always batched, so a key migration is
    /// atomic.
    pub fn try_apply_change<C, F>(&self, key: &K, change: C, apply: F) -> Result<(bool, Option<V>)>
    where
        V: Clone,
        F: FnOnce(&K, Option<&V>, C) -> (bool, Option<V>),
    {
        let mut tx = self.begin();
        let outcome = self.try_apply_change_in(key, change, apply, &mut tx)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// [`Self::try_apply_change`] as part of `tx`
    ///
    /// A lock already held by `tx` is kept. When `apply` declines, only the
    /// lock this call took is released.
    pub fn try_apply_change_in<C, F>(
        &self,
        key: &K,
        change: C,
        apply: F,
        tx: &mut ChangeTransaction,
    ) -> Result<(bool, Option<V>)>
    where
        V: Clone,
        F: FnOnce(&K, Option<&V>, C) -> (bool, Option<V>),
    {
        self.check_transaction(tx)?;
        let key_bytes = self.base.encode_key(key)?;

        let span = tracing::trace_span!(
            "table.try_apply_change",
            namespace = self.namespace().as_u32(),
            key = %BASE64.encode(key_bytes.written())
        );
        let _enter = span.enter();

        let taken = self.lock_row(key, tx);
        let current = self.current_row(key_bytes.written(), tx)?;

        let (accepted, next) = apply(key, current.as_ref(), change);
        if !accepted {
            if let Some(id) = taken {
                tx.release(id);
            }
            tracing::trace!("change declined");
            return Ok((false, None));
        }

        match next {
            None => {
                if let Some(current) = current {
                    self.delete_row(key, key_bytes.written(), current, tx)?;
                }
                Ok((true, None))
            }
            Some(next) => {
                let next_key = (self.key_of)(&next);
                if next_key == *key {
                    self.write_row(next_key, key_bytes.written(), next.clone(), current, tx)?;
                } else {
                    if let Some(current) = current {
                        self.delete_row(key, key_bytes.written(), current, tx)?;
                    }
                    let next_key_bytes = self.base.encode_key(&next_key)?;
                    tracing::trace!(
                        to = %BASE64.encode(next_key_bytes.written()),
                        "primary key changed"
                    );
                    self.put_encoded(next_key, next_key_bytes.written(), next.clone(), tx)?;
                }
                Ok((true, Some(next)))
            }
        }
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Register a unique index on `index_key_of`
    ///
    /// Rows already in the table are not back-filled; create indexes before
    /// writing.
    pub fn create_unique_index<IK>(
        &mut self,
        index_key_of: impl Fn(&V) -> IK + Send + Sync + 'static,
        key_codec: Arc<dyn Codec<IK>>,
        options: IndexOptions,
    ) -> Result<UniqueIndex<IK, V>>
    where
        IK: PartialEq + 'static,
    {
        let key_of: KeyOf<V, IK> = Arc::new(index_key_of);
        let base = self.register_index(IndexKind::Unique, key_of, key_codec, &options)?;
        Ok(UniqueIndex::new(base, options.value_store_mode()))
    }

    /// Register a non-unique index on `index_key_of`
    ///
    /// Rows already in the table are not back-filled; create indexes before
    /// writing.
    pub fn create_not_unique_index<IK>(
        &mut self,
        index_key_of: impl Fn(&V) -> IK + Send + Sync + 'static,
        key_codec: Arc<dyn Codec<IK>>,
        options: IndexOptions,
    ) -> Result<NotUniqueIndex<IK, V>>
    where
        IK: PartialEq + 'static,
    {
        let key_of: KeyOf<V, IK> = Arc::new(index_key_of);
        let base = self.register_index(
            IndexKind::NotUnique,
            Arc::clone(&key_of),
            key_codec,
            &options,
        )?;
        Ok(NotUniqueIndex::new(base, key_of, options.value_store_mode()))
    }

    fn register_index<IK>(
        &mut self,
        kind: IndexKind,
        key_of: KeyOf<V, IK>,
        key_codec: Arc<dyn Codec<IK>>,
        options: &IndexOptions,
    ) -> Result<KeyValueStoreBase<IK, V>>
    where
        IK: PartialEq + 'static,
    {
        options.validate()?;
        let store = Arc::clone(self.base.store());
        let namespace = store.create_namespace(options.namespace(), options.namespace_options())?;
        // a shared name resolves to an existing id, so nothing new was created
        if namespace == self.namespace() || self.indexes.iter().any(|i| i.namespace() == namespace) {
            return Err(Error::invalid_configuration(format!(
                "namespace '{}' is already used by this table",
                options.namespace()
            )));
        }
        let mode = options.value_store_mode();

        self.indexes.push(DependentIndex::new(
            kind,
            mode,
            namespace,
            Box::new(IndexKeySpec::new(key_of, Arc::clone(&key_codec))),
        ));
        tracing::debug!(
            table = self.namespace().as_u32(),
            namespace = namespace.as_u32(),
            kind = ?kind,
            mode = ?mode,
            "index registered"
        );

        let values = match mode {
            ValueStoreMode::FullValue => ValueDecoder::Full(Arc::clone(&self.value_codec)),
            ValueStoreMode::Reference => ValueDecoder::Reference {
                store: Arc::clone(&store),
                namespace: self.namespace(),
                codec: Arc::clone(&self.value_codec),
            },
        };
        Ok(KeyValueStoreBase::new(store, namespace, key_codec, values))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn implicit_transaction(&self) -> ChangeTransaction {
        let store = Arc::clone(self.base.store());
        let tx = if self.indexes.is_empty() {
            ChangeTransaction::pass_through(store)
        } else {
            ChangeTransaction::new(store)
        };
        tx.with_write_options(self.write_options)
    }

    fn check_transaction(&self, tx: &ChangeTransaction) -> Result<()> {
        if tx.belongs_to(self.base.store()) {
            Ok(())
        } else {
            Err(Error::invalid_operation(
                "transaction was opened on a different store",
            ))
        }
    }

    /// Whether writes must read the current row first
    fn tracks_current_row(&self) -> bool {
        !self.indexes.is_empty() || self.consumer.is_some()
    }

    fn lock_row(&self, key: &K, tx: &mut ChangeTransaction) -> Option<LockId> {
        self.locks.as_ref().and_then(|locks| tx.acquire(locks, key))
    }

    fn put_encoded(
        &self,
        key: K,
        key_bytes: &[u8],
        value: V,
        tx: &mut ChangeTransaction,
    ) -> Result<()> {
        if !self.tracks_current_row() {
            let value_bytes = self.encode_value(&value)?;
            return tx.put(self.namespace(), key_bytes, value_bytes.written());
        }

        self.lock_row(&key, tx);
        let old = self.current_row(key_bytes, tx)?;
        self.write_row(key, key_bytes, value, old, tx)
    }

    fn remove_encoded(&self, key: &K, key_bytes: &[u8], tx: &mut ChangeTransaction) -> Result<()> {
        if !self.tracks_current_row() {
            return tx.delete(self.namespace(), key_bytes);
        }

        self.lock_row(key, tx);
        match self.current_row(key_bytes, tx)? {
            Some(current) => self.delete_row(key, key_bytes, current, tx),
            None => {
                tracing::trace!("remove of absent row");
                Ok(())
            }
        }
    }

    /// Row under `key_bytes` as `tx` sees it, its own queued writes included
    fn current_row(&self, key_bytes: &[u8], tx: &ChangeTransaction) -> Result<Option<V>> {
        match tx.get(self.namespace(), key_bytes)? {
            Some(bytes) => self.base.values().decode(&bytes),
            None => Ok(None),
        }
    }

    /// Write `value` over `old` with index maintenance; the lock (if any) is
    /// already held
    fn write_row(
        &self,
        key: K,
        key_bytes: &[u8],
        value: V,
        old: Option<V>,
        tx: &mut ChangeTransaction,
    ) -> Result<()> {
        let value_bytes = self.encode_value(&value)?;
        for index in &self.indexes {
            index.put(key_bytes, value_bytes.written(), old.as_ref(), &value, tx)?;
        }
        tx.put(self.namespace(), key_bytes, value_bytes.written())?;

        if let Some(consumer) = &self.consumer {
            tx.register_change(
                TableChange::AddedOrUpdated {
                    key,
                    old,
                    new: value,
                },
                Arc::clone(consumer),
            );
        }
        Ok(())
    }

    /// Delete the existing row `current`; the lock (if any) is already held
    fn delete_row(
        &self,
        key: &K,
        key_bytes: &[u8],
        current: V,
        tx: &mut ChangeTransaction,
    ) -> Result<()> {
        for index in &self.indexes {
            index.remove(key_bytes, &current, tx)?;
        }
        tx.delete(self.namespace(), key_bytes)?;

        if let Some(consumer) = &self.consumer {
            tx.register_change(
                TableChange::Removed {
                    key: key.clone(),
                    value: current,
                },
                Arc::clone(consumer),
            );
        }
        Ok(())
    }

    fn encode_value(&self, value: &V) -> Result<PooledBuffer> {
        let mut buf = PooledBuffer::acquire();
        self.value_codec.encode(value, &mut buf)?;
        Ok(buf)
    }
}

impl<K, V> fmt::Debug for Table<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("namespace", &self.base.namespace())
            .field("indexes", &self.indexes)
            .field("row_locks", &self.locks.as_ref().map_or(0, RowLockTable::len))
            .field("has_consumer", &self.consumer.is_some())
            .finish()
    }
}
