//! ChangeTransaction: one atomic unit of work over a store
//!
//! A transaction accumulates, while open:
//! - raw mutations against table and index namespaces
//! - deferred [`TableChange`] records, in registration order
//! - row-lock buckets taken on behalf of its operations
//!
//! # Lifecycle
//!
//! ```text
//! Open --commit()--> Committed
//!   \
//!    `--drop-------> Discarded   (batch and changes dropped, locks released)
//! ```
//!
//! `commit` consumes the transaction, so a committed transaction cannot be
//! reused. The type is neither `Clone` nor `Send`: locks are released by
//! the thread that took them.
//!
//! # Write modes
//!
//! - **Batched** (default): mutations go into one [`WriteBatch`] applied
//!   atomically at commit.
//! - **Pass-through**: mutations are applied to the store immediately. Used
//!   for implicit transactions of tables without indexes, where a single
//!   write needs no batch.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use smallvec::SmallVec;

use rowtable_core::{ChangeConsumer, Result, WriteOptions};
use rowtable_storage::{NamespaceId, OrderedStore, WriteBatch};

use crate::change::{BoundChange, PendingChange, TableChange};
use crate::lock::{BucketGuard, LockId, RowLockTable};

enum Writes {
    Batch(WriteBatch),
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Committed,
    Discarded,
}

struct HeldLock {
    id: LockId,
    _guard: BucketGuard,
}

/// Atomic unit of work spanning a table and its indexes.
///
/// # Example
///
/// ```ignore
/// let mut tx = ChangeTransaction::new(store.clone());
/// students.put_in(alice, &mut tx)?;
/// students.remove_in(&bob_id, &mut tx)?;
/// tx.commit()?; // both or neither
/// ```
pub struct ChangeTransaction {
    store: Arc<dyn OrderedStore>,
    writes: Writes,
    write_options: WriteOptions,
    changes: Vec<Box<dyn PendingChange>>,
    held: SmallVec<[HeldLock; 2]>,
    state: State,
}

impl ChangeTransaction {
    /// Open a batched transaction
    pub fn new(store: Arc<dyn OrderedStore>) -> Self {
        Self::with_writes(store, Writes::Batch(WriteBatch::new()))
    }

    /// Open a pass-through transaction
    ///
    /// Every mutation hits the store immediately; commit only dispatches
    /// changes and releases locks. Use only when a single mutation needs no
    /// atomic grouping.
    pub fn pass_through(store: Arc<dyn OrderedStore>) -> Self {
        Self::with_writes(store, Writes::PassThrough)
    }

    fn with_writes(store: Arc<dyn OrderedStore>, writes: Writes) -> Self {
        Self {
            store,
            writes,
            write_options: WriteOptions::default(),
            changes: Vec::new(),
            held: SmallVec::new(),
            state: State::Open,
        }
    }

    /// Set the write options used when the transaction writes to the store
    pub fn with_write_options(mut self, write_options: WriteOptions) -> Self {
        self.write_options = write_options;
        self
    }

    /// Whether mutations bypass the batch
    pub fn is_pass_through(&self) -> bool {
        matches!(self.writes, Writes::PassThrough)
    }

    /// Store this transaction writes to
    pub fn store(&self) -> &Arc<dyn OrderedStore> {
        &self.store
    }

    /// Whether `store` is the store this transaction writes to
    pub fn belongs_to(&self, store: &Arc<dyn OrderedStore>) -> bool {
        Arc::as_ptr(&self.store) as *const () == Arc::as_ptr(store) as *const ()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Write `value` at `key` in `namespace`
    pub fn put(&mut self, namespace: NamespaceId, key: &[u8], value: &[u8]) -> Result<()> {
        match &mut self.writes {
            Writes::Batch(batch) => {
                batch.put(namespace, key, value);
                Ok(())
            }
            Writes::PassThrough => self.store.put(namespace, key, value, &self.write_options),
        }
    }

    /// Delete `key` in `namespace`
    pub fn delete(&mut self, namespace: NamespaceId, key: &[u8]) -> Result<()> {
        match &mut self.writes {
            Writes::Batch(batch) => {
                batch.delete(namespace, key);
                Ok(())
            }
            Writes::PassThrough => self.store.delete(namespace, key, &self.write_options),
        }
    }

    /// Read `key` as this transaction sees it
    ///
    /// Queued writes win over the store, so a second write to the same key
    /// within one batch diffs against the first.
    pub fn get(&self, namespace: NamespaceId, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Writes::Batch(batch) = &self.writes {
            if let Some(pending) = batch.latest(namespace, key) {
                return Ok(pending.map(<[u8]>::to_vec));
            }
        }
        self.store.get(namespace, key)
    }

    /// Queue a change for dispatch at commit
    pub fn register_change<K, V>(
        &mut self,
        change: TableChange<K, V>,
        consumer: Arc<dyn ChangeConsumer<K, V>>,
    ) where
        K: 'static,
        V: 'static,
    {
        self.changes.push(Box::new(BoundChange { change, consumer }));
    }

    // ========================================================================
    // Row locks
    // ========================================================================

    /// Take the bucket of `key` unless this transaction already holds it
    ///
    /// Blocks until the bucket is free. Returns the lock id if this call
    /// took the lock, `None` if it was already held, so callers can undo
    /// exactly what they took.
    pub fn acquire<K: Hash + ?Sized>(&mut self, locks: &RowLockTable, key: &K) -> Option<LockId> {
        let id = locks.lock_id(key);
        if self.holds(id) {
            return None;
        }

        let guard = locks.lock(id);
        tracing::trace!(bucket = id.bucket(), "row lock taken");
        self.held.push(HeldLock { id, _guard: guard });
        Some(id)
    }

    /// Release a bucket held by this transaction
    ///
    /// Returns false if the bucket was not held.
    pub fn release(&mut self, id: LockId) -> bool {
        match self.held.iter().position(|held| held.id == id) {
            Some(pos) => {
                self.held.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Whether this transaction holds the bucket
    pub fn holds(&self, id: LockId) -> bool {
        self.held.iter().any(|held| held.id == id)
    }

    /// Number of buckets held
    pub fn taken_lock_count(&self) -> usize {
        self.held.len()
    }

    /// Number of changes waiting for dispatch
    pub fn pending_change_count(&self) -> usize {
        self.changes.len()
    }

    /// Number of buffered mutations (always 0 for pass-through)
    pub fn pending_write_count(&self) -> usize {
        match &self.writes {
            Writes::Batch(batch) => batch.len(),
            Writes::PassThrough => 0,
        }
    }

    // ========================================================================
    // Completion
    // ========================================================================

    /// Commit the transaction.
    ///
    /// 1. Writes the batch atomically.
    /// 2. Dispatches changes in registration order, locks still held.
    /// 3. Releases all locks.
    ///
    /// # Errors
    ///
    /// Returns the store error if the batch write fails. In that case no
    /// change is dispatched and every lock is still released.
    pub fn commit(mut self) -> Result<()> {
        let writes = std::mem::replace(&mut self.writes, Writes::PassThrough);
        let ops = match writes {
            Writes::Batch(batch) if !batch.is_empty() => {
                let ops = batch.len();
                if let Err(e) = self.store.write_batch(batch, &self.write_options) {
                    tracing::warn!(
                        ops,
                        pending_changes = self.changes.len(),
                        locks = self.held.len(),
                        error = %e,
                        "transaction commit failed"
                    );
                    self.changes.clear();
                    self.state = State::Discarded;
                    return Err(e);
                }
                ops
            }
            _ => 0,
        };

        let changes = std::mem::take(&mut self.changes);
        let dispatched = changes.len();
        for change in changes {
            change.dispatch();
        }

        self.state = State::Committed;
        tracing::debug!(
            ops,
            dispatched,
            locks = self.held.len(),
            "transaction committed"
        );
        self.held.clear();
        Ok(())
    }

    /// Discard the transaction explicitly (same as dropping it)
    pub fn discard(self) {}
}

impl Drop for ChangeTransaction {
    fn drop(&mut self) {
        if self.state == State::Open {
            let pending_writes = self.pending_write_count();
            if pending_writes > 0 || !self.changes.is_empty() {
                tracing::debug!(
                    pending_writes,
                    pending_changes = self.changes.len(),
                    locks = self.held.len(),
                    "transaction discarded"
                );
            }
            self.state = State::Discarded;
        }
        self.changes.clear();
        self.held.clear();
    }
}

impl fmt::Debug for ChangeTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeTransaction")
            .field("state", &self.state)
            .field("pass_through", &self.is_pass_through())
            .field("pending_writes", &self.pending_write_count())
            .field("pending_changes", &self.changes.len())
            .field("held_locks", &self.held.len())
            .finish()
    }
}
