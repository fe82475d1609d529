//! Row lock table
//!
//! A fixed array of mutexes selected by `hash(key) mod lock_count`. This is
//! a coarse approximation of per-row locking: distinct keys that share a
//! bucket serialize against each other, but two operations on the same key
//! always meet on the same mutex.
//!
//! Locks are owned by a `ChangeTransaction`, not by a thread. Guards are
//! `Arc` guards (`parking_lot` `arc_lock`) so the transaction can hold them
//! across calls; reentrancy is decided by the transaction's held set keyed
//! by [`LockId`].

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use rustc_hash::FxHasher;

use rowtable_core::{Error, Result};

/// Owned guard of one bucket
pub(crate) type BucketGuard = ArcMutexGuard<RawMutex, ()>;

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one bucket of one lock table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockId {
    table: u64,
    bucket: usize,
}

impl LockId {
    /// Bucket index inside its table
    pub fn bucket(&self) -> usize {
        self.bucket
    }
}

/// Fixed-size array of row-lock buckets.
#[derive(Debug)]
pub struct RowLockTable {
    id: u64,
    buckets: Box<[Arc<Mutex<()>>]>,
}

impl RowLockTable {
    /// Allocate `lock_count` buckets
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `lock_count` is zero.
    pub fn new(lock_count: usize) -> Result<Self> {
        if lock_count == 0 {
            return Err(Error::invalid_configuration(
                "lock_count must be greater than zero",
            ));
        }
        let buckets = (0..lock_count).map(|_| Arc::new(Mutex::new(()))).collect();
        Ok(Self {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            buckets,
        })
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Always false; a lock table has at least one bucket
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Bucket index for `key`, always in `0..len()`
    pub fn bucket_of<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() % self.buckets.len() as u64) as usize
    }

    /// Lock identity for `key`
    pub fn lock_id<K: Hash + ?Sized>(&self, key: &K) -> LockId {
        LockId {
            table: self.id,
            bucket: self.bucket_of(key),
        }
    }

    /// Whether a bucket is currently held by anyone
    pub fn is_locked(&self, id: LockId) -> bool {
        id.table == self.id && self.buckets[id.bucket].is_locked()
    }

    /// Block until the bucket is free and take it
    pub(crate) fn lock(&self, id: LockId) -> BucketGuard {
        debug_assert_eq!(id.table, self.id);
        self.buckets[id.bucket].lock_arc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_buckets_rejected() {
        let err = RowLockTable::new(0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn test_bucket_in_range() {
        let locks = RowLockTable::new(7).unwrap();
        assert_eq!(locks.len(), 7);
        assert!(!locks.is_empty());
        for key in -1000i64..1000 {
            assert!(locks.bucket_of(&key) < 7);
        }
        assert!(locks.bucket_of("some string key") < 7);
    }

    #[test]
    fn test_same_key_same_bucket() {
        let locks = RowLockTable::new(64).unwrap();
        assert_eq!(locks.lock_id(&42u32), locks.lock_id(&42u32));
        assert_eq!(locks.lock_id("a"), locks.lock_id(&"a".to_string()));
    }

    #[test]
    fn test_single_bucket_maps_everything_together() {
        let locks = RowLockTable::new(1).unwrap();
        assert_eq!(locks.bucket_of(&1), 0);
        assert_eq!(locks.bucket_of(&2), 0);
    }

    #[test]
    fn test_ids_differ_across_tables() {
        let a = RowLockTable::new(1).unwrap();
        let b = RowLockTable::new(1).unwrap();
        assert_ne!(a.lock_id(&1), b.lock_id(&1));
        assert_eq!(a.lock_id(&1).bucket(), b.lock_id(&1).bucket());
    }

    #[test]
    fn test_lock_and_release() {
        let locks = RowLockTable::new(4).unwrap();
        let id = locks.lock_id(&"row");
        assert!(!locks.is_locked(id));

        let guard = locks.lock(id);
        assert!(locks.is_locked(id));

        drop(guard);
        assert!(!locks.is_locked(id));
    }
}
