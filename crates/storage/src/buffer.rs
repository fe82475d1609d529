//! Scratch buffer pool for encoding
//!
//! Eliminates allocation overhead by reusing the byte buffers keys, values
//! and index keys are encoded into.
//!
//! # Layout
//!
//! - Each thread owns one fast slot (`thread_local!`), used by the common
//!   non-nested case.
//! - A shared overflow pool serves nested acquisition: encoding a key and
//!   a value at the same time, or index maintenance inside a `put`.
//!
//! Buffers are cleared, not reallocated, on return. `Vec::clear` keeps the
//! capacity, so after warmup the hot path has zero allocations.
//!
//! ```ignore
//! let mut key = PooledBuffer::acquire();
//! let mut value = PooledBuffer::acquire(); // nested: served by the shared pool
//! codec.encode(&row.id, &mut key)?;
//! store.get(ns, key.written())?;
//! // both buffers go back to the pools when dropped
//! ```

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

/// Capacity of freshly allocated buffers
pub const INITIAL_CAPACITY: usize = 256;

/// Maximum buffers kept in the shared overflow pool
pub const MAX_SHARED_BUFFERS: usize = 64;

/// Buffers that grew past this capacity are freed instead of pooled
pub const MAX_RETAINED_CAPACITY: usize = 1 << 20;

thread_local! {
    /// Per-thread fast slot
    static LOCAL_SLOT: RefCell<Option<Vec<u8>>> = const { RefCell::new(None) };
}

/// Shared overflow pool
static SHARED_POOL: Mutex<Vec<Vec<u8>>> = parking_lot::const_mutex(Vec::new());

/// A scratch buffer checked out of the pool.
///
/// Dereferences to `Vec<u8>`, so codecs can append to it directly. The
/// buffer returns to the pool when dropped; it is never shared between two
/// owners.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
}

impl PooledBuffer {
    /// Check out an empty buffer
    ///
    /// Tries the thread's fast slot, then the shared pool, then allocates
    /// [`INITIAL_CAPACITY`] bytes.
    pub fn acquire() -> Self {
        // try_with: the thread-local may already be gone during thread exit
        let buf = LOCAL_SLOT
            .try_with(|slot| slot.borrow_mut().take())
            .ok()
            .flatten()
            .or_else(|| SHARED_POOL.lock().pop())
            .unwrap_or_else(|| Vec::with_capacity(INITIAL_CAPACITY));
        debug_assert!(buf.is_empty());
        PooledBuffer { buf }
    }

    /// Bytes written so far
    pub fn written(&self) -> &[u8] {
        &self.buf
    }

    /// Copy the written bytes out
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.clone()
    }

    /// Whether the calling thread's fast slot currently holds a buffer
    pub fn local_slot_occupied() -> bool {
        LOCAL_SLOT.with(|slot| slot.borrow().is_some())
    }

    /// Number of buffers in the shared overflow pool
    pub fn shared_pool_size() -> usize {
        SHARED_POOL.lock().len()
    }

    /// Pre-warm the shared pool with `count` buffers
    ///
    /// Capped at [`MAX_SHARED_BUFFERS`].
    pub fn warmup(count: usize) {
        let count = count.min(MAX_SHARED_BUFFERS);
        let mut pool = SHARED_POOL.lock();
        let current = pool.len();
        for _ in current..count {
            pool.push(Vec::with_capacity(INITIAL_CAPACITY));
        }
    }

    /// Drop every buffer held by the shared pool
    pub fn clear_shared() {
        SHARED_POOL.lock().clear();
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl AsRef<[u8]> for PooledBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        if buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        buf.clear();

        let leftover = LOCAL_SLOT
            .try_with(|slot| {
                let mut slot = slot.borrow_mut();
                if slot.is_none() {
                    *slot = Some(buf);
                    None
                } else {
                    Some(buf)
                }
            })
            .unwrap_or(None);

        if let Some(buf) = leftover {
            let mut pool = SHARED_POOL.lock();
            if pool.len() < MAX_SHARED_BUFFERS {
                pool.push(buf);
            }
        }
    }
}
