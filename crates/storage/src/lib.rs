//! Storage layer for rowtable
//!
//! This crate implements the byte-level half of the system:
//! - OrderedStore / StoreCursor: contract of the ordered key-value store
//! - WriteBatch: atomic multi-namespace batch
//! - MemoryStore: BTreeMap-based store with RwLock and snapshot cursors
//! - PooledBuffer: thread-local + shared scratch buffers for encoding
//! - KeyValueStoreBase: typed get / prefix / bounds queries shared by
//!   tables and indexes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod base;
pub mod buffer;
pub mod memory;
pub mod store;

pub use base::{KeyValueStoreBase, Scan, ValueDecoder};
pub use buffer::PooledBuffer;
pub use memory::MemoryStore;
pub use store::{BatchOp, NamespaceId, OrderedStore, ReadOptions, StoreCursor, WriteBatch};
