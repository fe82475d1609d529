//! rowtable - typed tables with maintained secondary indexes
//!
//! rowtable turns an ordered byte-keyed store into typed tables. A table
//! keeps its unique and non-unique indexes consistent on every write,
//! groups writes across the table and its indexes into one atomic batch,
//! optionally serializes same-row updates, and notifies a consumer of
//! committed changes.
//!
//! # Quick Start
//!
//! ```ignore
//! use rowtable::{BincodeCodec, IndexOptions, MemoryStore, Table, TableOptions, U64BeCodec, Utf8Codec};
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut students = Table::new(
//!     store.clone(),
//!     |s: &Student| s.id,
//!     Arc::new(U64BeCodec),
//!     Arc::new(BincodeCodec::<Student>::new()),
//!     TableOptions::new().enable_concurrent_changes_within_row(),
//! )?;
//! let by_passport = students.create_unique_index(
//!     |s: &Student| s.passport_id.clone(),
//!     Arc::new(Utf8Codec),
//!     IndexOptions::new(),
//! )?;
//!
//! students.put(Student { id: 200, name: "John Doe".into(), passport_id: "P2".into() })?;
//! assert!(by_passport.get_by_key(&"P2".to_string())?.is_some());
//! ```
//!
//! # Architecture
//!
//! | crate | role |
//! |-------|------|
//! | `rowtable-core` | errors, codecs, options, config, change consumer |
//! | `rowtable-storage` | store contract, in-memory store, buffer pool, shared read path |
//! | `rowtable-concurrency` | change transactions and row locks |
//! | `rowtable-primitives` | tables and dependent indexes |

pub use rowtable_concurrency::{ChangeTransaction, LockId, RowLockTable, TableChange};
pub use rowtable_core::*;
pub use rowtable_primitives::{DependentIndex, IndexKind, NotUniqueIndex, Table, UniqueIndex};
pub use rowtable_storage::{
    BatchOp, KeyValueStoreBase, MemoryStore, NamespaceId, OrderedStore, PooledBuffer, ReadOptions,
    Scan, StoreCursor, ValueDecoder, WriteBatch,
};
