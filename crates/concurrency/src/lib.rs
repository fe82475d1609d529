//! Concurrency layer for rowtable
//!
//! This crate implements the write side shared by tables and indexes:
//! - ChangeTransaction: atomic batch + deferred change dispatch + held row locks
//! - TableChange: deferred notification bound to a change consumer
//! - RowLockTable: fixed array of mutexes bucketed by key hash
//!
//! # Commit protocol
//!
//! ```text
//! 1. write the accumulated batch atomically       (failure: drop changes, go to 3)
//! 2. dispatch changes in registration order       (row locks still held)
//! 3. release every row lock held by the transaction
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod change;
pub mod lock;
pub mod transaction;

pub use change::TableChange;
pub use lock::{LockId, RowLockTable};
pub use transaction::ChangeTransaction;
