//! Primitives layer for rowtable
//!
//! Provides the typed structures built on the storage and concurrency
//! layers:
//! - **Table**: primary entity store with implicit or explicit transactions
//! - **UniqueIndex**: one entry per distinct index key
//! - **NotUniqueIndex**: one entry per (index key, primary key) pair
//!
//! ## Consistency
//!
//! Indexes are owned by their table and only change through it. Every
//! table mutation feeds all registered indexes inside the same
//! [`ChangeTransaction`](rowtable_concurrency::ChangeTransaction), so the
//! row and its index entries commit or vanish together.
//!
//! ```rust,ignore
//! let mut tx = students.begin();
//! students.put_in(alice, &mut tx)?;
//! students.remove_in(&bob_id, &mut tx)?;
//! tx.commit()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod table;

pub use index::{DependentIndex, IndexKind, NotUniqueIndex, UniqueIndex};
pub use table::Table;
