//! Deferred change records
//!
//! Tables register one [`TableChange`] per effective mutation. The record
//! is bound to the table's consumer at registration and delivered only if
//! the transaction commits.

use std::sync::Arc;

use rowtable_core::ChangeConsumer;

/// A committed-to-be mutation of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableChange<K, V> {
    /// A row was inserted (`old` is `None`) or overwritten
    AddedOrUpdated {
        /// Primary key
        key: K,
        /// Previous row, if one existed
        old: Option<V>,
        /// New row
        new: V,
    },
    /// An existing row was removed
    Removed {
        /// Primary key
        key: K,
        /// The removed row
        value: V,
    },
}

/// Type-erased change waiting for dispatch.
pub(crate) trait PendingChange {
    fn dispatch(self: Box<Self>);
}

pub(crate) struct BoundChange<K, V> {
    pub(crate) change: TableChange<K, V>,
    pub(crate) consumer: Arc<dyn ChangeConsumer<K, V>>,
}

impl<K, V> PendingChange for BoundChange<K, V> {
    fn dispatch(self: Box<Self>) {
        let BoundChange { change, consumer } = *self;
        match change {
            TableChange::AddedOrUpdated { key, old, new } => {
                consumer.added_or_updated(&key, old.as_ref(), &new)
            }
            TableChange::Removed { key, value } => consumer.removed(&key, &value),
        }
    }
}
