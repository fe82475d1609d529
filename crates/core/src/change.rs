//! Change-notification contract
//!
//! A table configured with a [`ChangeConsumer`] records one deferred change
//! per mutation. The changes are delivered synchronously during
//! `ChangeTransaction::commit`, in registration order, after the batch has
//! been written and before the transaction's row locks are released.
//! Nothing is delivered for a discarded transaction.

/// Receives committed table changes.
///
/// Implementations run while row locks of the committing transaction are
/// held, so they must not start a new blocking transaction on the same
/// rows of the same table.
pub trait ChangeConsumer<K, V>: Send + Sync {
    /// A row was inserted (`old` is `None`) or overwritten.
    fn added_or_updated(&self, key: &K, old: Option<&V>, new: &V);

    /// A row that existed was removed.
    fn removed(&self, key: &K, value: &V);
}
