//! Transactions spanning several tables of one store.

use std::sync::Arc;

use rowtable::{ChangeTransaction, OrderedStore};

use crate::common::*;

fn table_in(
    store: &Arc<MemoryStore>,
    name: &str,
    log: &Arc<ChangeLog>,
) -> Table<u64, Student> {
    let mut table = Table::new(
        store.clone(),
        |s: &Student| s.id,
        Arc::new(U64BeCodec),
        Arc::new(BincodeCodec::<Student>::new()),
        TableOptions::new()
            .with_namespace(name)
            .enable_concurrent_changes_within_row()
            .with_change_consumer(log.clone()),
    )
    .unwrap();
    table
        .create_unique_index(
            |s: &Student| s.passport_id.clone(),
            Arc::new(Utf8Codec),
            IndexOptions::new().with_namespace(format!("{}_by_passport", name)),
        )
        .unwrap();
    table
}

#[test]
fn test_move_row_between_tables() {
    let store = Arc::new(MemoryStore::new());
    let active_log = Arc::new(ChangeLog::default());
    let archive_log = Arc::new(ChangeLog::default());
    let active = table_in(&store, "active", &active_log);
    let archive = table_in(&store, "archive", &archive_log);

    active.put(student(1, "Ann", "A1")).unwrap();

    let shared: Arc<dyn OrderedStore> = store.clone();
    let mut tx = ChangeTransaction::new(shared);
    let row = active.get_by_key(&1).unwrap().unwrap();
    active.remove_in(&1, &mut tx).unwrap();
    archive.put_in(row, &mut tx).unwrap();
    assert_eq!(tx.pending_change_count(), 2);
    tx.commit().unwrap();

    assert_eq!(active.get_by_key(&1).unwrap(), None);
    assert_eq!(archive.get_by_key(&1).unwrap(), Some(student(1, "Ann", "A1")));
    assert_eq!(active_log.lines(), vec!["upsert 1 - -> Ann", "remove 1 Ann"]);
    assert_eq!(archive_log.lines(), vec!["upsert 1 - -> Ann"]);
}

#[test]
fn test_dropped_transaction_touches_no_table() {
    let store = Arc::new(MemoryStore::new());
    let log = Arc::new(ChangeLog::default());
    let a = table_in(&store, "a", &log);
    let b = table_in(&store, "b", &log);

    {
        let mut tx = a.begin();
        a.put_in(student(1, "Ann", "A1"), &mut tx).unwrap();
        b.put_in(student(2, "Bob", "B2"), &mut tx).unwrap();
        assert_eq!(tx.taken_lock_count(), 2);
    }

    assert!(store.is_empty(a.namespace()));
    assert!(store.is_empty(b.namespace()));
    assert!(log.lines().is_empty());

    // locks were released with the transaction
    a.put(student(1, "Ann", "A1")).unwrap();
    b.put(student(2, "Bob", "B2")).unwrap();
    assert_eq!(log.lines().len(), 2);
}

#[test]
fn test_reentrant_locks_in_one_transaction() {
    let store = Arc::new(MemoryStore::new());
    let log = Arc::new(ChangeLog::default());
    let mut table = Table::new(
        store.clone(),
        |s: &Student| s.id,
        Arc::new(U64BeCodec),
        Arc::new(BincodeCodec::<Student>::new()),
        TableOptions::new()
            .enable_concurrent_changes_within_row()
            .with_lock_count(1)
            .with_change_consumer(log.clone()),
    )
    .unwrap();
    table
        .create_not_unique_index(|s: &Student| s.name.clone(), Arc::new(Utf8Codec), IndexOptions::new())
        .unwrap();

    let mut tx = table.begin();
    for id in 0..5 {
        table.put_in(student(id, "Ann", "A"), &mut tx).unwrap();
    }
    table.remove_in(&9, &mut tx).unwrap();
    assert_eq!(tx.taken_lock_count(), 1);
    tx.commit().unwrap();

    assert_eq!(log.lines().len(), 5);
    assert_eq!(table.all_keys().unwrap().count(), 5);
}
