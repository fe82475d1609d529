//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub use rowtable::{
    BincodeCodec, ChangeConsumer, IndexOptions, MemoryStore, NotUniqueIndex, Result, Table,
    TableOptions, U64BeCodec, UniqueIndex, Utf8Codec, ValueStoreMode,
};

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Student {
    pub id: u64,
    pub name: String,
    pub passport_id: String,
}

pub fn student(id: u64, name: &str, passport_id: &str) -> Student {
    Student {
        id,
        name: name.to_string(),
        passport_id: passport_id.to_string(),
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub struct Students {
    pub store: Arc<MemoryStore>,
    pub table: Table<u64, Student>,
    pub by_name: NotUniqueIndex<String, Student>,
    pub by_passport: UniqueIndex<String, Student>,
}

/// Student table with a not-unique name index and a unique passport index
pub fn students(
    options: TableOptions<u64, Student>,
    name_options: IndexOptions,
    passport_options: IndexOptions,
) -> Students {
    let store = Arc::new(MemoryStore::new());
    let mut table = Table::new(
        store.clone(),
        |s: &Student| s.id,
        Arc::new(U64BeCodec),
        Arc::new(BincodeCodec::<Student>::new()),
        options,
    )
    .unwrap();
    let by_name = table
        .create_not_unique_index(|s: &Student| s.name.clone(), Arc::new(Utf8Codec), name_options)
        .unwrap();
    let by_passport = table
        .create_unique_index(
            |s: &Student| s.passport_id.clone(),
            Arc::new(Utf8Codec),
            passport_options,
        )
        .unwrap();
    Students {
        store,
        table,
        by_name,
        by_passport,
    }
}

/// Collect a scan, sorted
pub fn sorted<T: Ord>(items: impl Iterator<Item = Result<T>>) -> Vec<T> {
    let mut items = items.collect::<Result<Vec<_>>>().unwrap();
    items.sort();
    items
}

// ============================================================================
// Change log
// ============================================================================

/// Consumer that records a line per notification
#[derive(Default)]
pub struct ChangeLog(Mutex<Vec<String>>);

impl ChangeLog {
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

impl ChangeConsumer<u64, Student> for ChangeLog {
    fn added_or_updated(&self, key: &u64, old: Option<&Student>, new: &Student) {
        let old = old.map_or("-".to_string(), |s| s.name.clone());
        self.0
            .lock()
            .push(format!("upsert {} {} -> {}", key, old, new.name));
    }

    fn removed(&self, key: &u64, value: &Student) {
        self.0.lock().push(format!("remove {} {}", key, value.name));
    }
}
