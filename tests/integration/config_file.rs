//! Tables built from TOML configuration files.

use std::fs;

use rowtable::TableConfig;
use tempfile::TempDir;

use crate::common::*;

#[test]
fn test_default_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("students.toml");

    TableConfig::write_default_if_missing(&path).unwrap();
    let config = TableConfig::from_file(&path).unwrap();
    assert_eq!(config, TableConfig::default());

    let options = TableOptions::<u64, Student>::from_config(&config).unwrap();
    assert_eq!(options.lock_count(), rowtable::DEFAULT_LOCK_COUNT);
    assert!(!options.concurrent_changes_within_row());
}

#[test]
fn test_existing_file_is_kept() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("students.toml");
    fs::write(&path, "namespace = \"mine\"\n").unwrap();

    TableConfig::write_default_if_missing(&path).unwrap();
    let config = TableConfig::from_file(&path).unwrap();
    assert_eq!(config.namespace.as_deref(), Some("mine"));
}

#[test]
fn test_table_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("students.toml");
    fs::write(
        &path,
        r#"
namespace = "students"
enable_concurrent_changes_within_row = true
lock_count = 4

[write]
sync = true

[indexes.by_name]
namespace = "students_by_name"
value_store_mode = "reference"

[indexes.by_passport]
namespace = "students_by_passport"
"#,
    )
    .unwrap();

    let config = TableConfig::from_file(&path).unwrap();
    let s = students(
        TableOptions::from_config(&config).unwrap(),
        IndexOptions::from_config(config.index("by_name").unwrap()).unwrap(),
        IndexOptions::from_config(config.index("by_passport").unwrap()).unwrap(),
    );

    assert_eq!(s.table.lock_count_in_use(), 4);
    assert_eq!(s.store.namespace("students_by_name"), Some(s.by_name.namespace()));
    assert_eq!(
        s.store.namespace("students_by_passport"),
        Some(s.by_passport.namespace())
    );
    assert_eq!(s.by_name.value_store_mode(), ValueStoreMode::Reference);
    assert_eq!(s.by_passport.value_store_mode(), ValueStoreMode::FullValue);

    s.table.put(student(1, "Ann", "A1")).unwrap();
    assert_eq!(
        s.store.dump(s.by_name.namespace())[0].1,
        1u64.to_be_bytes().to_vec()
    );
}

#[test]
fn test_invalid_lock_count_in_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("students.toml");
    fs::write(
        &path,
        "enable_concurrent_changes_within_row = true\nlock_count = 0\n",
    )
    .unwrap();

    let err = TableConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, rowtable::Error::InvalidConfiguration(_)));
}

#[test]
fn test_invalid_lock_count_in_built_config() {
    let config = TableConfig {
        enable_concurrent_changes_within_row: true,
        lock_count: 0,
        ..TableConfig::default()
    };
    let err = TableOptions::<u64, Student>::from_config(&config).unwrap_err();
    assert!(matches!(err, rowtable::Error::InvalidConfiguration(_)));
}
