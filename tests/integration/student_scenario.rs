//! The Student scenario from end to end.

use crate::common::*;

fn run(mode: ValueStoreMode) {
    let log = std::sync::Arc::new(ChangeLog::default());
    let s = students(
        TableOptions::new()
            .enable_concurrent_changes_within_row()
            .with_change_consumer(log.clone()),
        IndexOptions::new().with_value_store_mode(mode),
        IndexOptions::new().with_value_store_mode(mode),
    );

    s.table.put(student(100, "John Doe", "P1")).unwrap();
    s.table.put(student(200, "John Doe", "P2")).unwrap();

    assert_eq!(
        sorted(s.by_name.all_values_by_key(&"John Doe".to_string()).unwrap()),
        vec![student(100, "John Doe", "P1"), student(200, "John Doe", "P2")]
    );
    assert_eq!(
        s.by_passport.get_by_key(&"P2".to_string()).unwrap(),
        Some(student(200, "John Doe", "P2"))
    );

    s.table.put(student(100, "Jane Doe", "P1")).unwrap();

    assert_eq!(
        sorted(s.by_name.all_values_by_key(&"John Doe".to_string()).unwrap()),
        vec![student(200, "John Doe", "P2")]
    );
    assert_eq!(
        sorted(s.by_name.all_values_by_key(&"Jane Doe".to_string()).unwrap()),
        vec![student(100, "Jane Doe", "P1")]
    );

    assert_eq!(
        log.lines(),
        vec![
            "upsert 100 - -> John Doe",
            "upsert 200 - -> John Doe",
            "upsert 100 John Doe -> Jane Doe",
        ]
    );
}

#[test]
fn test_student_scenario_full_value() {
    run(ValueStoreMode::FullValue);
}

#[test]
fn test_student_scenario_reference() {
    run(ValueStoreMode::Reference);
}

#[test]
fn test_mixed_modes_share_one_table() {
    let s = students(
        TableOptions::new(),
        IndexOptions::new().with_value_store_mode(ValueStoreMode::Reference),
        IndexOptions::new(),
    );
    s.table.put(student(1, "Ann", "A1")).unwrap();
    s.table.put(student(1, "Ann", "A1-renewed")).unwrap();

    // name unchanged: the reference entry is untouched and still resolves
    assert_eq!(s.store.len(s.by_name.namespace()), 1);
    assert_eq!(
        sorted(s.by_name.all_values_by_key(&"Ann".to_string()).unwrap()),
        vec![student(1, "Ann", "A1-renewed")]
    );
    assert!(!s.by_passport.has_exact_key(&"A1".to_string()).unwrap());
    assert!(s.by_passport.has_exact_key(&"A1-renewed".to_string()).unwrap());
}
