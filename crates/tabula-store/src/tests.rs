//! Integration tests for tabula-store.

use std::rc::Rc;

use tabula_types::{record, DataType, Value};

use crate::{ColumnDef, MemoryStore, StoreConfig, StoreError, TableSchema, TableStore};

fn users_schema() -> TableSchema {
    TableSchema::new(vec![
        ColumnDef::new("name", DataType::Text).not_null(),
        ColumnDef::new("age", DataType::Number),
    ])
}

// ============================================================================
// Table Lifecycle
// ============================================================================

#[test]
fn test_create_and_drop_table() {
    let mut store = MemoryStore::new();
    store.create_table("users", None).unwrap();
    store.create_table("orders", None).unwrap();

    assert_eq!(store.table_names().collect::<Vec<_>>(), vec!["users", "orders"]);
    assert_eq!(
        store.create_table("users", None),
        Err(StoreError::TableExists("users".to_string()))
    );

    store.drop_table("users").unwrap();
    assert_eq!(store.table_names().collect::<Vec<_>>(), vec!["orders"]);
    assert!(matches!(
        store.drop_table("users"),
        Err(StoreError::TableNotFound(_))
    ));
}

#[test]
fn test_insert_auto_creates_table() {
    let mut store = MemoryStore::new();
    store.insert("events", record! { "kind" => "login" }).unwrap();
    assert_eq!(store.table("events").unwrap().len(), 1);
}

#[test]
fn test_insert_without_auto_create_fails() {
    let mut store = MemoryStore::with_config(StoreConfig::default().without_auto_create());
    let err = store.insert("events", record! { "kind" => "login" }).unwrap_err();
    assert_eq!(err, StoreError::TableNotFound("events".to_string()));
}

#[test]
fn test_missing_table_lookup() {
    let store = MemoryStore::new();
    assert!(matches!(
        store.table("nope"),
        Err(StoreError::TableNotFound(name)) if name == "nope"
    ));
}

// ============================================================================
// Stamping
// ============================================================================

#[test]
fn test_insert_stamps_id_and_created_at() {
    let mut store = MemoryStore::new();
    let row = store.insert("users", record! { "name" => "alice" }).unwrap();
    let row = row.borrow();

    let id = row.get("id").and_then(Value::as_text).unwrap();
    assert_eq!(id.len(), 36);
    let created_at = row.get("created_at").and_then(Value::as_text).unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(created_at).is_ok());
}

#[test]
fn test_insert_keeps_supplied_id() {
    let mut store = MemoryStore::new();
    let row = store
        .insert("users", record! { "id" => 7, "name" => "alice" })
        .unwrap();
    assert_eq!(row.borrow().get("id"), Some(&Value::from(7)));
}

#[test]
fn test_insert_replaces_null_id() {
    let mut store = MemoryStore::new();
    let row = store
        .insert("users", record! { "id" => Value::Null })
        .unwrap();
    assert!(row.borrow().get("id").is_some_and(|id| !id.is_null()));
}

#[test]
fn test_stamping_can_be_disabled() {
    let config = StoreConfig::default().without_stamping();
    let mut store = MemoryStore::with_config(config);
    let row = store.insert("users", record! { "name" => "alice" }).unwrap();
    assert_eq!(*row.borrow(), record! { "name" => "alice" });
}

#[test]
fn test_custom_id_field() {
    let config = StoreConfig::default().with_id_field("uid");
    let mut store = MemoryStore::with_config(config);
    let row = store.insert("users", record! { "name" => "alice" }).unwrap();
    assert!(row.borrow().contains("uid"));
    assert!(!row.borrow().contains("id"));
}

// ============================================================================
// Updates and Deletes
// ============================================================================

#[test]
fn test_update_visible_through_held_row() {
    let mut store = MemoryStore::new();
    let held = store.insert("users", record! { "name" => "alice" }).unwrap();

    let updated = store
        .update_where("users", |r| r.value("name") == &Value::from("alice"), &record! { "age" => 31 })
        .unwrap();

    assert_eq!(updated, 1);
    assert_eq!(held.borrow().get("age"), Some(&Value::from(31)));
}

#[test]
fn test_update_preserves_field_order() {
    let config = StoreConfig::default().without_stamping();
    let mut store = MemoryStore::with_config(config);
    store
        .insert("users", record! { "name" => "alice", "age" => 30 })
        .unwrap();
    store
        .update_where("users", |_| true, &record! { "name" => "bob", "city" => "Oslo" })
        .unwrap();

    let rows = store.table("users").unwrap().records();
    assert_eq!(
        rows[0].field_names().collect::<Vec<_>>(),
        vec!["name", "age", "city"]
    );
}

#[test]
fn test_update_by_id() {
    let mut store = MemoryStore::new();
    store.insert("users", record! { "id" => 1, "name" => "alice" }).unwrap();
    store.insert("users", record! { "id" => 2, "name" => "bob" }).unwrap();

    let updated = store
        .update_by_id(
            "users",
            &[
                record! { "id" => 2, "name" => "robert" },
                record! { "id" => 9, "name" => "ghost" },
                record! { "name" => "no id" },
            ],
        )
        .unwrap();

    assert_eq!(updated, 1);
    let rows = store.table("users").unwrap().records();
    assert_eq!(rows[0].get("name"), Some(&Value::from("alice")));
    assert_eq!(rows[1].get("name"), Some(&Value::from("robert")));
}

#[test]
fn test_delete_where_returns_count() {
    let mut store = MemoryStore::new();
    for age in [10, 20, 30, 40] {
        store.insert("users", record! { "age" => age }).unwrap();
    }

    let deleted = store
        .delete_where("users", |r| r.value("age").to_number() > 15.0)
        .unwrap();

    assert_eq!(deleted, 3);
    assert_eq!(store.table("users").unwrap().len(), 1);
}

#[test]
fn test_snapshot_is_stable_across_deletes() {
    let mut store = MemoryStore::new();
    store.insert("users", record! { "name" => "a" }).unwrap();
    store.insert("users", record! { "name" => "b" }).unwrap();

    let snapshot = store.table("users").unwrap().snapshot();
    store.delete_where("users", |_| true).unwrap();

    assert_eq!(snapshot.len(), 2);
    assert!(store.table("users").unwrap().is_empty());
}

#[test]
fn test_delete_rows_ignores_foreign_rows() {
    let mut store = MemoryStore::new();
    let foreign = store.insert("other", record! { "x" => 1 }).unwrap();
    store.insert("users", record! { "x" => 1 }).unwrap();

    let deleted = store.delete_rows("users", &[Rc::clone(&foreign)]).unwrap();
    assert_eq!(deleted, 0);
    assert_eq!(store.table("users").unwrap().len(), 1);
}

// ============================================================================
// Schema Enforcement
// ============================================================================

#[test]
fn test_schema_rejects_insert() {
    let mut store = MemoryStore::new();
    store.create_table("users", Some(users_schema())).unwrap();

    let err = store
        .insert("users", record! { "name" => "alice", "age" => "old" })
        .unwrap_err();
    assert!(matches!(err, StoreError::SchemaViolation { ref field, .. } if field == "age"));
    assert!(store.table("users").unwrap().is_empty());
}

#[test]
fn test_insert_many_stops_at_first_violation() {
    let mut store = MemoryStore::new();
    store.create_table("users", Some(users_schema())).unwrap();

    let result = store.insert_many(
        "users",
        vec![
            record! { "name" => "alice" },
            record! { "age" => 3 },
            record! { "name" => "carol" },
        ],
    );

    assert!(result.is_err());
    assert_eq!(store.table("users").unwrap().len(), 1);
}

#[test]
fn test_schema_rejects_update_and_keeps_row() {
    let mut store = MemoryStore::new();
    store.create_table("users", Some(users_schema())).unwrap();
    store
        .insert("users", record! { "name" => "alice", "age" => 30 })
        .unwrap();

    let result = store.update_where("users", |_| true, &record! { "age" => true });
    assert!(result.is_err());

    let rows = store.table("users").unwrap().records();
    assert_eq!(rows[0].get("age"), Some(&Value::from(30)));
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn delete_where_partitions_rows(ages in prop::collection::vec(0i64..100, 0..40), cutoff in 0i64..100) {
            let mut store = MemoryStore::new();
            store.create_table("t", None).unwrap();
            for age in &ages {
                store.insert("t", record! { "age" => *age }).unwrap();
            }

            #[allow(clippy::cast_precision_loss)]
            let limit = cutoff as f64;
            let deleted = store
                .delete_where("t", |r| r.value("age").to_number() < limit)
                .unwrap();

            let expected = ages.iter().filter(|age| **age < cutoff).count();
            prop_assert_eq!(deleted, expected);
            prop_assert_eq!(store.table("t").unwrap().len(), ages.len() - expected);
        }

        #[test]
        fn inserted_ids_are_unique(count in 1usize..30) {
            let mut store = MemoryStore::new();
            for _ in 0..count {
                store.insert("t", record! { "n" => 1 }).unwrap();
            }
            let mut ids: Vec<String> = store
                .table("t")
                .unwrap()
                .records()
                .iter()
                .filter_map(|r| r.get("id").and_then(|id| id.as_text().map(str::to_string)))
                .collect();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), count);
        }
    }
}
