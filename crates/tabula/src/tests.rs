//! Integration tests for the tabula facade.

use crate::{
    record, ColumnDef, DataType, Database, DatabaseConfig, EngineConfig, Param, QueryResult,
    StoreConfig, TableSchema, TabulaError, Value,
};

fn quiet_config() -> DatabaseConfig {
    DatabaseConfig::new().with_store(StoreConfig::default().without_stamping())
}

#[test]
fn test_script_runs_in_order() {
    let mut db = Database::with_config(quiet_config());
    let results = db
        .execute_script(
            "INSERT INTO t (a) VALUES (1), (2), (3);
             UPDATE t SET a = 10 WHERE a = 2;
             DELETE FROM t WHERE a = 1;
             SELECT * FROM t ORDER BY a DESC;",
            &[],
        )
        .unwrap();

    assert_eq!(results.len(), 4);
    assert_eq!(results[0], QueryResult::Count(3));
    assert_eq!(results[1], QueryResult::Count(1));
    assert_eq!(results[2], QueryResult::Count(1));
    assert_eq!(
        results[3],
        QueryResult::Rows(vec![record! { "a" => 10 }, record! { "a" => 3 }])
    );
}

#[test]
fn test_script_stops_at_first_error() {
    let mut db = Database::new();
    let err = db
        .execute_script("INSERT INTO t (a) VALUES (1); SELEC * FROM t; DELETE FROM t", &[])
        .unwrap_err();
    assert!(matches!(err, TabulaError::Query(_)));
    assert_eq!(db.table("t").unwrap().len(), 1);
}

#[test]
fn test_script_keeps_escaped_quotes() {
    let mut db = Database::with_config(quiet_config());
    let results = db
        .execute_script(
            "INSERT INTO t (s) VALUES ('it''s');\n\
             SELECT s FROM t WHERE s = 'it''s';",
            &[],
        )
        .unwrap();

    assert_eq!(results[0], QueryResult::Count(1));
    assert_eq!(
        results[1],
        QueryResult::Rows(vec![record! { "s" => "it's" }])
    );
}

#[test]
fn test_insert_returns_stamped_record() {
    let mut db = Database::new();
    let stored = db.insert("users", record! { "name" => "alice" }).unwrap();
    assert!(stored.contains("id"));
    assert!(stored.contains("created_at"));

    let id = stored.get("id").cloned().unwrap();
    let updated = db
        .update_by_id("users", &[record! { "id" => id, "name" => "alicia" }])
        .unwrap();
    assert_eq!(updated, 1);
    assert_eq!(
        db.query("SELECT name FROM users", &[]).unwrap(),
        vec![record! { "name" => "alicia" }]
    );
}

#[test]
fn test_schema_violation_surfaces() {
    let mut db = Database::new();
    db.create_table(
        "users",
        Some(TableSchema::new(vec![
            ColumnDef::new("name", DataType::Text).not_null()
        ])),
    )
    .unwrap();

    let err = db
        .execute("INSERT INTO users (age) VALUES (3)", &[])
        .unwrap_err();
    assert!(err.is_schema_violation());
    assert!(db.table("users").unwrap().is_empty());
}

#[test]
fn test_table_lifecycle() {
    let mut db = Database::new();
    db.create_table("a", None).unwrap();
    db.create_table("b", None).unwrap();
    assert!(matches!(
        db.create_table("a", None),
        Err(TabulaError::Store(_))
    ));
    db.drop_table("a").unwrap();
    assert_eq!(db.table_names(), vec!["b".to_string()]);
}

#[test]
fn test_auto_create_can_be_disabled() {
    let config = DatabaseConfig::new().with_store(StoreConfig::default().without_auto_create());
    let mut db = Database::with_config(config);
    assert!(db.execute("INSERT INTO t (a) VALUES (1)", &[]).is_err());
}

#[test]
fn test_prepared_statement_runs_repeatedly() {
    let mut db = Database::with_config(
        quiet_config().with_engine(EngineConfig::default().with_subquery_cache(false)),
    );
    let insert = db
        .prepare("INSERT INTO t ?", &[Param::from(record! { "n" => 1 })])
        .unwrap();
    db.run(&insert).unwrap();
    db.run(&insert).unwrap();

    let rows = db.query("SELECT COUNT(*) AS n FROM t", &[]).unwrap();
    assert_eq!(rows, vec![record! { "n" => 2 }]);
}

#[test]
fn test_text_parameter_is_quoted() {
    let mut db = Database::with_config(quiet_config());
    db.execute("INSERT INTO t (s) VALUES ('x OR 1 = 1')", &[]).unwrap();
    db.execute("INSERT INTO t (s) VALUES ('y')", &[]).unwrap();

    let rows = db
        .query("SELECT * FROM t WHERE s = ?", &[Param::from("x OR 1 = 1")])
        .unwrap();
    assert_eq!(rows, vec![record! { "s" => "x OR 1 = 1" }]);
    assert_eq!(rows[0].get("s"), Some(&Value::from("x OR 1 = 1")));
}
