use std::fs;

use stratadb::catalog::{Catalog, Registry};
use stratadb::error::{ExecError, ExecResult};
use stratadb::execution::{handle_statement, QueryResult};
use stratadb::sql::parse_statement;
use stratadb::storage::row::{dict, ColumnType, Value};
use stratadb::storage::DbRelation;
use tempfile::TempDir;

fn setup_catalog() -> (TempDir, Catalog) {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::open(dir.path()).unwrap();
    (dir, catalog)
}

fn run(catalog: &mut Catalog, sql: &str) -> ExecResult<QueryResult> {
    handle_statement(catalog, parse_statement(sql).unwrap())
}

fn registry_rows(catalog: &mut Catalog, which: Registry, table_name: &str) -> usize {
    let key = dict([("table_name", Value::from(table_name))]);
    catalog.registry(which).select(Some(&key)).unwrap().len()
}

#[test]
fn create_registers_table_and_columns() {
    let (dir, mut catalog) = setup_catalog();
    let result = run(&mut catalog, "CREATE TABLE foo (id INT, name TEXT)").unwrap();
    assert_eq!(result.message, "created foo");
    assert!(result.rows.is_none());

    assert_eq!(registry_rows(&mut catalog, Registry::Tables, "foo"), 1);
    assert_eq!(registry_rows(&mut catalog, Registry::Columns, "foo"), 2);
    assert!(dir.path().join("foo.db").exists());

    let (names, types) = catalog.get_columns("foo").unwrap();
    assert_eq!(names, ["id", "name"]);
    assert_eq!(types, [ColumnType::Integer, ColumnType::Text]);
    assert!(catalog.get_table("foo").unwrap().select(None).unwrap().is_empty());
}

#[test]
fn integer_is_an_alias_for_int() {
    let (_dir, mut catalog) = setup_catalog();
    run(&mut catalog, "CREATE TABLE foo (id INTEGER)").unwrap();
    let key = dict([("table_name", Value::from("foo"))]);
    let columns = catalog.registry(Registry::Columns);
    let handle = columns.select(Some(&key)).unwrap()[0];
    assert_eq!(columns.project(handle, None).unwrap()["data_type"], Value::from("INT"));
}

#[test]
fn unsupported_type_touches_nothing() {
    let (dir, mut catalog) = setup_catalog();
    for sql in ["CREATE TABLE foo (id INT, x DOUBLE)", "CREATE TABLE foo (flag BOOLEAN)"] {
        match run(&mut catalog, sql) {
            Err(ExecError::UnsupportedType(_)) => {}
            other => panic!("expected an unsupported type error, got {:?}", other),
        }
    }
    assert_eq!(registry_rows(&mut catalog, Registry::Tables, "foo"), 0);
    assert_eq!(registry_rows(&mut catalog, Registry::Columns, "foo"), 0);
    assert!(!dir.path().join("foo.db").exists());
}

#[test]
fn duplicate_column_rolls_back_both_registries() {
    let (dir, mut catalog) = setup_catalog();
    let err = run(&mut catalog, "CREATE TABLE foo (id INT, name TEXT, id TEXT)").unwrap_err();
    assert!(matches!(err, ExecError::Relation(_)));
    assert_eq!(registry_rows(&mut catalog, Registry::Tables, "foo"), 0);
    assert_eq!(registry_rows(&mut catalog, Registry::Columns, "foo"), 0);
    assert!(!dir.path().join("foo.db").exists());

    run(&mut catalog, "CREATE TABLE foo (id INT)").unwrap();
    assert_eq!(registry_rows(&mut catalog, Registry::Columns, "foo"), 1);
}

#[test]
fn existing_relation_file_rolls_back_both_registries() {
    let (dir, mut catalog) = setup_catalog();
    fs::write(dir.path().join("foo.db"), b"").unwrap();

    assert!(run(&mut catalog, "CREATE TABLE foo (id INT, name TEXT)").is_err());
    assert_eq!(registry_rows(&mut catalog, Registry::Tables, "foo"), 0);
    assert_eq!(registry_rows(&mut catalog, Registry::Columns, "foo"), 0);
    assert!(catalog.get_table("foo").is_err());
}

#[test]
fn second_create_is_rejected_without_side_effects() {
    let (_dir, mut catalog) = setup_catalog();
    run(&mut catalog, "CREATE TABLE foo (id INT, name TEXT)").unwrap();
    run(&mut catalog, "INSERT INTO foo VALUES (1, 'a')").unwrap();

    assert!(run(&mut catalog, "CREATE TABLE foo (id INT, name TEXT)").is_err());
    assert_eq!(registry_rows(&mut catalog, Registry::Tables, "foo"), 1);
    assert_eq!(registry_rows(&mut catalog, Registry::Columns, "foo"), 2);

    let result = run(&mut catalog, "CREATE TABLE IF NOT EXISTS foo (id INT, name TEXT)").unwrap();
    assert_eq!(result.message, "table foo already exists");
    assert_eq!(registry_rows(&mut catalog, Registry::Columns, "foo"), 2);
    assert_eq!(run(&mut catalog, "SELECT * FROM foo").unwrap().row_count(), 1);
}

#[test]
fn if_not_exists_creates_a_missing_table() {
    let (dir, mut catalog) = setup_catalog();
    run(&mut catalog, "CREATE TABLE IF NOT EXISTS foo (id INT)").unwrap();
    assert!(dir.path().join("foo.db").exists());
    assert_eq!(registry_rows(&mut catalog, Registry::Tables, "foo"), 1);
}
