use stratadb::catalog::Catalog;
use stratadb::error::{ExecError, ExecResult};
use stratadb::execution::{handle_statement, QueryResult};
use stratadb::sql::parse_statement;
use stratadb::storage::row::{dict, Value};
use tempfile::TempDir;

fn setup_catalog() -> (TempDir, Catalog) {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = Catalog::open(dir.path()).unwrap();
    run(&mut catalog, "CREATE TABLE foo (id INT, name TEXT)").unwrap();
    (dir, catalog)
}

fn run(catalog: &mut Catalog, sql: &str) -> ExecResult<QueryResult> {
    handle_statement(catalog, parse_statement(sql).unwrap())
}

fn all_rows(catalog: &mut Catalog) -> Vec<stratadb::storage::row::ValueDict> {
    run(catalog, "SELECT * FROM foo").unwrap().rows.unwrap()
}

#[test]
fn positional_and_named_values() {
    let (_dir, mut catalog) = setup_catalog();
    let result = run(&mut catalog, "INSERT INTO foo VALUES (1, 'a')").unwrap();
    assert_eq!(result.message, "successfully inserted 1 row into foo and 0 indices");
    assert!(result.rows.is_none());
    run(&mut catalog, "INSERT INTO foo (name, id) VALUES ('b', 2)").unwrap();

    assert_eq!(
        all_rows(&mut catalog),
        vec![
            dict([("id", Value::from(1)), ("name", Value::from("a"))]),
            dict([("id", Value::from(2)), ("name", Value::from("b"))]),
        ]
    );
}

#[test]
fn missing_values_are_not_supported() {
    let (_dir, mut catalog) = setup_catalog();
    let err = run(&mut catalog, "INSERT INTO foo VALUES (1)").unwrap_err();
    assert!(matches!(err, ExecError::NullsNotSupported));
    assert_eq!(
        err.to_string(),
        "DbRelationError: don't know how to handle NULLs, defaults, etc. yet"
    );
    assert!(run(&mut catalog, "INSERT INTO foo (id) VALUES (1)").is_err());
    assert!(all_rows(&mut catalog).is_empty());
}

#[test]
fn column_list_must_match_values() {
    let (_dir, mut catalog) = setup_catalog();
    let err = run(&mut catalog, "INSERT INTO foo (id) VALUES (1, 'a')").unwrap_err();
    assert!(matches!(err, ExecError::ColumnCountMismatch { columns: 1, values: 2 }));
}

#[test]
fn unknown_column_is_rejected() {
    let (_dir, mut catalog) = setup_catalog();
    match run(&mut catalog, "INSERT INTO foo (id, nope) VALUES (1, 'a')") {
        Err(ExecError::UnknownColumn(name)) => assert_eq!(name, "nope"),
        other => panic!("expected an unknown column error, got {:?}", other),
    }
    assert!(all_rows(&mut catalog).is_empty());
}

#[test]
fn literal_must_match_column_type() {
    let (_dir, mut catalog) = setup_catalog();
    for sql in [
        "INSERT INTO foo VALUES ('1', 'a')",
        "INSERT INTO foo VALUES (1, 2)",
        "INSERT INTO foo VALUES (1.5, 'a')",
    ] {
        assert!(
            matches!(run(&mut catalog, sql), Err(ExecError::LiteralMismatch { .. })),
            "{sql}"
        );
    }
    assert!(all_rows(&mut catalog).is_empty());
}

#[test]
fn missing_table_fails() {
    let (_dir, mut catalog) = setup_catalog();
    let err = run(&mut catalog, "INSERT INTO bar VALUES (1)").unwrap_err();
    assert!(err.to_string().starts_with("DbRelationError: "));
}

#[test]
fn every_index_gains_an_entry() {
    let (_dir, mut catalog) = setup_catalog();
    run(&mut catalog, "CREATE INDEX fx ON foo (id)").unwrap();
    run(&mut catalog, "CREATE INDEX nx ON foo USING HASH (name)").unwrap();

    let result = run(&mut catalog, "INSERT INTO foo VALUES (7, 'x')").unwrap();
    assert_eq!(result.message, "successfully inserted 1 row into foo and 2 indices");
    run(&mut catalog, "INSERT INTO foo VALUES (8, 'x')").unwrap();

    let fx = catalog.get_index("foo", "fx").unwrap();
    assert_eq!(fx.len(), 2);
    assert_eq!(fx.lookup(&[Value::from(7)]).len(), 1);
    let nx = catalog.get_index("foo", "nx").unwrap();
    assert_eq!(nx.lookup(&[Value::from("x")]).len(), 2);
}

#[test]
fn repeated_column_is_rejected() {
    let (_dir, mut catalog) = setup_catalog();
    match run(&mut catalog, "INSERT INTO foo (id, id) VALUES (1, 2)") {
        Err(ExecError::DuplicateColumn(name)) => assert_eq!(name, "id"),
        other => panic!("expected a duplicate column error, got {:?}", other),
    }
    assert!(all_rows(&mut catalog).is_empty());
}

#[test]
fn registry_inserts_are_checked_by_the_catalog() {
    let (_dir, mut catalog) = setup_catalog();
    let err = run(&mut catalog, "INSERT INTO _tables VALUES ('foo')").unwrap_err();
    assert_eq!(err.to_string(), "DbRelationError: table foo already exists");
    let err = run(&mut catalog, "INSERT INTO _columns VALUES ('foo', 'age', 'DOUBLE')").unwrap_err();
    assert_eq!(err.to_string(), "DbRelationError: unknown data type DOUBLE");
    assert!(run(&mut catalog, "INSERT INTO _columns VALUES ('foo', 'id', 'INT')").is_err());

    let count = |catalog: &mut Catalog, registry: &str| {
        run(catalog, &format!("SELECT * FROM {} WHERE table_name = 'foo'", registry))
            .unwrap()
            .row_count()
    };
    assert_eq!(count(&mut catalog, "_tables"), 1);
    assert_eq!(count(&mut catalog, "_columns"), 2);

    // no ghost row survives the drop, so the name is free again
    run(&mut catalog, "DROP TABLE foo").unwrap();
    assert_eq!(count(&mut catalog, "_tables"), 0);
    assert_eq!(run(&mut catalog, "SHOW TABLES").unwrap().row_count(), 0);
    run(&mut catalog, "CREATE TABLE foo (id INT)").unwrap();

    let result = run(&mut catalog, "INSERT INTO _tables VALUES ('bar')").unwrap();
    assert_eq!(result.message, "successfully inserted 1 row into _tables and 0 indices");
    assert_eq!(run(&mut catalog, "SHOW TABLES").unwrap().row_count(), 2);
}
