use stratadb::catalog::Catalog;
use stratadb::error::{ExecError, ExecResult};
use stratadb::execution::predicate::PredicateError;
use stratadb::execution::{handle_statement, QueryResult};
use stratadb::sql::ast::BinaryOperator;
use stratadb::sql::parse_statement;
use stratadb::storage::row::{dict, Value};
use tempfile::TempDir;

fn setup_catalog() -> (TempDir, Catalog) {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = Catalog::open(dir.path()).unwrap();
    for sql in [
        "CREATE TABLE foo (id INT, name TEXT)",
        "INSERT INTO foo VALUES (1, 'a')",
        "INSERT INTO foo VALUES (2, 'b')",
        "INSERT INTO foo VALUES (3, 'a')",
        "CREATE INDEX ix ON foo (id)",
        "CREATE INDEX nx ON foo USING HASH (name)",
    ] {
        run(&mut catalog, sql).unwrap();
    }
    (dir, catalog)
}

fn run(catalog: &mut Catalog, sql: &str) -> ExecResult<QueryResult> {
    handle_statement(catalog, parse_statement(sql).unwrap())
}

fn count(catalog: &mut Catalog) -> usize {
    run(catalog, "SELECT * FROM foo").unwrap().row_count()
}

#[test]
fn delete_where_removes_matching_rows_and_entries() {
    let (_dir, mut catalog) = setup_catalog();
    let result = run(&mut catalog, "DELETE FROM foo WHERE name = 'a'").unwrap();
    assert_eq!(result.message, "successfully deleted 2 rows from foo and 2 indices");

    let rows = run(&mut catalog, "SELECT * FROM foo").unwrap().rows.unwrap();
    assert_eq!(rows, vec![dict([("id", Value::from(2)), ("name", Value::from("b"))])]);

    let nx = catalog.get_index("foo", "nx").unwrap();
    assert!(nx.lookup(&[Value::from("a")]).is_empty());
    assert_eq!(nx.lookup(&[Value::from("b")]).len(), 1);
    let ix = catalog.get_index("foo", "ix").unwrap();
    assert_eq!(ix.len(), 1);
    assert_eq!(ix.lookup(&[Value::from(2)]).len(), 1);
}

#[test]
fn conjunction_narrows_the_delete() {
    let (_dir, mut catalog) = setup_catalog();
    let result = run(&mut catalog, "DELETE FROM foo WHERE name = 'a' AND id = 3").unwrap();
    assert_eq!(result.message, "successfully deleted 1 rows from foo and 2 indices");
    assert_eq!(count(&mut catalog), 2);
    assert_eq!(catalog.get_index("foo", "nx").unwrap().lookup(&[Value::from("a")]).len(), 1);
}

#[test]
fn delete_without_where_empties_table_and_indices() {
    let (_dir, mut catalog) = setup_catalog();
    let result = run(&mut catalog, "DELETE FROM foo").unwrap();
    assert_eq!(result.message, "successfully deleted 3 rows from foo and 2 indices");
    assert_eq!(count(&mut catalog), 0);
    assert!(catalog.get_index("foo", "ix").unwrap().is_empty());
    assert!(catalog.get_index("foo", "nx").unwrap().is_empty());
}

#[test]
fn no_match_deletes_nothing() {
    let (_dir, mut catalog) = setup_catalog();
    let result = run(&mut catalog, "DELETE FROM foo WHERE id = 42").unwrap();
    assert_eq!(result.message, "successfully deleted 0 rows from foo and 2 indices");
    assert_eq!(count(&mut catalog), 3);
}

#[test]
fn unsupported_where_clauses_delete_nothing() {
    let (_dir, mut catalog) = setup_catalog();
    let cases = [
        ("id < 2", PredicateError::UnsupportedOperator(BinaryOperator::Lt)),
        ("id = 1 OR id = 2", PredicateError::UnsupportedConjunction),
        ("age = 1", PredicateError::UnknownColumn("age".into())),
        ("id = name", PredicateError::UnsupportedLiteral),
    ];
    for (clause, expected) in cases {
        match run(&mut catalog, &format!("DELETE FROM foo WHERE {}", clause)) {
            Err(ExecError::Predicate(e)) => assert_eq!(e, expected, "{clause}"),
            other => panic!("{clause}: expected a predicate error, got {:?}", other),
        }
    }
    assert_eq!(count(&mut catalog), 3);
}

#[test]
fn deleted_rows_can_be_reinserted() {
    let (_dir, mut catalog) = setup_catalog();
    run(&mut catalog, "DELETE FROM foo WHERE id = 1").unwrap();
    run(&mut catalog, "INSERT INTO foo VALUES (1, 'z')").unwrap();
    let rows = run(&mut catalog, "SELECT name FROM foo WHERE id = 1").unwrap().rows.unwrap();
    assert_eq!(rows, vec![dict([("name", Value::from("z"))])]);
}

#[test]
fn deleting_a_registry_row_forgets_the_relation() {
    let (_dir, mut catalog) = setup_catalog();
    assert_eq!(count(&mut catalog), 3);
    let result = run(&mut catalog, "DELETE FROM _tables WHERE table_name = 'foo'").unwrap();
    assert_eq!(result.message, "successfully deleted 1 rows from _tables and 0 indices");
    assert!(matches!(run(&mut catalog, "SELECT * FROM foo"), Err(ExecError::Relation(_))));
}
