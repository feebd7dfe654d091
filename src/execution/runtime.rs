use log::{debug, info, warn};

use crate::catalog::{is_registry, Catalog, Registry, TABLES};
use crate::error::{DbError, ExecError, ExecResult};
use crate::execution::plan::EvalPlan;
use crate::execution::predicate::get_where_conjunction;
use crate::execution::result::QueryResult;
use crate::execution::undo::{guarded, Compensation};
use crate::sql::ast::{ColumnDef, Expr, SelectColumns, ShowKind, Statement};
use crate::storage::row::{dict, ColumnType, Value, ValueDict};
use crate::storage::{DbIndex, DbRelation};

/// Execute one parsed statement against `catalog`.
pub fn handle_statement(catalog: &mut Catalog, stmt: Statement) -> ExecResult<QueryResult> {
    debug!("exec: {:?}", stmt);
    let result = match stmt {
        Statement::CreateTable {
            table_name,
            columns,
            if_not_exists,
        } => execute_create_table(catalog, &table_name, &columns, if_not_exists),
        Statement::CreateIndex {
            index_name,
            table_name,
            index_type,
            columns,
        } => execute_create_index(catalog, &index_name, &table_name, &index_type, &columns),
        Statement::DropTable { table_name } => execute_drop_table(catalog, &table_name),
        Statement::DropIndex {
            index_name,
            table_name,
        } => execute_drop_index(catalog, &index_name, &table_name),
        Statement::Show(kind) => execute_show(catalog, &kind),
        Statement::Insert {
            table_name,
            columns,
            values,
        } => execute_insert(catalog, &table_name, columns.as_deref(), &values),
        Statement::Delete {
            table_name,
            selection,
        } => execute_delete(catalog, &table_name, selection.as_ref()),
        Statement::Select {
            columns,
            table_name,
            selection,
        } => execute_select(catalog, &table_name, &columns, selection.as_ref()),
    }?;
    info!("{}", result.message);
    Ok(result)
}

pub fn execute_create_table(
    catalog: &mut Catalog,
    table_name: &str,
    columns: &[ColumnDef],
    if_not_exists: bool,
) -> ExecResult<QueryResult> {
    let mut schema = Vec::with_capacity(columns.len());
    for col in columns {
        match ColumnType::from_str(&col.data_type) {
            Some(ty @ (ColumnType::Integer | ColumnType::Text)) => schema.push((&col.name, ty)),
            _ => return Err(ExecError::UnsupportedType(col.data_type.clone())),
        }
    }
    if if_not_exists && catalog.is_registered(table_name)? {
        return Ok(QueryResult::message(format!("table {} already exists", table_name)));
    }

    guarded(catalog, |catalog, undo| {
        let row = dict([("table_name", Value::from(table_name))]);
        undo.registered(Registry::Tables, catalog.register(Registry::Tables, &row)?);
        for (column_name, ty) in &schema {
            let row = dict([
                ("table_name", Value::from(table_name)),
                ("column_name", Value::from(column_name.as_str())),
                ("data_type", Value::from(ty.as_str())),
            ]);
            undo.registered(Registry::Columns, catalog.register(Registry::Columns, &row)?);
        }
        let table = catalog.get_table(table_name)?;
        if if_not_exists {
            table.create_if_not_exists()?;
        } else {
            table.create()?;
        }
        Ok(QueryResult::message(format!("created {}", table_name)))
    })
}

pub fn execute_create_index(
    catalog: &mut Catalog,
    index_name: &str,
    table_name: &str,
    index_type: &str,
    columns: &[String],
) -> ExecResult<QueryResult> {
    let table_columns = catalog.get_table(table_name)?.column_names().to_vec();
    if let Some(missing) = columns.iter().find(|c| !table_columns.contains(*c)) {
        return Err(ExecError::UnknownIndexColumn {
            column: missing.clone(),
            table: table_name.to_string(),
        });
    }
    if catalog
        .get_index_names(table_name)?
        .iter()
        .any(|name| name == index_name)
    {
        return Err(DbError::Relation(format!(
            "index {} already exists on {}",
            index_name, table_name
        ))
        .into());
    }

    let is_unique = index_type == "BTREE";
    guarded(catalog, |catalog, undo| {
        for (seq, column_name) in columns.iter().enumerate() {
            let row = dict([
                ("table_name", Value::from(table_name)),
                ("index_name", Value::from(index_name)),
                ("seq_in_index", Value::Integer(seq as i32 + 1)),
                ("column_name", Value::from(column_name.as_str())),
                ("index_type", Value::from(index_type)),
                ("is_unique", Value::Boolean(is_unique)),
            ]);
            undo.registered(Registry::Indices, catalog.register(Registry::Indices, &row)?);
        }
        let (index, table) = catalog.get_index_with_table(table_name, index_name)?;
        index.create(table)?;
        Ok(QueryResult::message(format!("created index {}", index_name)))
    })
}

pub fn execute_drop_table(catalog: &mut Catalog, table_name: &str) -> ExecResult<QueryResult> {
    if is_registry(table_name) {
        return Err(ExecError::SchemaTableDrop);
    }
    catalog.get_table(table_name)?;
    let key = dict([("table_name", Value::from(table_name))]);

    for index_name in catalog.get_index_names(table_name)? {
        catalog.get_index(table_name, &index_name)?.drop()?;
    }
    for handle in catalog.registry(Registry::Indices).select(Some(&key))? {
        catalog.unregister(Registry::Indices, handle)?;
    }
    for handle in catalog.registry(Registry::Columns).select(Some(&key))? {
        catalog.unregister(Registry::Columns, handle)?;
    }
    catalog.get_table(table_name)?.drop()?;

    let handles = catalog.registry(Registry::Tables).select(Some(&key))?;
    let (first, rest) = handles
        .split_first()
        .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;
    if !rest.is_empty() {
        warn!("drop: {} has {} rows in {}", table_name, handles.len(), TABLES);
    }
    catalog.unregister(Registry::Tables, *first)?;
    Ok(QueryResult::message(format!("dropped {}", table_name)))
}

pub fn execute_drop_index(
    catalog: &mut Catalog,
    index_name: &str,
    table_name: &str,
) -> ExecResult<QueryResult> {
    catalog.get_index(table_name, index_name)?.drop()?;
    let key = dict([
        ("table_name", Value::from(table_name)),
        ("index_name", Value::from(index_name)),
    ]);
    for handle in catalog.registry(Registry::Indices).select(Some(&key))? {
        catalog.unregister(Registry::Indices, handle)?;
    }
    Ok(QueryResult::message(format!("dropped index {}", index_name)))
}

/// Bind a literal to a column of the given type.
fn bind_literal(column: &str, ty: ColumnType, literal: &Expr) -> ExecResult<Value> {
    match (ty, literal) {
        (ColumnType::Integer, Expr::IntLiteral(i)) => Ok(Value::Integer(*i)),
        (ColumnType::Text, Expr::StringLiteral(s)) => Ok(Value::Text(s.clone())),
        _ => Err(ExecError::LiteralMismatch {
            column: column.to_string(),
            expected: ty.as_str(),
        }),
    }
}

pub fn execute_insert(
    catalog: &mut Catalog,
    table_name: &str,
    columns: Option<&[String]>,
    values: &[Expr],
) -> ExecResult<QueryResult> {
    let table = catalog.get_table(table_name)?;
    let names = table.column_names().to_vec();
    let types = table.column_types().to_vec();
    if names.len() != values.len() {
        return Err(ExecError::NullsNotSupported);
    }
    let targets = match columns {
        Some(columns) if columns.len() != values.len() => {
            return Err(ExecError::ColumnCountMismatch {
                columns: columns.len(),
                values: values.len(),
            })
        }
        Some(columns) => columns,
        None => names.as_slice(),
    };

    let mut row = ValueDict::new();
    for (column, literal) in targets.iter().zip(values) {
        if row.contains_key(column) {
            return Err(ExecError::DuplicateColumn(column.clone()));
        }
        let position = names
            .iter()
            .position(|n| n == column)
            .ok_or_else(|| ExecError::UnknownColumn(column.clone()))?;
        row.insert(column.clone(), bind_literal(column, types[position], literal)?);
    }

    let registry = Registry::from_table_name(table_name);
    let index_names = catalog.get_index_names(table_name)?;
    guarded(catalog, |catalog, undo| {
        let handle = match registry {
            Some(which) => {
                let handle = catalog.register(which, &row)?;
                undo.registered(which, handle);
                handle
            }
            None => {
                let handle = catalog.get_table(table_name)?.insert(&row)?;
                undo.record(Compensation::DeleteRow {
                    table_name: table_name.to_string(),
                    handle,
                });
                handle
            }
        };
        for index_name in &index_names {
            let (index, table) = catalog.get_index_with_table(table_name, index_name)?;
            index.insert(table, handle)?;
            undo.record(Compensation::UnindexRow {
                table_name: table_name.to_string(),
                index_name: index_name.clone(),
                handle,
            });
        }
        Ok(QueryResult::message(format!(
            "successfully inserted 1 row into {} and {} indices",
            table_name,
            index_names.len()
        )))
    })
}

/// Scan `table_name`, narrowed by an optional WHERE clause.
fn scan_plan(
    table_name: &str,
    column_names: &[String],
    selection: Option<&Expr>,
) -> ExecResult<EvalPlan> {
    let plan = EvalPlan::table_scan(table_name);
    match selection {
        Some(expr) => Ok(EvalPlan::select(get_where_conjunction(expr, column_names)?, plan)),
        None => Ok(plan),
    }
}

pub fn execute_delete(
    catalog: &mut Catalog,
    table_name: &str,
    selection: Option<&Expr>,
) -> ExecResult<QueryResult> {
    let column_names = catalog.get_table(table_name)?.column_names().to_vec();
    let plan = scan_plan(table_name, &column_names, selection)?.optimize();
    let (_, handles) = plan.pipeline(catalog)?;

    let index_names = catalog.get_index_names(table_name)?;
    for handle in &handles {
        for index_name in &index_names {
            let (index, table) = catalog.get_index_with_table(table_name, index_name)?;
            index.del(table, *handle)?;
        }
    }
    match Registry::from_table_name(table_name) {
        Some(which) => {
            for handle in &handles {
                catalog.unregister(which, *handle)?;
            }
        }
        None => {
            let table = catalog.get_table(table_name)?;
            for handle in &handles {
                table.del(*handle)?;
            }
        }
    }
    Ok(QueryResult::message(format!(
        "successfully deleted {} rows from {} and {} indices",
        handles.len(),
        table_name,
        index_names.len()
    )))
}

pub fn execute_select(
    catalog: &mut Catalog,
    table_name: &str,
    columns: &SelectColumns,
    selection: Option<&Expr>,
) -> ExecResult<QueryResult> {
    let table = catalog.get_table(table_name)?;
    let column_names = table.column_names().to_vec();
    let column_types = table.column_types().to_vec();

    let plan = scan_plan(table_name, &column_names, selection)?;
    let (plan, result_names) = match columns {
        SelectColumns::All => (EvalPlan::project_all(plan), column_names),
        SelectColumns::Named(names) => (EvalPlan::project(names.clone(), plan), names.clone()),
    };
    let rows = plan.optimize().evaluate(catalog)?;
    Ok(QueryResult::with_rows(result_names, column_types, rows))
}

/// Rows of a registry matching `filter`, restricted to `columns`.
fn show_registry(
    catalog: &mut Catalog,
    which: Registry,
    filter: Option<&ValueDict>,
    columns: &[(&str, ColumnType)],
) -> ExecResult<QueryResult> {
    let (names, types): (Vec<String>, Vec<ColumnType>) =
        columns.iter().map(|(n, t)| (n.to_string(), *t)).unzip();
    let registry = catalog.registry(which);
    let mut rows = Vec::new();
    for handle in registry.select(filter)? {
        rows.push(registry.project(handle, Some(names.as_slice()))?);
    }
    Ok(QueryResult::with_rows(names, types, rows))
}

pub fn execute_show(catalog: &mut Catalog, kind: &ShowKind) -> ExecResult<QueryResult> {
    use ColumnType::*;
    match kind {
        ShowKind::Tables => {
            let mut result = show_registry(catalog, Registry::Tables, None, &[("table_name", Text)])?;
            let rows: Vec<ValueDict> = result
                .rows
                .take()
                .unwrap_or_default()
                .into_iter()
                .filter(|row| !row.get("table_name").and_then(Value::as_text).is_some_and(is_registry))
                .collect();
            let names = result.column_names.take().unwrap_or_default();
            let types = result.column_types.take().unwrap_or_default();
            Ok(QueryResult::with_rows(names, types, rows))
        }
        ShowKind::Columns { table_name } => show_registry(
            catalog,
            Registry::Columns,
            Some(&dict([("table_name", Value::from(table_name.as_str()))])),
            &[("table_name", Text), ("column_name", Text), ("data_type", Text)],
        ),
        ShowKind::Index { table_name } => show_registry(
            catalog,
            Registry::Indices,
            Some(&dict([("table_name", Value::from(table_name.as_str()))])),
            &[
                ("table_name", Text),
                ("index_name", Text),
                ("column_name", Text),
                ("seq_in_index", Integer),
                ("index_type", Text),
                ("is_unique", Boolean),
            ],
        ),
    }
}
