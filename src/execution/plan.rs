use log::debug;

use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::storage::row::ValueDict;
use crate::storage::{DbRelation, Handle};

/// A tree of relational operators over one table.
///
/// `TableScan` and `Select` produce handles through [`EvalPlan::pipeline`];
/// `ProjectAll` and `Project` sit at the root and turn them into rows
/// through [`EvalPlan::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub enum EvalPlan {
    TableScan(String),
    Select {
        conditions: ValueDict,
        child: Box<EvalPlan>,
    },
    ProjectAll(Box<EvalPlan>),
    Project {
        columns: Vec<String>,
        child: Box<EvalPlan>,
    },
}

impl EvalPlan {
    pub fn table_scan(table_name: &str) -> Self {
        EvalPlan::TableScan(table_name.to_string())
    }

    pub fn select(conditions: ValueDict, child: EvalPlan) -> Self {
        EvalPlan::Select {
            conditions,
            child: Box::new(child),
        }
    }

    pub fn project_all(child: EvalPlan) -> Self {
        EvalPlan::ProjectAll(Box::new(child))
    }

    pub fn project(columns: Vec<String>, child: EvalPlan) -> Self {
        EvalPlan::Project {
            columns,
            child: Box::new(child),
        }
    }

    /// Fold stacked selections into one. Conditions of the outer selection
    /// override the inner one on the same column.
    pub fn optimize(self) -> EvalPlan {
        match self {
            EvalPlan::TableScan(table_name) => EvalPlan::TableScan(table_name),
            EvalPlan::Select { conditions, child } => match child.optimize() {
                EvalPlan::Select {
                    conditions: mut inner,
                    child: grandchild,
                } => {
                    inner.extend(conditions);
                    EvalPlan::Select {
                        conditions: inner,
                        child: grandchild,
                    }
                }
                other => EvalPlan::select(conditions, other),
            },
            EvalPlan::ProjectAll(child) => EvalPlan::project_all(child.optimize()),
            EvalPlan::Project { columns, child } => EvalPlan::project(columns, child.optimize()),
        }
    }

    /// Run a scan/selection plan, returning the table it read and the
    /// handles of the qualifying rows.
    pub fn pipeline(&self, catalog: &mut Catalog) -> DbResult<(String, Vec<Handle>)> {
        match self {
            EvalPlan::TableScan(table_name) => {
                let handles = catalog.get_table(table_name)?.select(None)?;
                Ok((table_name.clone(), handles))
            }
            EvalPlan::Select { conditions, child } => match child.as_ref() {
                EvalPlan::TableScan(table_name) => {
                    let handles = catalog.get_table(table_name)?.select(Some(conditions))?;
                    debug!("plan: selected {} rows of {}", handles.len(), table_name);
                    Ok((table_name.clone(), handles))
                }
                other => {
                    let (table_name, handles) = other.pipeline(catalog)?;
                    let table = catalog.get_table(&table_name)?;
                    let mut kept = Vec::with_capacity(handles.len());
                    for handle in handles {
                        let row = table.project(handle, None)?;
                        if conditions.iter().all(|(k, v)| row.get(k) == Some(v)) {
                            kept.push(handle);
                        }
                    }
                    Ok((table_name, kept))
                }
            },
            EvalPlan::ProjectAll(_) | EvalPlan::Project { .. } => Err(DbError::Relation(
                "a projection cannot be pipelined".into(),
            )),
        }
    }

    /// Run a plan rooted at a projection and return its rows.
    pub fn evaluate(&self, catalog: &mut Catalog) -> DbResult<Vec<ValueDict>> {
        let (child, columns) = match self {
            EvalPlan::ProjectAll(child) => (child, None),
            EvalPlan::Project { columns, child } => (child, Some(columns.as_slice())),
            _ => {
                return Err(DbError::Relation(
                    "only a projection can be evaluated".into(),
                ))
            }
        };
        let (table_name, handles) = child.pipeline(catalog)?;
        let table = catalog.get_table(&table_name)?;
        handles
            .into_iter()
            .map(|handle| table.project(handle, columns))
            .collect()
    }
}
