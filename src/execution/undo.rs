use log::{debug, warn};

use crate::catalog::{Catalog, Registry};
use crate::error::{DbResult, ExecResult};
use crate::storage::{DbIndex, DbRelation, Handle};

/// Reverses one write made earlier in the statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Compensation {
    /// Remove a row from a catalog registry.
    Unregister { registry: Registry, handle: Handle },
    /// Remove a row from a user relation.
    DeleteRow { table_name: String, handle: Handle },
    /// Remove a row's entry from an index.
    UnindexRow {
        table_name: String,
        index_name: String,
        handle: Handle,
    },
}

impl Compensation {
    fn run(&self, catalog: &mut Catalog) -> DbResult<()> {
        match self {
            Compensation::Unregister { registry, handle } => catalog.unregister(*registry, *handle),
            Compensation::DeleteRow { table_name, handle } => {
                catalog.get_table(table_name)?.del(*handle)
            }
            Compensation::UnindexRow {
                table_name,
                index_name,
                handle,
            } => {
                let (index, table) = catalog.get_index_with_table(table_name, index_name)?;
                index.del(table, *handle)
            }
        }
    }
}

/// Compensations recorded as the steps of a statement succeed.
#[derive(Debug, Default)]
pub struct UndoLog {
    steps: Vec<Compensation>,
}

impl UndoLog {
    pub fn record(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    pub fn registered(&mut self, registry: Registry, handle: Handle) {
        self.record(Compensation::Unregister { registry, handle });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every compensation, newest first. Failures are logged and skipped.
    fn unwind(self, catalog: &mut Catalog) {
        for step in self.steps.into_iter().rev() {
            match step.run(catalog) {
                Ok(()) => debug!("undo: {:?}", step),
                Err(e) => warn!("undo: {:?} failed: {}", step, e),
            }
        }
    }
}

/// Run `body` with a fresh undo log. If it fails, the recorded compensations
/// are unwound before the original error is returned.
pub fn guarded<T>(
    catalog: &mut Catalog,
    body: impl FnOnce(&mut Catalog, &mut UndoLog) -> ExecResult<T>,
) -> ExecResult<T> {
    let mut log = UndoLog::default();
    match body(catalog, &mut log) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("undo: statement failed, unwinding {} steps: {}", log.len(), e);
            log.unwind(catalog);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecError;
    use crate::storage::row::{dict, Value};

    fn table_rows(catalog: &mut Catalog) -> usize {
        catalog.registry(Registry::Tables).select(None).unwrap().len()
    }

    #[test]
    fn failure_unwinds_recorded_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::open(dir.path()).unwrap();
        let before = table_rows(&mut catalog);

        let result: ExecResult<()> = guarded(&mut catalog, |catalog, undo| {
            for name in ["a", "b"] {
                let row = dict([("table_name", Value::from(name))]);
                undo.registered(Registry::Tables, catalog.register(Registry::Tables, &row)?);
            }
            Err(ExecError::SchemaTableDrop)
        });
        assert!(matches!(result, Err(ExecError::SchemaTableDrop)));
        assert_eq!(table_rows(&mut catalog), before);
    }

    #[test]
    fn success_keeps_the_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::open(dir.path()).unwrap();
        let before = table_rows(&mut catalog);
        guarded(&mut catalog, |catalog, undo| {
            let row = dict([("table_name", Value::from("a"))]);
            undo.registered(Registry::Tables, catalog.register(Registry::Tables, &row)?);
            Ok(())
        })
        .unwrap();
        assert_eq!(table_rows(&mut catalog), before + 1);
    }

    #[test]
    fn cleanup_failures_do_not_mask_the_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::open(dir.path()).unwrap();
        let result: ExecResult<()> = guarded(&mut catalog, |catalog, undo| {
            let row = dict([("table_name", Value::from("a"))]);
            let handle = catalog.register(Registry::Tables, &row)?;
            undo.registered(Registry::Tables, handle);
            undo.registered(Registry::Tables, handle);
            undo.record(Compensation::DeleteRow {
                table_name: "missing".into(),
                handle,
            });
            Err(ExecError::UnknownColumn("x".into()))
        });
        assert!(matches!(result, Err(ExecError::UnknownColumn(_))));
    }
}
