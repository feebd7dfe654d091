use std::path::Path;

use log::info;

use crate::catalog::Catalog;
use crate::error::{DbResult, ExecResult};
use crate::execution::runtime::handle_statement;
use crate::execution::QueryResult;
use crate::sql::ast::Statement;

/// Directory used by the shell when none is given.
pub const DEFAULT_DATA_DIR: &str = "data";

/// A database rooted at one data directory.
pub struct Engine {
    pub catalog: Catalog,
}

impl Engine {
    pub fn open(dir: impl AsRef<Path>) -> DbResult<Self> {
        let catalog = Catalog::open(dir)?;
        info!("engine: ready in {}", catalog.dir().display());
        Ok(Engine { catalog })
    }

    pub fn execute(&mut self, stmt: Statement) -> ExecResult<QueryResult> {
        handle_statement(&mut self.catalog, stmt)
    }
}
