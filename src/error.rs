use thiserror::Error;
use std::io;

use crate::execution::predicate::PredicateError;

/// Failures raised by the storage layer: heap files, relations, indices and
/// the catalog registries built on top of them.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("table '{0}' not found")]
    TableNotFound(String),
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
    #[error("index '{index}' not found on table '{table}'")]
    IndexNotFound { table: String, index: String },
    #[error("duplicate key {0} in unique index")]
    DuplicateKey(String),
    #[error("not enough room in block for a record of {0} bytes")]
    NoRoom(usize),
    #[error("{0}")]
    Relation(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// The one error type a caller of statement execution sees.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("DbRelationError: {0}")]
    Relation(String),
    #[error("DbRelationError: {0}")]
    Predicate(#[from] PredicateError),
    #[error("unrecognized data type '{0}'")]
    UnsupportedType(String),
    #[error("DbRelationError: don't know how to handle NULLs, defaults, etc. yet")]
    NullsNotSupported,
    #[error("{columns} columns listed but {values} values given")]
    ColumnCountMismatch { columns: usize, values: usize },
    #[error("Invalid column name '{0}'")]
    UnknownColumn(String),
    #[error("column '{0}' specified more than once")]
    DuplicateColumn(String),
    #[error("Column '{column}' does not exist in {table}")]
    UnknownIndexColumn { column: String, table: String },
    #[error("value for column '{column}' must be {expected}")]
    LiteralMismatch { column: String, expected: &'static str },
    #[error("cannot drop a schema table")]
    SchemaTableDrop,
}

impl From<DbError> for ExecError {
    fn from(e: DbError) -> Self {
        ExecError::Relation(e.to_string())
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
