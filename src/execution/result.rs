use std::fmt;

use crate::storage::row::{ColumnType, ValueDict};

/// Outcome of one statement. Only SELECT and SHOW carry rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub column_names: Option<Vec<String>>,
    pub column_types: Option<Vec<ColumnType>>,
    pub rows: Option<Vec<ValueDict>>,
    pub message: String,
}

impl QueryResult {
    pub fn message(message: impl Into<String>) -> Self {
        QueryResult {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_rows(
        column_names: Vec<String>,
        column_types: Vec<ColumnType>,
        rows: Vec<ValueDict>,
    ) -> Self {
        let message = format!("successfully returned {} rows", rows.len());
        QueryResult {
            column_names: Some(column_names),
            column_types: Some(column_types),
            rows: Some(rows),
            message,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(names) = &self.column_names {
            for name in names {
                write!(f, "{} ", name)?;
            }
            writeln!(f)?;
            write!(f, "+")?;
            for _ in names {
                write!(f, "----------+")?;
            }
            writeln!(f)?;
            for row in self.rows.iter().flatten() {
                for name in names {
                    match row.get(name) {
                        Some(value) => write!(f, "{} ", value)?,
                        None => write!(f, "??? ")?,
                    }
                }
                writeln!(f)?;
            }
        }
        write!(f, "{}", self.message)
    }
}
