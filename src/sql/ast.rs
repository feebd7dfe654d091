// src/sql/ast.rs
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    IntLiteral(i32),
    FloatLiteral(f64),
    StringLiteral(String),
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    /// Type name as written; checked when the table is created.
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumns {
    All,
    Named(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShowKind {
    Tables,
    Columns { table_name: String },
    Index { table_name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        table_name: String,
        columns: Vec<ColumnDef>,
        if_not_exists: bool,
    },
    CreateIndex {
        index_name: String,
        table_name: String,
        index_type: String,
        columns: Vec<String>,
    },
    DropTable {
        table_name: String,
    },
    DropIndex {
        index_name: String,
        table_name: String,
    },
    Show(ShowKind),
    Insert {
        table_name: String,
        columns: Option<Vec<String>>,
        values: Vec<Expr>,
    },
    Delete {
        table_name: String,
        selection: Option<Expr>,
    },
    Select {
        columns: SelectColumns,
        table_name: String,
        selection: Option<Expr>,
    },
}
