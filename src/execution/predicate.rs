use thiserror::Error;

use crate::sql::ast::{BinaryOperator, Expr};
use crate::storage::row::{Value, ValueDict};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredicateError {
    #[error("unknown operator")]
    UnknownOperator,
    #[error("only support AND conjunctions")]
    UnsupportedConjunction,
    #[error("only equality predicates currently supported, got '{0}'")]
    UnsupportedOperator(BinaryOperator),
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("don't know how to handle this type of literal")]
    UnsupportedLiteral,
}

/// Reduce a WHERE expression to the column/value pairs a row must equal.
///
/// Only `column = literal` terms joined by AND are accepted. When the same
/// column appears twice the right-most term wins.
pub fn get_where_conjunction(
    expr: &Expr,
    column_names: &[String],
) -> Result<ValueDict, PredicateError> {
    let Expr::BinaryOp { op, left, right } = expr else {
        return Err(PredicateError::UnknownOperator);
    };
    match op {
        BinaryOperator::And => {
            let mut conditions = get_where_conjunction(left, column_names)?;
            conditions.extend(get_where_conjunction(right, column_names)?);
            Ok(conditions)
        }
        BinaryOperator::Or => Err(PredicateError::UnsupportedConjunction),
        BinaryOperator::Eq => {
            let Expr::Column(column) = left.as_ref() else {
                return Err(PredicateError::UnknownOperator);
            };
            if !column_names.contains(column) {
                return Err(PredicateError::UnknownColumn(column.clone()));
            }
            let value = match right.as_ref() {
                Expr::IntLiteral(i) => Value::Integer(*i),
                Expr::StringLiteral(s) => Value::Text(s.clone()),
                _ => return Err(PredicateError::UnsupportedLiteral),
            };
            Ok(ValueDict::from([(column.clone(), value)]))
        }
        other => Err(PredicateError::UnsupportedOperator(*other)),
    }
}
