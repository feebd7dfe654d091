// src/sql/parser.rs
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{alpha1, char, digit1, multispace0, satisfy},
    combinator::{map, map_res, not, opt, recognize},
    error::Error,
    multi::separated_list1,
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};

use crate::error::{DbError, DbResult};
use crate::sql::ast::{BinaryOperator, ColumnDef, Expr, SelectColumns, ShowKind, Statement};

fn ws<'a, F, O>(inner: F) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

/// A case-insensitive keyword that is not the prefix of a longer word.
fn keyword<'a>(kw: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = Error<&'a str>> {
    terminated(
        tag_no_case(kw),
        not(satisfy(|c: char| c.is_alphanumeric() || c == '_')),
    )
}

fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
        |s: &str| s.to_string(),
    )
    .parse(input)
}

fn identifier_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), ws(identifier)),
        ws(char(')')),
    )
    .parse(input)
}

fn literal(input: &str) -> IResult<&str, Expr> {
    alt((
        map_res(
            recognize((opt(char('-')), digit1, char('.'), digit1)),
            |s: &str| s.parse::<f64>().map(Expr::FloatLiteral),
        ),
        map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
            s.parse::<i32>().map(Expr::IntLiteral)
        }),
        map(
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            |s: &str| Expr::StringLiteral(s.to_string()),
        ),
    ))
    .parse(input)
}

fn operand(input: &str) -> IResult<&str, Expr> {
    alt((literal, map(identifier, Expr::Column))).parse(input)
}

fn comparison_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(tag("<="), |_| BinaryOperator::LtEq),
        map(tag(">="), |_| BinaryOperator::GtEq),
        map(tag("<>"), |_| BinaryOperator::NotEq),
        map(tag("!="), |_| BinaryOperator::NotEq),
        map(tag("="), |_| BinaryOperator::Eq),
        map(tag("<"), |_| BinaryOperator::Lt),
        map(tag(">"), |_| BinaryOperator::Gt),
    ))
    .parse(input)
}

fn condition_term(input: &str) -> IResult<&str, Expr> {
    alt((
        delimited(ws(char('(')), condition, ws(char(')'))),
        map(
            (ws(operand), ws(comparison_op), ws(operand)),
            |(left, op, right)| Expr::binary(op, left, right),
        ),
    ))
    .parse(input)
}

fn condition_and(input: &str) -> IResult<&str, Expr> {
    let (input, first) = condition_term(input)?;
    let (input, rest) = opt(preceded(ws(keyword("AND")), condition_and)).parse(input)?;
    match rest {
        Some(right) => Ok((input, Expr::binary(BinaryOperator::And, first, right))),
        None => Ok((input, first)),
    }
}

/// A WHERE expression. AND binds tighter than OR.
pub fn condition(input: &str) -> IResult<&str, Expr> {
    let (input, first) = condition_and(input)?;
    let (input, rest) = opt(preceded(ws(keyword("OR")), condition)).parse(input)?;
    match rest {
        Some(right) => Ok((input, Expr::binary(BinaryOperator::Or, first, right))),
        None => Ok((input, first)),
    }
}

fn where_clause(input: &str) -> IResult<&str, Option<Expr>> {
    opt(preceded(ws(keyword("WHERE")), condition)).parse(input)
}

fn column_def(input: &str) -> IResult<&str, ColumnDef> {
    map((ws(identifier), ws(identifier)), |(name, data_type)| {
        ColumnDef { name, data_type }
    })
    .parse(input)
}

fn create_table(input: &str) -> IResult<&str, Statement> {
    let (input, _) = ws(keyword("CREATE")).parse(input)?;
    let (input, _) = ws(keyword("TABLE")).parse(input)?;
    let (input, if_not_exists) = opt((
        ws(keyword("IF")),
        ws(keyword("NOT")),
        ws(keyword("EXISTS")),
    ))
    .parse(input)?;
    let (input, table_name) = ws(identifier).parse(input)?;
    let (input, columns) = delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), column_def),
        ws(char(')')),
    )
    .parse(input)?;
    Ok((
        input,
        Statement::CreateTable {
            table_name,
            columns,
            if_not_exists: if_not_exists.is_some(),
        },
    ))
}

fn create_index(input: &str) -> IResult<&str, Statement> {
    let (input, _) = ws(keyword("CREATE")).parse(input)?;
    let (input, _) = ws(keyword("INDEX")).parse(input)?;
    let (input, index_name) = ws(identifier).parse(input)?;
    let (input, _) = ws(keyword("ON")).parse(input)?;
    let (input, table_name) = ws(identifier).parse(input)?;
    let (input, index_type) = opt(preceded(ws(keyword("USING")), ws(identifier))).parse(input)?;
    let (input, columns) = identifier_list(input)?;
    Ok((
        input,
        Statement::CreateIndex {
            index_name,
            table_name,
            index_type: index_type.map_or_else(|| "BTREE".to_string(), |t| t.to_uppercase()),
            columns,
        },
    ))
}

fn drop_table(input: &str) -> IResult<&str, Statement> {
    map(
        preceded(
            pair(ws(keyword("DROP")), ws(keyword("TABLE"))),
            ws(identifier),
        ),
        |table_name| Statement::DropTable { table_name },
    )
    .parse(input)
}

fn drop_index(input: &str) -> IResult<&str, Statement> {
    map(
        (
            ws(keyword("DROP")),
            ws(keyword("INDEX")),
            ws(identifier),
            ws(keyword("FROM")),
            ws(identifier),
        ),
        |(_, _, index_name, _, table_name)| Statement::DropIndex { index_name, table_name },
    )
    .parse(input)
}

fn from_table(input: &str) -> IResult<&str, String> {
    preceded(ws(keyword("FROM")), ws(identifier)).parse(input)
}

fn show(input: &str) -> IResult<&str, Statement> {
    preceded(
        ws(keyword("SHOW")),
        alt((
            map(ws(keyword("TABLES")), |_| Statement::Show(ShowKind::Tables)),
            map(preceded(ws(keyword("COLUMNS")), from_table), |table_name| {
                Statement::Show(ShowKind::Columns { table_name })
            }),
            map(preceded(ws(keyword("INDEX")), from_table), |table_name| {
                Statement::Show(ShowKind::Index { table_name })
            }),
        )),
    )
    .parse(input)
}

fn insert(input: &str) -> IResult<&str, Statement> {
    let (input, _) = ws(keyword("INSERT")).parse(input)?;
    let (input, _) = ws(keyword("INTO")).parse(input)?;
    let (input, table_name) = ws(identifier).parse(input)?;
    let (input, columns) = opt(identifier_list).parse(input)?;
    let (input, _) = ws(keyword("VALUES")).parse(input)?;
    let (input, values) = delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), ws(literal)),
        ws(char(')')),
    )
    .parse(input)?;
    Ok((input, Statement::Insert { table_name, columns, values }))
}

fn delete(input: &str) -> IResult<&str, Statement> {
    let (input, _) = ws(keyword("DELETE")).parse(input)?;
    let (input, _) = ws(keyword("FROM")).parse(input)?;
    let (input, table_name) = ws(identifier).parse(input)?;
    let (input, selection) = where_clause(input)?;
    Ok((input, Statement::Delete { table_name, selection }))
}

fn select(input: &str) -> IResult<&str, Statement> {
    let (input, _) = ws(keyword("SELECT")).parse(input)?;
    let (input, columns) = alt((
        map(ws(char('*')), |_| SelectColumns::All),
        map(separated_list1(ws(char(',')), ws(identifier)), SelectColumns::Named),
    ))
    .parse(input)?;
    let (input, _) = ws(keyword("FROM")).parse(input)?;
    let (input, table_name) = ws(identifier).parse(input)?;
    let (input, selection) = where_clause(input)?;
    Ok((input, Statement::Select { columns, table_name, selection }))
}

/// Parse one SQL statement. A trailing `;` is optional.
pub fn parse_statement(input: &str) -> DbResult<Statement> {
    let input = input.trim().trim_end_matches(';');
    let result = alt((
        create_table,
        create_index,
        drop_table,
        drop_index,
        show,
        insert,
        delete,
        select,
    ))
    .parse(input);

    match result {
        Ok((rest, stmt)) if rest.trim().is_empty() => Ok(stmt),
        Ok((rest, _)) => Err(DbError::ParseError(format!(
            "unexpected input after statement: '{}'",
            rest.trim()
        ))),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(DbError::ParseError(format!(
            "syntax error near '{}'",
            e.input.trim()
        ))),
        Err(nom::Err::Incomplete(_)) => Err(DbError::ParseError("incomplete statement".into())),
    }
}
