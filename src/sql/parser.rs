//! Parse SQL into sqlparser AST.

use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::error::EngineError;

/// Parse a single SQL statement: SELECT, CACHE TABLE or UNCACHE TABLE.
pub fn parse_sql(query: &str) -> Result<Statement, EngineError> {
    let dialect = GenericDialect {};
    let stmts = Parser::parse_sql(&dialect, query)
        .map_err(|e| EngineError::from(e).with_context("SQL parse error"))?;
    let mut stmts = stmts.into_iter();
    let stmt = match (stmts.next(), stmts.next()) {
        (Some(stmt), None) => stmt,
        (None, _) => return Err(EngineError::Sql("SQL: empty statement.".into())),
        (Some(_), Some(_)) => {
            return Err(EngineError::Sql(
                "SQL: expected exactly one statement. Hint: run one statement at a time.".into(),
            ))
        }
    };
    match &stmt {
        Statement::Query(_) | Statement::Cache { .. } | Statement::UNCache { .. } => Ok(stmt),
        other => Err(EngineError::Sql(format!(
            "SQL: only SELECT, CACHE TABLE and UNCACHE TABLE are supported, got: {other}"
        ))),
    }
}
