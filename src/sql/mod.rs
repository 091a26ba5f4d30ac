//! SQL parsing and translation to DataFrame operations.

mod expr;
mod parser;
mod translator;

use crate::dataframe::DataFrame;
use crate::error::EngineError;
use crate::session::SparkSession;

/// Parse a SQL string and execute it using the session's catalog.
/// Supports: SELECT (columns, expressions or *), FROM a single view, WHERE,
/// GROUP BY + aggregates, HAVING, ORDER BY, LIMIT, DISTINCT, plus
/// CACHE TABLE / UNCACHE TABLE.
pub fn execute_sql(session: &SparkSession, query: &str) -> Result<DataFrame, EngineError> {
    let stmt = parser::parse_sql(query)?;
    log::debug!("executing SQL: {}", query.trim());
    translator::translate(session, &stmt)
}

pub use parser::parse_sql;
pub use translator::translate;
