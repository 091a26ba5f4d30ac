//! Engine error type.
//!
//! Every fallible operation in this crate returns [`EngineError`]. Polars, I/O and
//! SQL parser errors are folded into it so callers (the CLI, tests, embedders) never
//! need to depend on Polars error types.

use polars::error::PolarsError;
use std::fmt;

/// Unified error type for home-sales operations.
#[derive(Debug)]
pub enum EngineError {
    /// User-facing error (invalid input, unsupported operation).
    User(String),
    /// Internal / compute error.
    Internal(String),
    /// I/O error (file not found, permission, unwritable destination, etc.).
    Io(String),
    /// A column could not be typed, or the data does not have the expected shape.
    Schema(String),
    /// SQL parsing or translation error.
    Sql(String),
    /// Resource not found (column, view, file).
    NotFound(String),
    /// Other / unclassified.
    Other(String),
}

impl EngineError {
    /// Short kind name, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::User(_) => "user",
            EngineError::Internal(_) => "internal",
            EngineError::Io(_) => "io",
            EngineError::Schema(_) => "schema",
            EngineError::Sql(_) => "sql",
            EngineError::NotFound(_) => "not_found",
            EngineError::Other(_) => "other",
        }
    }

    pub(crate) fn with_context(self, context: impl fmt::Display) -> Self {
        match self {
            EngineError::User(s) => EngineError::User(format!("{context}: {s}")),
            EngineError::Internal(s) => EngineError::Internal(format!("{context}: {s}")),
            EngineError::Io(s) => EngineError::Io(format!("{context}: {s}")),
            EngineError::Schema(s) => EngineError::Schema(format!("{context}: {s}")),
            EngineError::Sql(s) => EngineError::Sql(format!("{context}: {s}")),
            EngineError::NotFound(s) => EngineError::NotFound(format!("{context}: {s}")),
            EngineError::Other(s) => EngineError::Other(format!("{context}: {s}")),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::User(s) => write!(f, "user error: {s}"),
            EngineError::Internal(s) => write!(f, "internal error: {s}"),
            EngineError::Io(s) => write!(f, "io error: {s}"),
            EngineError::Schema(s) => write!(f, "schema error: {s}"),
            EngineError::Sql(s) => write!(f, "sql error: {s}"),
            EngineError::NotFound(s) => write!(f, "not found: {s}"),
            EngineError::Other(s) => write!(f, "{s}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<PolarsError> for EngineError {
    fn from(e: PolarsError) -> Self {
        let msg = e.to_string();
        match &e {
            PolarsError::ColumnNotFound(_) => EngineError::NotFound(msg),
            PolarsError::SchemaMismatch(_) | PolarsError::SchemaFieldNotFound(_) => {
                EngineError::Schema(msg)
            }
            PolarsError::InvalidOperation(_) => EngineError::User(msg),
            PolarsError::ComputeError(_) => {
                let lower = msg.to_lowercase();
                if (lower.contains("filter") || lower.contains("predicate"))
                    && (lower.contains("boolean") || lower.contains("bool"))
                {
                    return EngineError::User(format!(
                        "filter predicate must be Boolean, got non-Boolean expression: {msg}"
                    ));
                }
                if lower.contains("could not parse") {
                    return EngineError::Schema(msg);
                }
                if lower.contains("no matching files")
                    || lower.contains("did not match any files")
                    || lower.contains("at least 1 source")
                {
                    return EngineError::Io(msg);
                }
                EngineError::Internal(msg)
            }
            PolarsError::IO { .. } => EngineError::Io(msg),
            _ => EngineError::Other(msg),
        }
    }
}

impl From<sqlparser::parser::ParserError> for EngineError {
    fn from(e: sqlparser::parser::ParserError) -> Self {
        EngineError::Sql(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polars_column_not_found_maps_to_not_found() {
        let e: EngineError = PolarsError::ColumnNotFound("price".into()).into();
        assert!(matches!(e, EngineError::NotFound(_)));
        assert_eq!(e.kind(), "not_found");
    }

    #[test]
    fn polars_parse_failure_maps_to_schema() {
        let e: EngineError =
            PolarsError::ComputeError("could not parse `abc` as dtype `i64` at column 'price'".into())
                .into();
        assert!(matches!(e, EngineError::Schema(_)));
    }

    #[test]
    fn empty_scan_maps_to_io() {
        let e: EngineError = PolarsError::ComputeError("expected at least 1 source".into()).into();
        assert!(matches!(e, EngineError::Io(_)));
        let e: EngineError =
            PolarsError::ComputeError("globbing pattern did not match any files".into()).into();
        assert!(matches!(e, EngineError::Io(_)));
    }

    #[test]
    fn io_error_keeps_message() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let e: EngineError = io.into();
        assert_eq!(e.to_string(), "io error: no such file");
    }

    #[test]
    fn context_is_prefixed() {
        let e = EngineError::Io("denied".into()).with_context("write parquet(/tmp/x)");
        assert_eq!(e.to_string(), "io error: write parquet(/tmp/x): denied");
    }
}
