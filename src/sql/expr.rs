//! SQL expression translation: sqlparser `Expr` to a Polars `Expr` plus the column name
//! Spark would give it.
//!
//! Translation happens in one of two scopes. The *row* scope sees the input columns
//! (WHERE, projection of ungrouped queries, GROUP BY keys). The *grouped* scope sees
//! only grouping keys and aggregates: every aggregate call is registered as a hidden
//! `__agg_n` column computed by the group-by, every expression equal to a grouping key
//! becomes a reference to its hidden `__key_n` column, and any other column reference
//! is an error.

use polars::prelude::{col, lit, DataType, Expr, TimeUnit, NULL};
use sqlparser::ast::{
    BinaryOperator, DateTimeField, Expr as SqlExpr, Function, FunctionArg, FunctionArgExpr,
    UnaryOperator, Value,
};

use crate::dataframe::resolve_name;
use crate::error::EngineError;
use crate::functions::raw;

/// A translated expression and its Spark display name.
#[derive(Debug, Clone)]
pub(crate) struct Translated {
    pub expr: Expr,
    pub name: String,
}

impl Translated {
    fn new(expr: Expr, name: impl Into<String>) -> Self {
        Translated {
            expr,
            name: name.into(),
        }
    }
}

/// Grouping keys and aggregates collected while translating a grouped query.
#[derive(Debug, Default)]
pub(crate) struct Grouping {
    /// (display name, hidden column)
    pub keys: Vec<(String, String)>,
    /// (display name, aggregate over the input, hidden column)
    pub aggs: Vec<(String, Expr, String)>,
}

impl Grouping {
    pub fn add_key(&mut self, name: &str) -> String {
        let hidden = format!("__key_{}", self.keys.len());
        self.keys.push((name.to_string(), hidden.clone()));
        hidden
    }

    fn key(&self, name: &str) -> Option<&str> {
        self.keys
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, hidden)| hidden.as_str())
    }

    fn add_agg(&mut self, name: String, agg: Expr) -> String {
        if let Some((_, _, hidden)) = self.aggs.iter().find(|(n, _, _)| *n == name) {
            return hidden.clone();
        }
        let hidden = format!("__agg_{}", self.aggs.len());
        self.aggs.push((name, agg, hidden.clone()));
        hidden
    }

    /// Aggregate expressions aliased to their hidden columns.
    pub fn agg_exprs(&self) -> Vec<Expr> {
        self.aggs
            .iter()
            .map(|(_, agg, hidden)| agg.clone().alias(hidden.as_str()))
            .collect()
    }
}

const AGGREGATES: [&str; 6] = ["avg", "mean", "sum", "count", "min", "max"];

fn function_name(f: &Function) -> String {
    f.name
        .0
        .last()
        .map(|i| i.value.to_lowercase())
        .unwrap_or_default()
}

fn is_aggregate(f: &Function) -> bool {
    AGGREGATES.contains(&function_name(f).as_str())
}

/// True if the expression contains an aggregate call anywhere.
pub(crate) fn contains_aggregate(e: &SqlExpr) -> bool {
    match e {
        SqlExpr::Function(f) => {
            is_aggregate(f)
                || f.args.iter().any(|a| match a {
                    FunctionArg::Unnamed(FunctionArgExpr::Expr(inner))
                    | FunctionArg::Named {
                        arg: FunctionArgExpr::Expr(inner),
                        ..
                    } => contains_aggregate(inner),
                    _ => false,
                })
        }
        SqlExpr::BinaryOp { left, right, .. } => contains_aggregate(left) || contains_aggregate(right),
        SqlExpr::UnaryOp { expr, .. }
        | SqlExpr::Nested(expr)
        | SqlExpr::IsNull(expr)
        | SqlExpr::IsNotNull(expr)
        | SqlExpr::Cast { expr, .. }
        | SqlExpr::Extract { expr, .. } => contains_aggregate(expr),
        SqlExpr::Between {
            expr, low, high, ..
        } => contains_aggregate(expr) || contains_aggregate(low) || contains_aggregate(high),
        _ => false,
    }
}

fn unsupported(what: impl std::fmt::Display) -> EngineError {
    EngineError::Sql(format!("SQL: unsupported {what}"))
}

fn spark_type(data_type: &str) -> Option<(DataType, &'static str)> {
    let upper = data_type.to_uppercase();
    let base = upper.split('(').next().unwrap_or("").trim();
    let mapped = match base {
        "INT" | "INTEGER" => (DataType::Int32, "INT"),
        "BIGINT" | "LONG" => (DataType::Int64, "BIGINT"),
        "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" | "REAL" | "DECIMAL" | "NUMERIC" => {
            (DataType::Float64, "DOUBLE")
        }
        "STRING" | "VARCHAR" | "TEXT" | "CHAR" => (DataType::String, "STRING"),
        "DATE" => (DataType::Date, "DATE"),
        "BOOLEAN" | "BOOL" => (DataType::Boolean, "BOOLEAN"),
        "TIMESTAMP" => (DataType::Datetime(TimeUnit::Microseconds, None), "TIMESTAMP"),
        _ => return None,
    };
    Some(mapped)
}

/// Translates expressions against a fixed set of input columns.
pub(crate) struct ExprTranslator<'a> {
    columns: &'a [String],
    case_sensitive: bool,
    grouping: Option<&'a mut Grouping>,
}

impl<'a> ExprTranslator<'a> {
    /// Row scope over `columns`.
    pub fn rows(columns: &'a [String], case_sensitive: bool) -> Self {
        ExprTranslator {
            columns,
            case_sensitive,
            grouping: None,
        }
    }

    /// Grouped scope: keys must already be registered in `grouping`.
    pub fn grouped(columns: &'a [String], case_sensitive: bool, grouping: &'a mut Grouping) -> Self {
        ExprTranslator {
            columns,
            case_sensitive,
            grouping: Some(grouping),
        }
    }

    fn row_scope(&self) -> ExprTranslator<'a> {
        ExprTranslator::rows(self.columns, self.case_sensitive)
    }

    fn resolve(&self, name: &str) -> Result<String, EngineError> {
        resolve_name(self.columns, name, self.case_sensitive).ok_or_else(|| {
            EngineError::NotFound(format!(
                "Column '{}' not found. Available columns: [{}]",
                name,
                self.columns.join(", ")
            ))
        })
    }

    pub fn translate(&mut self, e: &SqlExpr) -> Result<Translated, EngineError> {
        if self.grouping.is_some() {
            let is_agg_call = matches!(e, SqlExpr::Function(f) if is_aggregate(f));
            if !is_agg_call && !contains_aggregate(e) {
                // a grouping key, or built only from grouping keys and literals
                if let Ok(t) = self.row_scope().translate(e) {
                    if let Some(hidden) = self.grouping.as_deref().and_then(|g| g.key(&t.name)) {
                        return Ok(Translated::new(col(hidden), t.name));
                    }
                }
            }
        }
        match e {
            SqlExpr::Identifier(ident) => self.column(&ident.value),
            SqlExpr::CompoundIdentifier(parts) => {
                let last = parts
                    .last()
                    .ok_or_else(|| EngineError::Sql("SQL: empty compound identifier.".into()))?;
                self.column(&last.value)
            }
            SqlExpr::Nested(inner) => self.translate(inner),
            SqlExpr::Value(v) => literal(v),
            SqlExpr::BinaryOp { left, op, right } => {
                let l = self.translate(left)?;
                let r = self.translate(right)?;
                binary(l, op, r)
            }
            SqlExpr::UnaryOp { op, expr } => {
                let inner = self.translate(expr)?;
                match op {
                    UnaryOperator::Not => Ok(Translated::new(
                        inner.expr.not(),
                        format!("(NOT {})", inner.name),
                    )),
                    UnaryOperator::Minus => Ok(Translated::new(
                        lit(0i32) - inner.expr,
                        format!("(- {})", inner.name),
                    )),
                    UnaryOperator::Plus => Ok(inner),
                    other => Err(unsupported(format!("unary operator {other}"))),
                }
            }
            SqlExpr::IsNull(inner) => {
                let t = self.translate(inner)?;
                Ok(Translated::new(t.expr.is_null(), format!("({} IS NULL)", t.name)))
            }
            SqlExpr::IsNotNull(inner) => {
                let t = self.translate(inner)?;
                Ok(Translated::new(
                    t.expr.is_not_null(),
                    format!("({} IS NOT NULL)", t.name),
                ))
            }
            SqlExpr::Between {
                expr,
                negated,
                low,
                high,
            } => {
                let v = self.translate(expr)?;
                let lo = self.translate(low)?;
                let hi = self.translate(high)?;
                let within = v.expr.clone().gt_eq(lo.expr).and(v.expr.lt_eq(hi.expr));
                let name = format!("({} BETWEEN {} AND {})", v.name, lo.name, hi.name);
                Ok(if *negated {
                    Translated::new(within.not(), format!("(NOT {name})"))
                } else {
                    Translated::new(within, name)
                })
            }
            SqlExpr::Cast {
                expr, data_type, ..
            } => {
                let inner = self.translate(expr)?;
                let (dtype, spark_name) = spark_type(&data_type.to_string())
                    .ok_or_else(|| unsupported(format!("CAST target type {data_type}")))?;
                Ok(Translated::new(
                    inner.expr.cast(dtype),
                    format!("CAST({} AS {spark_name})", inner.name),
                ))
            }
            SqlExpr::Extract { field, expr, .. } => {
                let inner = self.translate(expr)?;
                let (built, label) = match field {
                    DateTimeField::Year => (raw::year(inner.expr), "YEAR"),
                    DateTimeField::Month => (raw::month(inner.expr), "MONTH"),
                    DateTimeField::Day => (raw::dayofmonth(inner.expr), "DAY"),
                    other => return Err(unsupported(format!("EXTRACT field {other}"))),
                };
                Ok(Translated::new(
                    built,
                    format!("extract({label} FROM {})", inner.name),
                ))
            }
            SqlExpr::Function(f) => self.function(f),
            other => Err(unsupported(format!(
                "expression: {other}. Use columns, literals, arithmetic, comparisons, AND/OR/NOT, IS NULL, BETWEEN, CAST, EXTRACT and YEAR/MONTH/DAY/ROUND/ABS or aggregates."
            ))),
        }
    }

    fn column(&self, name: &str) -> Result<Translated, EngineError> {
        let resolved = self.resolve(name)?;
        if self.grouping.is_some() {
            // reaching here means the column is not a grouping key
            return Err(EngineError::Sql(format!(
                "SQL: column '{resolved}' must appear in GROUP BY or be used in an aggregate function."
            )));
        }
        Ok(Translated::new(col(resolved.as_str()), resolved))
    }

    fn args(&mut self, f: &Function) -> Result<Vec<Option<Translated>>, EngineError> {
        f.args
            .iter()
            .map(|a| match a {
                FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => self.translate(e).map(Some),
                FunctionArg::Unnamed(FunctionArgExpr::Wildcard) => Ok(None),
                other => Err(unsupported(format!("function argument {other}"))),
            })
            .collect()
    }

    fn single_arg(&mut self, f: &Function, fname: &str) -> Result<Translated, EngineError> {
        let mut args = self.args(f)?;
        match (args.pop(), args.is_empty()) {
            (Some(Some(arg)), true) => Ok(arg),
            _ => Err(EngineError::Sql(format!(
                "SQL: {fname}() takes exactly one column argument."
            ))),
        }
    }

    fn function(&mut self, f: &Function) -> Result<Translated, EngineError> {
        let fname = function_name(f);
        if is_aggregate(f) {
            return self.aggregate(f, &fname);
        }
        match fname.as_str() {
            "year" | "month" | "day" | "dayofmonth" => {
                let arg = self.single_arg(f, &fname)?;
                let built = match fname.as_str() {
                    "year" => raw::year(arg.expr),
                    "month" => raw::month(arg.expr),
                    _ => raw::dayofmonth(arg.expr),
                };
                Ok(Translated::new(built, format!("{fname}({})", arg.name)))
            }
            "abs" => {
                let arg = self.single_arg(f, &fname)?;
                Ok(Translated::new(arg.expr.abs(), format!("abs({})", arg.name)))
            }
            "round" => {
                let (value, scale) = match f.args.as_slice() {
                    [FunctionArg::Unnamed(FunctionArgExpr::Expr(v))] => (v, 0u32),
                    [FunctionArg::Unnamed(FunctionArgExpr::Expr(v)), FunctionArg::Unnamed(FunctionArgExpr::Expr(SqlExpr::Value(Value::Number(s, _))))] => {
                        let scale = s.parse::<u32>().map_err(|_| {
                            EngineError::Sql(format!(
                                "SQL: ROUND scale must be a non-negative integer, got '{s}'"
                            ))
                        })?;
                        (v, scale)
                    }
                    _ => {
                        return Err(EngineError::Sql(
                            "SQL: ROUND takes a value and an optional integer scale.".into(),
                        ))
                    }
                };
                let v = self.translate(value)?;
                Ok(Translated::new(
                    raw::round(v.expr, scale),
                    format!("round({}, {scale})", v.name),
                ))
            }
            other => Err(unsupported(format!(
                "function {other}(). Supported: YEAR, MONTH, DAY, DAYOFMONTH, ROUND, ABS, AVG, MEAN, SUM, COUNT, MIN, MAX."
            ))),
        }
    }

    fn aggregate(&mut self, f: &Function, fname: &str) -> Result<Translated, EngineError> {
        if self.grouping.is_none() {
            return Err(EngineError::Sql(format!(
                "SQL: aggregate function {fname}() is not allowed here (use it in SELECT, HAVING or ORDER BY)."
            )));
        }
        // aggregate arguments are evaluated per input row
        let mut row = self.row_scope();
        let args = row.args(f).map_err(|e| match e {
            EngineError::Sql(msg) if msg.contains("aggregate function") => {
                EngineError::Sql("SQL: aggregate functions cannot be nested.".into())
            }
            other => other,
        })?;
        let (agg, name) = match (fname, args.as_slice()) {
            ("count", [None]) | ("count", []) => (raw::count_star(), "count(1)".to_string()),
            ("count", [Some(arg)]) if f.distinct => (
                raw::count_distinct(arg.expr.clone()),
                format!("count(DISTINCT {})", arg.name),
            ),
            (_, [Some(arg)]) => {
                let e = arg.expr.clone();
                let built = match fname {
                    "avg" | "mean" => raw::avg(e),
                    "sum" => raw::sum(e),
                    "count" => raw::count(e),
                    "min" => raw::min(e),
                    _ => raw::max(e),
                };
                (built, format!("{fname}({})", arg.name))
            }
            _ => {
                return Err(EngineError::Sql(format!(
                    "SQL: {fname}() takes exactly one argument (COUNT also accepts *)."
                )))
            }
        };
        let grouping = self
            .grouping
            .as_deref_mut()
            .ok_or_else(|| EngineError::Internal("aggregate outside grouped scope".into()))?;
        let hidden = grouping.add_agg(name.clone(), agg);
        Ok(Translated::new(col(hidden.as_str()), name))
    }
}

fn literal(v: &Value) -> Result<Translated, EngineError> {
    match v {
        Value::Number(s, _) => {
            if let Ok(n) = s.parse::<i64>() {
                Ok(Translated::new(lit(n), s.clone()))
            } else {
                let f: f64 = s.parse().map_err(|_| {
                    EngineError::Sql(format!("SQL: invalid number literal '{s}'"))
                })?;
                Ok(Translated::new(lit(f), s.clone()))
            }
        }
        Value::SingleQuotedString(s) | Value::DoubleQuotedString(s) => {
            Ok(Translated::new(lit(s.clone()), s.clone()))
        }
        Value::Boolean(b) => Ok(Translated::new(lit(*b), b.to_string())),
        Value::Null => Ok(Translated::new(lit(NULL), "NULL")),
        other => Err(unsupported(format!("literal {other}"))),
    }
}

fn binary(l: Translated, op: &BinaryOperator, r: Translated) -> Result<Translated, EngineError> {
    let (expr, symbol) = match op {
        BinaryOperator::Eq => (l.expr.eq(r.expr), "="),
        BinaryOperator::NotEq => (l.expr.neq(r.expr), "!="),
        BinaryOperator::Gt => (l.expr.gt(r.expr), ">"),
        BinaryOperator::GtEq => (l.expr.gt_eq(r.expr), ">="),
        BinaryOperator::Lt => (l.expr.lt(r.expr), "<"),
        BinaryOperator::LtEq => (l.expr.lt_eq(r.expr), "<="),
        BinaryOperator::And => (l.expr.and(r.expr), "AND"),
        BinaryOperator::Or => (l.expr.or(r.expr), "OR"),
        BinaryOperator::Plus => (l.expr + r.expr, "+"),
        BinaryOperator::Minus => (l.expr - r.expr, "-"),
        BinaryOperator::Multiply => (l.expr * r.expr, "*"),
        // SQL `/` is floating-point division
        BinaryOperator::Divide => (
            l.expr.cast(DataType::Float64) / r.expr.cast(DataType::Float64),
            "/",
        ),
        BinaryOperator::Modulo => (l.expr % r.expr, "%"),
        other => return Err(unsupported(format!("operator {other}"))),
    };
    Ok(Translated::new(
        expr,
        format!("({} {symbol} {})", l.name, r.name),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;

    fn parse(sql: &str) -> SqlExpr {
        Parser::new(&GenericDialect {})
            .try_with_sql(sql)
            .unwrap()
            .parse_expr()
            .unwrap()
    }

    fn columns() -> Vec<String> {
        ["date", "Price", "bedrooms", "view"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn row_scope_names_follow_spark() {
        let cols = columns();
        let mut t = ExprTranslator::rows(&cols, false);
        assert_eq!(t.translate(&parse("YEAR(date)")).unwrap().name, "year(date)");
        assert_eq!(t.translate(&parse("price / 2")).unwrap().name, "(Price / 2)");
        assert_eq!(
            t.translate(&parse("bedrooms == 4 AND view >= 1")).unwrap().name,
            "((bedrooms = 4) AND (view >= 1))"
        );
        assert_eq!(
            t.translate(&parse("CAST(price AS int)")).unwrap().name,
            "CAST(Price AS INT)"
        );
        assert_eq!(
            t.translate(&parse("EXTRACT(YEAR FROM date)")).unwrap().name,
            "extract(YEAR FROM date)"
        );
    }

    #[test]
    fn row_scope_rejects_aggregates_and_unknown_columns() {
        let cols = columns();
        let mut t = ExprTranslator::rows(&cols, false);
        assert!(matches!(t.translate(&parse("AVG(price) > 1")), Err(EngineError::Sql(_))));
        assert!(matches!(t.translate(&parse("sqft")), Err(EngineError::NotFound(_))));
        let mut strict = ExprTranslator::rows(&cols, true);
        assert!(strict.translate(&parse("price")).is_err());
    }

    #[test]
    fn grouped_scope_maps_keys_and_collects_aggregates() {
        let cols = columns();
        let mut grouping = Grouping::default();
        grouping.add_key("year(date)");
        let mut t = ExprTranslator::grouped(&cols, false, &mut grouping);
        let key = t.translate(&parse("year(DATE)")).unwrap();
        assert_eq!(key.name, "year(date)");
        let avg = t.translate(&parse("ROUND(AVG(price), 2)")).unwrap();
        assert_eq!(avg.name, "round(avg(Price), 2)");
        let again = t.translate(&parse("avg(price) >= 350000")).unwrap();
        assert_eq!(again.name, "(avg(Price) >= 350000)");
        let err = t.translate(&parse("bedrooms")).unwrap_err();
        assert!(matches!(err, EngineError::Sql(_)));
        assert!(matches!(t.translate(&parse("SUM(AVG(price))")), Err(EngineError::Sql(_))));
        let count = t.translate(&parse("COUNT(*)")).unwrap();
        assert_eq!(count.name, "count(1)");
        assert_eq!(grouping.aggs.len(), 2);
    }

    #[test]
    fn contains_aggregate_looks_inside_calls() {
        assert!(contains_aggregate(&parse("ROUND(AVG(price), 2)")));
        assert!(contains_aggregate(&parse("1 + count(*)")));
        assert!(!contains_aggregate(&parse("YEAR(date) = 2020")));
    }
}
