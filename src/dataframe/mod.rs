//! DataFrame module: main tabular type and submodules for transformations,
//! aggregations, console rendering and writes.

mod aggregations;
mod display;
mod transformations;
mod writer;

pub use aggregations::GroupedData;
pub use display::{format_any_value, render_table};
pub use transformations::{distinct, filter, limit, order_by, order_by_exprs, select, with_column};
pub use writer::{DataFrameWriter, SaveMode, WriteSummary};

use crate::error::EngineError;
use crate::functions::SortOrder;
use crate::schema::StructType;
use polars::prelude::{
    col, len, AnyValue, DataFrame as PlDataFrame, DataType, Expr, IdxSize, IntoLazy, LazyFrame,
    SchemaRef,
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

/// Default for `spark.sql.caseSensitive` (PySpark default is false = case-insensitive).
const DEFAULT_CASE_SENSITIVE: bool = false;

/// Spark's default for `show()`.
const DEFAULT_SHOW_ROWS: usize = 20;
const DEFAULT_TRUNCATE: usize = 20;

/// DataFrame - main tabular data structure.
///
/// Wraps a Polars `LazyFrame`: transformations extend the plan, actions
/// (`collect`, `count`, `show`, writes) execute it. A frame built from an in-memory
/// Polars `DataFrame` (or returned by [`cache`](Self::cache)) is *materialized*:
/// executing it never goes back to the source files.
pub struct DataFrame {
    pub(crate) lf: LazyFrame,
    /// When false (default), column names are matched case-insensitively (PySpark behavior).
    pub(crate) case_sensitive: bool,
    materialized: bool,
}

impl DataFrame {
    /// Create a new DataFrame from a Polars DataFrame (case-insensitive column matching by default).
    pub fn from_polars(df: PlDataFrame) -> Self {
        Self::from_polars_with_options(df, DEFAULT_CASE_SENSITIVE)
    }

    /// Create a new DataFrame from a Polars DataFrame with explicit case sensitivity.
    pub fn from_polars_with_options(df: PlDataFrame, case_sensitive: bool) -> Self {
        DataFrame {
            lf: df.lazy(),
            case_sensitive,
            materialized: true,
        }
    }

    /// Wrap a lazy plan. Nothing is executed until an action runs.
    pub fn from_lazy(lf: LazyFrame, case_sensitive: bool) -> Self {
        DataFrame {
            lf,
            case_sensitive,
            materialized: false,
        }
    }

    /// Derive a frame from this one's plan, keeping its options.
    pub(crate) fn with_plan(&self, lf: LazyFrame) -> Self {
        DataFrame {
            lf,
            case_sensitive: self.case_sensitive,
            materialized: self.materialized,
        }
    }

    /// Create an empty DataFrame
    pub fn empty() -> Self {
        Self::from_polars(PlDataFrame::empty())
    }

    /// The underlying lazy plan.
    pub fn lazy_frame(&self) -> LazyFrame {
        self.lf.clone()
    }

    /// True when the plan reads from memory rather than from files.
    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn polars_schema(&self) -> Result<SchemaRef, EngineError> {
        let mut lf = self.lf.clone();
        Ok(lf.collect_schema()?)
    }

    /// Resolve a logical column name to the actual column name in the schema.
    /// When case_sensitive is false, matches case-insensitively.
    pub fn resolve_column_name(&self, name: &str) -> Result<String, EngineError> {
        let schema = self.polars_schema()?;
        let names: Vec<String> = schema.iter_names().map(|s| s.to_string()).collect();
        resolve_name(&names, name, self.case_sensitive).ok_or_else(|| {
            EngineError::NotFound(format!(
                "Column '{}' not found. Available columns: [{}]. Check spelling and case sensitivity (spark.sql.caseSensitive).",
                name,
                names.join(", ")
            ))
        })
    }

    /// Get the schema of the DataFrame
    pub fn schema(&self) -> Result<StructType, EngineError> {
        Ok(StructType::from_polars_schema(&*self.polars_schema()?))
    }

    /// Get column names
    pub fn columns(&self) -> Result<Vec<String>, EngineError> {
        Ok(self
            .polars_schema()?
            .iter_names()
            .map(|s| s.to_string())
            .collect())
    }

    /// Column names and Spark dtype strings. PySpark dtypes.
    pub fn dtypes(&self) -> Result<Vec<(String, String)>, EngineError> {
        Ok(self
            .schema()?
            .fields()
            .iter()
            .map(|f| (f.name.clone(), f.data_type.simple_string().to_string()))
            .collect())
    }

    /// Polars dtype of a column (name resolved according to case sensitivity).
    pub fn get_column_dtype(&self, name: &str) -> Result<DataType, EngineError> {
        let resolved = self.resolve_column_name(name)?;
        let schema = self.polars_schema()?;
        schema
            .get(resolved.as_str())
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("column '{resolved}'")))
    }

    /// Schema as tree string. PySpark printSchema (returns the string).
    pub fn print_schema(&self) -> Result<String, EngineError> {
        Ok(self.schema()?.tree_string())
    }

    /// Count the number of rows (action - triggers execution)
    pub fn count(&self) -> Result<usize, EngineError> {
        let out = self
            .lf
            .clone()
            .select([len().cast(DataType::Int64).alias("count")])
            .collect()?;
        let column = out
            .get_columns()
            .first()
            .ok_or_else(|| EngineError::Internal("count: empty result".into()))?;
        let n = column
            .get(0)?
            .extract::<i64>()
            .ok_or_else(|| EngineError::Internal("count: non-numeric result".into()))?;
        Ok(n as usize)
    }

    /// True if the DataFrame has zero rows. PySpark isEmpty.
    pub fn is_empty(&self) -> Result<bool, EngineError> {
        let head = self.lf.clone().limit(1).collect()?;
        Ok(head.height() == 0)
    }

    /// Collect the DataFrame (action - triggers execution)
    pub fn collect(&self) -> Result<PlDataFrame, EngineError> {
        Ok(self.lf.clone().collect()?)
    }

    /// Collect as rows of column-name -> JSON value.
    pub fn collect_as_json_rows(&self) -> Result<Vec<HashMap<String, JsonValue>>, EngineError> {
        let df = self.collect()?;
        let columns = df.get_columns();
        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let mut row = HashMap::with_capacity(columns.len());
            for c in columns {
                row.insert(c.name().to_string(), any_value_to_json(c.get(i)?));
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Show the first n rows (default 20) in Spark's table layout.
    pub fn show(&self, n: Option<usize>) -> Result<(), EngineError> {
        println!(
            "{}",
            self.show_string(n.unwrap_or(DEFAULT_SHOW_ROWS), DEFAULT_TRUNCATE)?
        );
        Ok(())
    }

    /// Render the first `n` rows as a Spark-style table. Cells longer than `truncate`
    /// characters are cut (0 disables truncation and left-aligns cells).
    pub fn show_string(&self, n: usize, truncate: usize) -> Result<String, EngineError> {
        let fetched = self.lf.clone().limit((n + 1) as IdxSize).collect()?;
        let has_more = fetched.height() > n;
        let shown = fetched.head(Some(n));
        render_table(&shown, truncate, has_more.then_some(n))
    }

    /// Select columns (returns a new DataFrame).
    /// Column names are resolved according to case sensitivity.
    pub fn select(&self, cols: Vec<&str>) -> Result<DataFrame, EngineError> {
        let resolved: Vec<String> = cols
            .iter()
            .map(|c| self.resolve_column_name(c))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<&str> = resolved.iter().map(|s| s.as_str()).collect();
        transformations::select(self, refs)
    }

    /// Select arbitrary expressions.
    pub fn select_exprs(&self, exprs: Vec<Expr>) -> Result<DataFrame, EngineError> {
        Ok(self.with_plan(self.lf.clone().select(exprs)))
    }

    /// Filter rows using a Polars expression.
    pub fn filter(&self, condition: Expr) -> Result<DataFrame, EngineError> {
        transformations::filter(self, condition)
    }

    /// Add or replace a column using an expression.
    pub fn with_column(&self, column_name: &str, expr: Expr) -> Result<DataFrame, EngineError> {
        transformations::with_column(self, column_name, expr)
    }

    /// Group by columns (returns GroupedData for aggregation).
    /// Column names are resolved according to case sensitivity.
    pub fn group_by(&self, column_names: Vec<&str>) -> Result<GroupedData, EngineError> {
        let resolved: Vec<String> = column_names
            .iter()
            .map(|c| self.resolve_column_name(c))
            .collect::<Result<Vec<_>, _>>()?;
        let exprs: Vec<Expr> = resolved.iter().map(|name| col(name.as_str())).collect();
        Ok(self.group_by_exprs(exprs))
    }

    /// Group by arbitrary key expressions (e.g. `year(col("date")).alias("YEAR")`).
    /// Groups keep first-appearance order so results are reproducible.
    pub fn group_by_exprs(&self, keys: Vec<Expr>) -> GroupedData {
        GroupedData {
            lazy_grouped: self.lf.clone().group_by_stable(keys),
            source: self.clone(),
        }
    }

    /// Order by columns (sort).
    /// Column names are resolved according to case sensitivity.
    pub fn order_by(
        &self,
        column_names: Vec<&str>,
        ascending: Vec<bool>,
    ) -> Result<DataFrame, EngineError> {
        let resolved: Vec<String> = column_names
            .iter()
            .map(|c| self.resolve_column_name(c))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<&str> = resolved.iter().map(|s| s.as_str()).collect();
        transformations::order_by(self, refs, ascending)
    }

    /// Order by sort expressions (asc/desc).
    pub fn order_by_exprs(&self, sort_orders: Vec<SortOrder>) -> Result<DataFrame, EngineError> {
        transformations::order_by_exprs(self, sort_orders)
    }

    /// Limit: return first n rows.
    pub fn limit(&self, n: usize) -> Result<DataFrame, EngineError> {
        transformations::limit(self, n)
    }

    /// Distinct: drop duplicate rows, keeping the first occurrence.
    pub fn distinct(&self) -> Result<DataFrame, EngineError> {
        transformations::distinct(self)
    }

    /// Materialize the plan in memory. PySpark cache.
    ///
    /// Unlike Spark this is eager: the returned frame already holds the rows.
    pub fn cache(&self) -> Result<DataFrame, EngineError> {
        let df = self.collect()?;
        log::debug!("cached DataFrame with {} rows", df.height());
        Ok(DataFrame::from_polars_with_options(df, self.case_sensitive))
    }

    /// Alias of [`cache`](Self::cache). PySpark persist.
    pub fn persist(&self) -> Result<DataFrame, EngineError> {
        self.cache()
    }

    /// No-op: a materialized frame is released when its last clone drops. PySpark unpersist.
    pub fn unpersist(&self) -> Result<DataFrame, EngineError> {
        Ok(self.clone())
    }

    /// Return a writer (Parquet by default). PySpark-style write API.
    pub fn write(&self) -> DataFrameWriter<'_> {
        DataFrameWriter::new(self)
    }
}

impl Clone for DataFrame {
    fn clone(&self) -> Self {
        DataFrame {
            lf: self.lf.clone(),
            case_sensitive: self.case_sensitive,
            materialized: self.materialized,
        }
    }
}

impl fmt::Debug for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFrame")
            .field("case_sensitive", &self.case_sensitive)
            .field("materialized", &self.materialized)
            .finish_non_exhaustive()
    }
}

/// Find `name` among `names`, exactly or (when not case sensitive) ignoring ASCII case.
pub(crate) fn resolve_name(names: &[String], name: &str, case_sensitive: bool) -> Option<String> {
    if let Some(exact) = names.iter().find(|n| n.as_str() == name) {
        return Some(exact.clone());
    }
    if case_sensitive {
        return None;
    }
    names.iter().find(|n| n.eq_ignore_ascii_case(name)).cloned()
}

/// Convert Polars AnyValue to serde_json::Value. Dates and timestamps become strings.
fn any_value_to_json(av: AnyValue<'_>) -> JsonValue {
    match av {
        AnyValue::Null => JsonValue::Null,
        AnyValue::Boolean(b) => JsonValue::Bool(b),
        AnyValue::Int8(i) => JsonValue::from(i),
        AnyValue::Int16(i) => JsonValue::from(i),
        AnyValue::Int32(i) => JsonValue::from(i),
        AnyValue::Int64(i) => JsonValue::from(i),
        AnyValue::UInt8(u) => JsonValue::from(u),
        AnyValue::UInt16(u) => JsonValue::from(u),
        AnyValue::UInt32(u) => JsonValue::from(u),
        AnyValue::UInt64(u) => JsonValue::from(u),
        AnyValue::Float32(f) => serde_json::Number::from_f64(f64::from(f))
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AnyValue::Float64(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AnyValue::String(s) => JsonValue::String(s.to_string()),
        AnyValue::StringOwned(s) => JsonValue::String(s.to_string()),
        other => JsonValue::String(format_any_value(&other)),
    }
}
