//! GroupBy and aggregation operations.

use super::DataFrame;
use crate::error::EngineError;
use polars::prelude::{col, len, DataType, Expr, LazyGroupBy};

/// GroupedData - represents a DataFrame grouped by certain keys.
/// Similar to PySpark's GroupedData. Output columns are the keys followed by the
/// aggregates; groups appear in first-seen order.
pub struct GroupedData {
    pub(super) lazy_grouped: LazyGroupBy,
    /// Ungrouped input, used to resolve aggregate column names.
    pub(super) source: DataFrame,
}

impl GroupedData {
    fn finish(&self, aggs: Vec<Expr>) -> DataFrame {
        DataFrame::from_lazy(self.lazy_grouped.clone().agg(aggs), self.source.case_sensitive)
    }

    /// Aggregate with arbitrary expressions, e.g. `avg("price")`.
    pub fn agg(&self, aggs: Vec<Expr>) -> Result<DataFrame, EngineError> {
        if aggs.is_empty() {
            return Err(EngineError::User(
                "agg: at least one aggregate expression is required".into(),
            ));
        }
        Ok(self.finish(aggs))
    }

    /// Count rows in each group
    pub fn count(&self) -> Result<DataFrame, EngineError> {
        Ok(self.finish(vec![len().cast(DataType::Int64).alias("count")]))
    }

    fn simple_agg(
        &self,
        column: &str,
        name: &str,
        f: impl FnOnce(Expr) -> Expr,
    ) -> Result<DataFrame, EngineError> {
        let resolved = self.source.resolve_column_name(column)?;
        let agg = f(col(resolved.as_str())).alias(format!("{name}({resolved})"));
        Ok(self.finish(vec![agg]))
    }

    /// Average (mean) of a column in each group
    pub fn avg(&self, column: &str) -> Result<DataFrame, EngineError> {
        self.simple_agg(column, "avg", |c| c.mean())
    }

    /// Sum a column in each group
    pub fn sum(&self, column: &str) -> Result<DataFrame, EngineError> {
        self.simple_agg(column, "sum", |c| c.sum())
    }

    /// Minimum value of a column in each group
    pub fn min(&self, column: &str) -> Result<DataFrame, EngineError> {
        self.simple_agg(column, "min", |c| c.min())
    }

    /// Maximum value of a column in each group
    pub fn max(&self, column: &str) -> Result<DataFrame, EngineError> {
        self.simple_agg(column, "max", |c| c.max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    fn sales() -> DataFrame {
        DataFrame::from_polars(
            df![
                "date_built" => &[1990i64, 2001, 1990, 2001, 1975],
                "price" => &[100i64, 300, 200, 500, 50],
            ]
            .unwrap(),
        )
    }

    #[test]
    fn avg_keeps_group_order_and_spark_name() {
        let out = sales()
            .group_by(vec!["date_built"])
            .unwrap()
            .avg("price")
            .unwrap();
        assert_eq!(out.columns().unwrap(), vec!["date_built", "avg(price)"]);
        let rows = out.collect_as_json_rows().unwrap();
        assert_eq!(rows[0]["date_built"].as_i64(), Some(1990));
        assert_eq!(rows[0]["avg(price)"].as_f64(), Some(150.0));
        assert_eq!(rows[1]["avg(price)"].as_f64(), Some(400.0));
        assert_eq!(rows[2]["date_built"].as_i64(), Some(1975));
    }

    #[test]
    fn count_is_long() {
        let out = sales().group_by(vec!["DATE_BUILT"]).unwrap().count().unwrap();
        let rows = out.collect_as_json_rows().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["count"].as_i64(), Some(2));
    }

    #[test]
    fn aggregate_columns_resolve_case_insensitively() {
        let out = sales()
            .group_by(vec!["DATE_BUILT"])
            .unwrap()
            .avg("PRICE")
            .unwrap();
        assert_eq!(out.columns().unwrap(), vec!["date_built", "avg(price)"]);
        assert_eq!(out.count().unwrap(), 3);

        let grouped = sales().group_by(vec!["date_built"]).unwrap();
        assert_eq!(
            grouped.max("Price").unwrap().collect_as_json_rows().unwrap()[1]["max(price)"].as_i64(),
            Some(500)
        );
        assert!(matches!(grouped.min("sqft"), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn case_sensitive_frames_reject_other_spellings() {
        let frame = sales();
        let strict = DataFrame::from_polars_with_options(frame.collect().unwrap(), true);
        let grouped = strict.group_by(vec!["date_built"]).unwrap();
        assert!(matches!(grouped.avg("PRICE"), Err(EngineError::NotFound(_))));
        assert!(grouped.avg("price").is_ok());
    }

    #[test]
    fn empty_agg_is_rejected() {
        let grouped = sales().group_by(vec!["date_built"]).unwrap();
        assert!(matches!(grouped.agg(vec![]), Err(EngineError::User(_))));
        let sums = grouped.sum("price").unwrap().collect_as_json_rows().unwrap();
        assert_eq!(sums[1]["sum(price)"].as_i64(), Some(800));
    }
}
