//! DataFrame transformation operations: filter, select, with_column, order_by,
//! limit, distinct. All of them only extend the lazy plan.

use super::DataFrame;
use crate::error::EngineError;
use crate::functions::{asc, desc, SortOrder};
use polars::prelude::{col, Expr, IdxSize, SortMultipleOptions, UniqueKeepStrategy};

/// Select columns by (already resolved) name.
pub fn select(df: &DataFrame, cols: Vec<&str>) -> Result<DataFrame, EngineError> {
    let exprs: Vec<Expr> = cols.iter().map(|name| col(*name)).collect();
    Ok(df.with_plan(df.lf.clone().select(exprs)))
}

/// Filter rows using a Polars expression.
pub fn filter(df: &DataFrame, condition: Expr) -> Result<DataFrame, EngineError> {
    Ok(df.with_plan(df.lf.clone().filter(condition)))
}

/// Add or replace a column using an expression.
pub fn with_column(df: &DataFrame, column_name: &str, expr: Expr) -> Result<DataFrame, EngineError> {
    Ok(df.with_plan(df.lf.clone().with_column(expr.alias(column_name))))
}

/// Order by columns (sort). Missing `ascending` entries default to ascending.
pub fn order_by(
    df: &DataFrame,
    column_names: Vec<&str>,
    ascending: Vec<bool>,
) -> Result<DataFrame, EngineError> {
    let orders: Vec<SortOrder> = column_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if ascending.get(i).copied().unwrap_or(true) {
                asc(col(*name))
            } else {
                desc(col(*name))
            }
        })
        .collect();
    order_by_exprs(df, orders)
}

/// Order by sort expressions. Ties keep their input order.
pub fn order_by_exprs(df: &DataFrame, sort_orders: Vec<SortOrder>) -> Result<DataFrame, EngineError> {
    if sort_orders.is_empty() {
        return Ok(df.clone());
    }
    let descending: Vec<bool> = sort_orders.iter().map(|o| o.descending).collect();
    let nulls_last: Vec<bool> = sort_orders.iter().map(|o| o.nulls_last).collect();
    let exprs: Vec<Expr> = sort_orders.into_iter().map(|o| o.expr).collect();
    let sorted = df.lf.clone().sort_by_exprs(
        exprs,
        SortMultipleOptions::new()
            .with_order_descending_multi(descending)
            .with_nulls_last_multi(nulls_last)
            .with_maintain_order(true),
    );
    Ok(df.with_plan(sorted))
}

/// Limit: return first n rows.
pub fn limit(df: &DataFrame, n: usize) -> Result<DataFrame, EngineError> {
    let n = IdxSize::try_from(n).unwrap_or(IdxSize::MAX);
    Ok(df.with_plan(df.lf.clone().limit(n)))
}

/// Distinct over all columns, keeping the first occurrence of each row.
pub fn distinct(df: &DataFrame) -> Result<DataFrame, EngineError> {
    Ok(df.with_plan(
        df.lf
            .clone()
            .unique_stable(None, UniqueKeepStrategy::First),
    ))
}
