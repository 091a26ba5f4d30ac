//! Column functions in the PySpark `pyspark.sql.functions` style.
//!
//! Every helper returns a Polars [`Expr`] aliased with the name Spark would give the
//! resulting column, so `avg(col("price"))` comes out as `avg(price)` and
//! `round(avg(col("price")), 2)` as `round(avg(price), 2)`.

use polars::prelude::{len, DataType, Expr, Literal};

/// Name of the column an expression produces, as Spark would print it.
pub fn display_name(expr: &Expr) -> String {
    expr.clone()
        .meta()
        .output_name()
        .map(|n| n.to_string())
        .unwrap_or_else(|_| "<expr>".to_string())
}

/// Reference a column by name.
pub fn col(name: &str) -> Expr {
    polars::prelude::col(name)
}

/// Literal value.
pub fn lit<L: Literal>(value: L) -> Expr {
    polars::prelude::lit(value)
}

/// Sort key: an expression plus its direction. Nulls sort first when ascending and
/// last when descending, as in Spark.
#[derive(Debug, Clone)]
pub struct SortOrder {
    pub expr: Expr,
    pub descending: bool,
    pub nulls_last: bool,
}

impl SortOrder {
    pub fn nulls_first(mut self) -> Self {
        self.nulls_last = false;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls_last = true;
        self
    }
}

pub fn asc(expr: Expr) -> SortOrder {
    SortOrder {
        expr,
        descending: false,
        nulls_last: false,
    }
}

pub fn desc(expr: Expr) -> SortOrder {
    SortOrder {
        expr,
        descending: true,
        nulls_last: true,
    }
}

fn named(expr: Expr, func: &str, arg: &Expr) -> Expr {
    let name = format!("{func}({})", display_name(arg));
    expr.alias(name)
}

/// Year of a date (strings such as `2022-04-08` are parsed first). PySpark year.
pub fn year(e: Expr) -> Expr {
    named(raw::year(e.clone()), "year", &e)
}

/// Month (1-12) of a date. PySpark month.
pub fn month(e: Expr) -> Expr {
    named(raw::month(e.clone()), "month", &e)
}

/// Day of the month (1-31). PySpark dayofmonth.
pub fn dayofmonth(e: Expr) -> Expr {
    named(raw::dayofmonth(e.clone()), "dayofmonth", &e)
}

/// Round half away from zero to `scale` decimals. PySpark round.
pub fn round(e: Expr, scale: u32) -> Expr {
    let name = format!("round({}, {scale})", display_name(&e));
    raw::round(e, scale).alias(name)
}

/// Mean of the non-null values, always a double. PySpark avg.
pub fn avg(e: Expr) -> Expr {
    named(raw::avg(e.clone()), "avg", &e)
}

pub fn sum(e: Expr) -> Expr {
    named(raw::sum(e.clone()), "sum", &e)
}

/// Number of non-null values, as a long. PySpark count.
pub fn count(e: Expr) -> Expr {
    named(raw::count(e.clone()), "count", &e)
}

/// Number of rows, as a long. `count(*)` in SQL.
pub fn count_star() -> Expr {
    raw::count_star().alias("count(1)")
}

pub fn min(e: Expr) -> Expr {
    named(raw::min(e.clone()), "min", &e)
}

pub fn max(e: Expr) -> Expr {
    named(raw::max(e.clone()), "max", &e)
}

/// Unaliased builders shared with the SQL translator, which names its own outputs.
pub(crate) mod raw {
    use super::*;

    pub fn year(e: Expr) -> Expr {
        e.cast(DataType::Date).dt().year()
    }

    pub fn month(e: Expr) -> Expr {
        e.cast(DataType::Date).dt().month()
    }

    pub fn dayofmonth(e: Expr) -> Expr {
        e.cast(DataType::Date).dt().day()
    }

    pub fn round(e: Expr, scale: u32) -> Expr {
        e.round(scale)
    }

    pub fn avg(e: Expr) -> Expr {
        e.cast(DataType::Float64).mean()
    }

    pub fn sum(e: Expr) -> Expr {
        e.sum()
    }

    pub fn count(e: Expr) -> Expr {
        e.count().cast(DataType::Int64)
    }

    pub fn count_distinct(e: Expr) -> Expr {
        e.drop_nulls().n_unique().cast(DataType::Int64)
    }

    pub fn count_star() -> Expr {
        len().cast(DataType::Int64)
    }

    pub fn min(e: Expr) -> Expr {
        e.min()
    }

    pub fn max(e: Expr) -> Expr {
        e.max()
    }
}
