//! Home Sales: ad-hoc SQL aggregation over a home sales CSV.
//!
//! A PySpark-like surface (session, temp views, cache/uncache, SQL, partitioned
//! Parquet writes) on top of Polars lazy frames, plus the home sales walkthrough that
//! compares query latency uncached, cached and over a partitioned Parquet copy.

pub mod config;
pub mod dataframe;
pub mod error;
pub mod functions;
pub mod home_sales;
pub mod io;
pub mod schema;
pub mod session;
pub mod sql;

/// Re-export for DataFrame::from_polars and collected results.
pub use polars::prelude::DataFrame as PlDataFrame;

pub use config::SparklessConfig;
pub use dataframe::{DataFrame, DataFrameWriter, GroupedData, SaveMode, WriteSummary};
pub use error::EngineError;
pub use functions::*;
pub use home_sales::{
    HomeSalesQuery, QueryRun, Stage, Walkthrough, WalkthroughReport, HOME_SALES_VIEW,
    PARTITIONED_VIEW, PARTITION_COLUMN,
};
pub use io::{CsvOptions, FileFormat};
pub use schema::{DataType, StructField, StructType};
pub use session::{Catalog, DataFrameReader, SparkSession, SparkSessionBuilder};
