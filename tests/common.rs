//! Shared helpers for integration tests (SparkSession and home sales fixtures).

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use home_sales::{DataFrame, SparkSession};

/// Rows in the generated home sales CSV.
pub const SALES_ROWS: usize = 240;

/// Create a SparkSession with a descriptive app name for tests.
pub fn spark() -> SparkSession {
    SparkSession::builder()
        .app_name("home_sales_tests")
        .get_or_create()
}

/// Deterministic home sales data in the walkthrough's CSV layout. Every
/// bedroom/bathroom/floor combination the queries filter on occurs, and
/// `date_built` takes eight distinct values.
pub fn sales_csv() -> String {
    let mut out = String::from(
        "id,date,date_built,price,bedrooms,bathrooms,sqft_living,sqft_lot,floors,waterfront,view\n",
    );
    for i in 0..SALES_ROWS {
        let year = 2019 + i % 4;
        let month = 1 + i % 12;
        let day = 1 + i % 28;
        let built = 1980 + (i % 8) * 5;
        let price = 180_000 + ((i * 7919) % 400) * 1_000;
        let bedrooms = 2 + i % 3;
        let bathrooms = 2 + (i / 3) % 3;
        let sqft_living = 1_200 + (i * 37) % 2_000;
        let sqft_lot = 4_000 + (i * 53) % 6_000;
        let floors = 1 + (i / 2) % 2;
        let waterfront = u8::from(i % 10 == 0);
        let view = (i * 13) % 100;
        let _ = writeln!(
            out,
            "id{i:04},{year}-{month:02}-{day:02},{built},{price},{bedrooms},{bathrooms},\
             {sqft_living},{sqft_lot},{floors},{waterfront},{view}"
        );
    }
    out
}

/// Write [`sales_csv`] to `dir/home_sales_revised.csv`.
pub fn write_sales_csv(dir: &Path) -> PathBuf {
    let path = dir.join("home_sales_revised.csv");
    fs::write(&path, sales_csv()).unwrap();
    path
}

/// Write the fixture CSV under `dir`, load it and register it as `view`.
pub fn register_sales(spark: &SparkSession, dir: &Path, view: &str) -> PathBuf {
    let path = write_sales_csv(dir);
    let df: DataFrame = spark.read().option("header", "true").csv(&path).unwrap();
    spark.create_or_replace_temp_view(view, df);
    path
}

/// `(key, average_price)` pairs of a query result, in result order.
pub fn price_pairs(df: &home_sales::PlDataFrame, key: &str) -> Vec<(i64, f64)> {
    let keys = df.column(key).unwrap().cast(&polars::prelude::DataType::Int64).unwrap();
    let keys = keys.as_materialized_series().i64().unwrap();
    let prices = df.column("average_price").unwrap().as_materialized_series().f64().unwrap();
    keys.into_iter()
        .zip(prices)
        .map(|(k, p)| (k.unwrap(), p.unwrap()))
        .collect()
}

/// Rows of `df` as sorted strings, for order-insensitive multiset comparison.
pub fn row_multiset(df: &home_sales::PlDataFrame, columns: &[&str]) -> Vec<String> {
    let picked = df.select(columns.iter().copied()).unwrap();
    let mut rows: Vec<String> = (0..picked.height())
        .map(|i| {
            picked
                .get_columns()
                .iter()
                .map(|c| c.get(i).unwrap().to_string())
                .collect::<Vec<_>>()
                .join("|")
        })
        .collect();
    rows.sort();
    rows
}
