//! The four walkthrough queries over the CSV view, the cached view and the
//! partitioned Parquet reload.

mod common;

use common::{price_pairs, register_sales, spark};
use home_sales::{
    HomeSalesQuery, SaveMode, Stage, Walkthrough, HOME_SALES_VIEW, PARTITIONED_VIEW,
    PARTITION_COLUMN,
};
use tempfile::TempDir;

fn run_all(spark: &home_sales::SparkSession, view: &str) -> Vec<home_sales::PlDataFrame> {
    HomeSalesQuery::ALL
        .iter()
        .map(|q| q.run(spark, view).unwrap().collect().unwrap())
        .collect()
}

#[test]
fn queries_are_idempotent() {
    let tmp = TempDir::new().unwrap();
    let spark = spark();
    register_sales(&spark, tmp.path(), HOME_SALES_VIEW);

    let first = run_all(&spark, HOME_SALES_VIEW);
    let second = run_all(&spark, HOME_SALES_VIEW);
    for (q, (a, b)) in HomeSalesQuery::ALL.iter().zip(first.iter().zip(&second)) {
        assert!(a.height() > 0, "{q:?} returned no rows");
        assert!(a.equals_missing(b), "{q:?} changed between runs");
    }
}

#[test]
fn cache_then_uncache_never_changes_results() {
    let tmp = TempDir::new().unwrap();
    let spark = spark();
    register_sales(&spark, tmp.path(), HOME_SALES_VIEW);

    let uncached = run_all(&spark, HOME_SALES_VIEW);
    spark.catalog().cache_table(HOME_SALES_VIEW).unwrap();
    let cached = run_all(&spark, HOME_SALES_VIEW);
    spark.catalog().uncache_table(HOME_SALES_VIEW).unwrap();
    let after = run_all(&spark, HOME_SALES_VIEW);

    for i in 0..HomeSalesQuery::ALL.len() {
        assert!(uncached[i].equals_missing(&cached[i]));
        assert!(uncached[i].equals_missing(&after[i]));
    }
}

#[test]
fn four_bedroom_prices_by_year_match_cached_and_uncached() {
    let tmp = TempDir::new().unwrap();
    let spark = spark();
    register_sales(&spark, tmp.path(), HOME_SALES_VIEW);
    let q = HomeSalesQuery::FourBedroomPriceByYear;

    let before = price_pairs(&q.run(&spark, HOME_SALES_VIEW).unwrap().collect().unwrap(), "year");
    spark.catalog().cache_table(HOME_SALES_VIEW).unwrap();
    let during = price_pairs(&q.run(&spark, HOME_SALES_VIEW).unwrap().collect().unwrap(), "year");

    assert_eq!(before, during);
    let years: Vec<i64> = before.iter().map(|(y, _)| *y).collect();
    assert_eq!(years, vec![2019, 2020, 2021, 2022]);
    for (_, price) in &before {
        assert_eq!((price * 100.0).round() / 100.0, *price);
    }
}

#[test]
fn view_rating_query_filters_and_orders() {
    let tmp = TempDir::new().unwrap();
    let spark = spark();
    register_sales(&spark, tmp.path(), HOME_SALES_VIEW);

    let result = HomeSalesQuery::PriceByViewRating
        .run(&spark, HOME_SALES_VIEW)
        .unwrap()
        .collect()
        .unwrap();
    assert_eq!(
        result.get_column_names_str(),
        vec!["view", "average_price"]
    );
    let pairs = price_pairs(&result, "view");
    assert!(!pairs.is_empty());
    assert!(pairs.iter().all(|(_, p)| *p >= 349_999.995));
    assert!(pairs.windows(2).all(|w| w[0].0 > w[1].0));
}

#[test]
fn view_rating_query_matches_on_partitioned_reload() {
    let tmp = TempDir::new().unwrap();
    let spark = spark();
    register_sales(&spark, tmp.path(), HOME_SALES_VIEW);
    let out = tmp.path().join("home_parquet");

    spark
        .table(HOME_SALES_VIEW)
        .unwrap()
        .write()
        .mode(SaveMode::Overwrite)
        .partition_by([PARTITION_COLUMN])
        .parquet(&out)
        .unwrap();
    let reloaded = spark.read_parquet(&out).unwrap();
    spark.create_or_replace_temp_view(PARTITIONED_VIEW, reloaded);

    let q = HomeSalesQuery::PriceByViewRating;
    let from_csv = q.run(&spark, HOME_SALES_VIEW).unwrap().collect().unwrap();
    let from_parquet = q.run(&spark, PARTITIONED_VIEW).unwrap().collect().unwrap();
    assert!(from_csv.equals_missing(&from_parquet));

    let by_built = HomeSalesQuery::ThreeBedThreeBathByYearBuilt;
    assert_eq!(
        price_pairs(&by_built.run(&spark, HOME_SALES_VIEW).unwrap().collect().unwrap(), "date_built"),
        price_pairs(&by_built.run(&spark, PARTITIONED_VIEW).unwrap().collect().unwrap(), "date_built"),
    );
}

#[test]
fn sql_and_dataframe_api_agree_on_csv_data() {
    let tmp = TempDir::new().unwrap();
    let spark = spark();
    register_sales(&spark, tmp.path(), HOME_SALES_VIEW);
    let df = spark.table(HOME_SALES_VIEW).unwrap();
    for q in HomeSalesQuery::ALL {
        let via_sql = q.run(&spark, HOME_SALES_VIEW).unwrap().collect().unwrap();
        let via_api = q.apply(&df).unwrap().collect().unwrap();
        assert!(via_sql.equals_missing(&via_api), "{q:?}");
    }
}

#[test]
fn walkthrough_reports_each_stage() {
    let tmp = TempDir::new().unwrap();
    let csv = common::write_sales_csv(tmp.path());
    let spark = spark();

    let report = Walkthrough::new(spark.clone(), &csv, tmp.path().join("home_parquet"))
        .show_rows(5)
        .run()
        .unwrap();
    assert_eq!(report.rows, common::SALES_ROWS);
    assert_eq!(report.partitions.len(), 8);
    assert!(report.partitions.iter().all(|p| p.starts_with("date_built=")));
    assert!(report.cached_after_cache);
    assert!(!report.cached_after_uncache);
    assert!(report.uncached_elapsed().is_some());
    assert!(report.cached_elapsed().is_some());
    assert!(report.parquet_elapsed().is_some());

    let cached = report
        .run(HomeSalesQuery::PriceByViewRating, Stage::Cached)
        .unwrap();
    let parquet = report
        .run(HomeSalesQuery::PriceByViewRating, Stage::Parquet)
        .unwrap();
    assert_eq!(parquet.view, PARTITIONED_VIEW);
    assert!(cached.result.equals_missing(&parquet.result));

    assert!(!spark.catalog().is_cached(HOME_SALES_VIEW).unwrap());
    assert!(spark.catalog().table_exists(PARTITIONED_VIEW));

    let text = report.render().unwrap();
    for q in HomeSalesQuery::ALL {
        assert!(text.contains(q.title()));
    }
    assert!(text.contains("only showing top 5 rows"));
}
