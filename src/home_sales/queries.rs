use polars::prelude::Expr;

use crate::dataframe::DataFrame;
use crate::error::EngineError;
use crate::functions::{asc, avg, col, desc, lit, round, year};
use crate::session::SparkSession;

const AVERAGE_PRICE: &str = "average_price";
const MIN_VIEW_AVERAGE_PRICE: f64 = 350_000.0;

/// The walkthrough's aggregation queries. Each one can run as SQL against a view name
/// or through the DataFrame API; both forms return the same rows in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HomeSalesQuery {
    /// Average price of four-bedroom homes per sale year.
    FourBedroomPriceByYear,
    /// Average price of 3 bed / 3 bath homes per year built.
    ThreeBedThreeBathByYearBuilt,
    /// Same, restricted to two floors and at least 2,000 sq ft.
    ThreeBedThreeBathTwoFloorsByYearBuilt,
    /// Average price per view rating, keeping ratings averaging at least $350,000.
    /// This is the query timed across uncached, cached and Parquet runs.
    PriceByViewRating,
}

impl HomeSalesQuery {
    pub const ALL: [HomeSalesQuery; 4] = [
        HomeSalesQuery::FourBedroomPriceByYear,
        HomeSalesQuery::ThreeBedThreeBathByYearBuilt,
        HomeSalesQuery::ThreeBedThreeBathTwoFloorsByYearBuilt,
        HomeSalesQuery::PriceByViewRating,
    ];

    /// The question the query answers, as printed above its result.
    pub fn title(&self) -> &'static str {
        match self {
            HomeSalesQuery::FourBedroomPriceByYear => {
                "What is the average price for a four bedroom house sold per year, rounded to two decimal places?"
            }
            HomeSalesQuery::ThreeBedThreeBathByYearBuilt => {
                "What is the average price of a home for each year the home was built, that have 3 bedrooms and 3 bathrooms, rounded to two decimal places?"
            }
            HomeSalesQuery::ThreeBedThreeBathTwoFloorsByYearBuilt => {
                "What is the average price of a home for each year the home was built, that have 3 bedrooms, 3 bathrooms, with two floors, and are greater than or equal to 2,000 square feet, rounded to two decimal places?"
            }
            HomeSalesQuery::PriceByViewRating => {
                "What is the average price of a home per \"view\" rating, rounded to two decimal places, having an average home price greater than or equal to $350,000?"
            }
        }
    }

    /// SQL text of the query against `view`.
    pub fn sql(&self, view: &str) -> String {
        match self {
            HomeSalesQuery::FourBedroomPriceByYear => format!(
                "SELECT YEAR(date) AS year, ROUND(AVG(price), 2) AS {AVERAGE_PRICE} \
                 FROM {view} WHERE bedrooms == 4 \
                 GROUP BY YEAR(date) ORDER BY year"
            ),
            HomeSalesQuery::ThreeBedThreeBathByYearBuilt => format!(
                "SELECT date_built, ROUND(AVG(price), 2) AS {AVERAGE_PRICE} \
                 FROM {view} WHERE bedrooms == 3 AND bathrooms == 3 \
                 GROUP BY date_built ORDER BY date_built"
            ),
            HomeSalesQuery::ThreeBedThreeBathTwoFloorsByYearBuilt => format!(
                "SELECT date_built, ROUND(AVG(price), 2) AS {AVERAGE_PRICE} \
                 FROM {view} WHERE bedrooms == 3 AND bathrooms == 3 \
                 AND floors == 2 AND sqft_living >= 2000 \
                 GROUP BY date_built ORDER BY date_built"
            ),
            HomeSalesQuery::PriceByViewRating => format!(
                "SELECT view, ROUND(AVG(price), 2) AS {AVERAGE_PRICE} \
                 FROM {view} GROUP BY view \
                 HAVING AVG(price) >= {MIN_VIEW_AVERAGE_PRICE} ORDER BY view DESC"
            ),
        }
    }

    /// Run the query as SQL against a registered view.
    pub fn run(&self, session: &SparkSession, view: &str) -> Result<DataFrame, EngineError> {
        session
            .sql(&self.sql(view))
            .map_err(|e| e.with_context(format!("{self:?} on {view}")))
    }

    /// Build the same query with the DataFrame API.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame, EngineError> {
        let c = |name: &str| -> Result<Expr, EngineError> { Ok(col(&df.resolve_column_name(name)?)) };
        let average_price = || -> Result<Expr, EngineError> {
            Ok(round(avg(c("price")?), 2).alias(AVERAGE_PRICE))
        };
        let three_by_three = || -> Result<Expr, EngineError> {
            Ok(c("bedrooms")?
                .eq(lit(3i64))
                .and(c("bathrooms")?.eq(lit(3i64))))
        };
        match self {
            HomeSalesQuery::FourBedroomPriceByYear => df
                .filter(c("bedrooms")?.eq(lit(4i64)))?
                .group_by_exprs(vec![year(c("date")?).alias("year")])
                .agg(vec![average_price()?])?
                .order_by_exprs(vec![asc(col("year"))]),
            HomeSalesQuery::ThreeBedThreeBathByYearBuilt => {
                let built = df.resolve_column_name("date_built")?;
                df.filter(three_by_three()?)?
                    .group_by(vec![built.as_str()])?
                    .agg(vec![average_price()?])?
                    .order_by_exprs(vec![asc(col(&built))])
            }
            HomeSalesQuery::ThreeBedThreeBathTwoFloorsByYearBuilt => {
                let built = df.resolve_column_name("date_built")?;
                let predicate = three_by_three()?
                    .and(c("floors")?.eq(lit(2i64)))
                    .and(c("sqft_living")?.gt_eq(lit(2000i64)));
                df.filter(predicate)?
                    .group_by(vec![built.as_str()])?
                    .agg(vec![average_price()?])?
                    .order_by_exprs(vec![asc(col(&built))])
            }
            HomeSalesQuery::PriceByViewRating => {
                let view = df.resolve_column_name("view")?;
                let grouped = df.group_by(vec![view.as_str()])?.agg(vec![
                    average_price()?,
                    avg(c("price")?).alias("__avg_price"),
                ])?;
                grouped
                    .filter(col("__avg_price").gt_eq(lit(MIN_VIEW_AVERAGE_PRICE)))?
                    .order_by_exprs(vec![desc(col(&view))])?
                    .select(vec![view.as_str(), AVERAGE_PRICE])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    fn sales() -> DataFrame {
        DataFrame::from_polars(
            df![
                "date" => &["2019-01-02", "2020-03-04", "2019-05-06", "2020-07-08", "2021-09-10", "2021-10-11"],
                "date_built" => &[2001i64, 2001, 1999, 2010, 2010, 2001],
                "price" => &[400_000i64, 300_000, 200_000, 500_000, 350_000, 250_000],
                "bedrooms" => &[4i64, 3, 3, 4, 3, 3],
                "bathrooms" => &[2i64, 3, 3, 2, 3, 3],
                "floors" => &[1i64, 2, 1, 2, 2, 2],
                "sqft_living" => &[1800i64, 2500, 1500, 3000, 2100, 1900],
                "view" => &[1i64, 2, 0, 2, 1, 0],
            ]
            .unwrap(),
        )
    }

    fn pairs(df: &DataFrame, key: &str) -> Vec<(i64, f64)> {
        df.collect_as_json_rows()
            .unwrap()
            .iter()
            .map(|r| (r[key].as_i64().unwrap(), r[AVERAGE_PRICE].as_f64().unwrap()))
            .collect()
    }

    #[test]
    fn sql_text_targets_the_view() {
        let sql = HomeSalesQuery::PriceByViewRating.sql("partitioned_home_sales");
        assert!(sql.contains("FROM partitioned_home_sales"));
        assert!(sql.contains("HAVING AVG(price) >= 350000"));
    }

    #[test]
    fn dataframe_forms_answer_each_question() {
        let df = sales();
        let q1 = HomeSalesQuery::FourBedroomPriceByYear.apply(&df).unwrap();
        assert_eq!(q1.columns().unwrap(), vec!["year", AVERAGE_PRICE]);
        assert_eq!(pairs(&q1, "year"), vec![(2019, 400_000.0), (2020, 500_000.0)]);

        let q2 = HomeSalesQuery::ThreeBedThreeBathByYearBuilt.apply(&df).unwrap();
        assert_eq!(
            pairs(&q2, "date_built"),
            vec![(1999, 200_000.0), (2001, 275_000.0), (2010, 350_000.0)]
        );

        let q3 = HomeSalesQuery::ThreeBedThreeBathTwoFloorsByYearBuilt.apply(&df).unwrap();
        assert_eq!(pairs(&q3, "date_built"), vec![(2001, 300_000.0), (2010, 350_000.0)]);

        let q4 = HomeSalesQuery::PriceByViewRating.apply(&df).unwrap();
        assert_eq!(q4.columns().unwrap(), vec!["view", AVERAGE_PRICE]);
        assert_eq!(pairs(&q4, "view"), vec![(2, 400_000.0), (1, 375_000.0)]);
    }

    #[test]
    fn sql_and_dataframe_forms_agree() {
        let spark = SparkSession::default();
        spark.create_or_replace_temp_view("home_sales", sales());
        for q in HomeSalesQuery::ALL {
            let via_sql = q.run(&spark, "home_sales").unwrap().collect().unwrap();
            let via_api = q.apply(&sales()).unwrap().collect().unwrap();
            assert!(via_sql.equals_missing(&via_api), "{q:?} differs");
        }
    }
}
