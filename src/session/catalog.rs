//! PySpark `spark.catalog`: temp-view listing and in-memory caching.

use polars::prelude::DataFrame as PlDataFrame;

use super::{view_key, SparkSession};
use crate::dataframe::DataFrame;
use crate::error::EngineError;

/// Catalog operations over a session's temp views.
pub struct Catalog<'a> {
    session: &'a SparkSession,
}

fn not_found(name: &str) -> EngineError {
    EngineError::NotFound(format!("Table or view '{name}' not found"))
}

impl<'a> Catalog<'a> {
    pub(super) fn new(session: &'a SparkSession) -> Self {
        Catalog { session }
    }

    /// Materialize a view in memory. Later reads of the view (`table`, SQL) use the
    /// materialized rows. Caching an already cached view is a no-op. If the view is
    /// replaced while its rows are collected, the replacement is cached instead.
    pub fn cache_table(&self, name: &str) -> Result<(), EngineError> {
        loop {
            let Some((plan, generation)) = self.uncached_plan(name)? else {
                return Ok(());
            };
            // executed outside the lock
            let rows = plan
                .collect()
                .map_err(|e| e.with_context(format!("cache table {name}")))?;
            if self.install_cache(name, generation, rows)? {
                return Ok(());
            }
            log::debug!("view '{name}' was replaced while caching, retrying");
        }
    }

    /// Plan and generation of `name`, or `None` when it is already cached.
    fn uncached_plan(&self, name: &str) -> Result<Option<(DataFrame, u64)>, EngineError> {
        let views = self.session.views();
        let view = views.get(&view_key(name)).ok_or_else(|| not_found(name))?;
        if view.cached.is_some() {
            log::debug!("view '{}' is already cached", view.name);
            return Ok(None);
        }
        Ok(Some((view.plan.clone(), view.generation)))
    }

    /// Store `rows` as the cache of `name` if it is still the registration they
    /// were collected from. Returns false when the view was replaced meanwhile.
    fn install_cache(
        &self,
        name: &str,
        generation: u64,
        rows: PlDataFrame,
    ) -> Result<bool, EngineError> {
        let mut views = self.session.views_mut();
        let view = views.get_mut(&view_key(name)).ok_or_else(|| not_found(name))?;
        if view.generation != generation {
            return Ok(false);
        }
        let n = rows.height();
        view.cached = Some(rows);
        log::info!("cached view '{}' ({} rows)", view.name, n);
        Ok(true)
    }

    /// Drop the in-memory copy of a view. Uncaching a view that is not cached is a no-op.
    pub fn uncache_table(&self, name: &str) -> Result<(), EngineError> {
        let mut views = self.session.views_mut();
        let view = views.get_mut(&view_key(name)).ok_or_else(|| not_found(name))?;
        if view.cached.take().is_some() {
            log::info!("uncached view '{}'", view.name);
        }
        Ok(())
    }

    pub fn is_cached(&self, name: &str) -> Result<bool, EngineError> {
        self.session
            .views()
            .get(&view_key(name))
            .map(|v| v.cached.is_some())
            .ok_or_else(|| not_found(name))
    }

    /// Uncache every view.
    pub fn clear_cache(&self) {
        let mut views = self.session.views_mut();
        let mut dropped = 0;
        for view in views.values_mut() {
            if view.cached.take().is_some() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            log::info!("cleared cache ({dropped} views)");
        }
    }

    /// Registered view names, sorted.
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .session
            .views()
            .values()
            .map(|v| v.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.session.views().contains_key(&view_key(name))
    }

    /// Remove a view. Returns whether it existed.
    pub fn drop_temp_view(&self, name: &str) -> bool {
        let removed = self.session.views_mut().remove(&view_key(name)).is_some();
        if removed {
            log::debug!("dropped temp view '{name}'");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    fn spark_with_view() -> SparkSession {
        let spark = SparkSession::default();
        let df = spark.create_dataframe_from_polars(
            df![
                "view" => &[0i64, 1, 1],
                "price" => &[1.0f64, 2.0, 3.0],
            ]
            .unwrap(),
        );
        spark.create_or_replace_temp_view("home_sales", df);
        spark
    }

    #[test]
    fn cache_then_uncache() {
        let spark = spark_with_view();
        let catalog = spark.catalog();
        assert!(!catalog.is_cached("home_sales").unwrap());
        catalog.cache_table("HOME_SALES").unwrap();
        assert!(catalog.is_cached("home_sales").unwrap());
        assert!(spark.table("home_sales").unwrap().is_materialized());
        catalog.cache_table("home_sales").unwrap();
        catalog.uncache_table("home_sales").unwrap();
        assert!(!catalog.is_cached("home_sales").unwrap());
        catalog.uncache_table("home_sales").unwrap();
    }

    #[test]
    fn rows_of_a_replaced_view_are_not_installed() {
        let spark = spark_with_view();
        let catalog = spark.catalog();
        let (plan, generation) = catalog.uncached_plan("home_sales").unwrap().unwrap();
        let stale = plan.collect().unwrap();

        let replacement = spark.create_dataframe_from_polars(
            df!["view" => &[4i64], "price" => &[9.0f64]].unwrap(),
        );
        spark.create_or_replace_temp_view("home_sales", replacement);
        assert!(!catalog.install_cache("home_sales", generation, stale).unwrap());
        assert!(!catalog.is_cached("home_sales").unwrap());

        catalog.cache_table("home_sales").unwrap();
        assert_eq!(spark.table("home_sales").unwrap().count().unwrap(), 1);
    }

    #[test]
    fn re_registering_a_name_gets_a_new_generation() {
        let spark = spark_with_view();
        let catalog = spark.catalog();
        let (_, first) = catalog.uncached_plan("home_sales").unwrap().unwrap();
        assert!(catalog.drop_temp_view("home_sales"));
        let again = spark.create_dataframe_from_polars(df!["view" => &[0i64]].unwrap());
        spark.create_or_replace_temp_view("home_sales", again);
        let (_, second) = catalog.uncached_plan("home_sales").unwrap().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn unknown_views_are_not_found() {
        let spark = spark_with_view();
        let catalog = spark.catalog();
        assert!(matches!(catalog.cache_table("nope"), Err(EngineError::NotFound(_))));
        assert!(matches!(catalog.uncache_table("nope"), Err(EngineError::NotFound(_))));
        assert!(matches!(catalog.is_cached("nope"), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn list_and_drop() {
        let spark = spark_with_view();
        let catalog = spark.catalog();
        spark.create_or_replace_temp_view("Partitioned_Home_Sales", spark.table("home_sales").unwrap());
        assert_eq!(catalog.list_tables(), vec!["Partitioned_Home_Sales", "home_sales"]);
        assert!(catalog.drop_temp_view("partitioned_home_sales"));
        assert!(!catalog.drop_temp_view("partitioned_home_sales"));
        assert!(!catalog.table_exists("partitioned_home_sales"));
        assert!(catalog.table_exists("home_sales"));
    }
}
