//! SparkSession: entry point for reading data, registering temp views and running SQL.

mod builder;
mod catalog;
mod reader;

pub use builder::SparkSessionBuilder;
pub use catalog::Catalog;
pub use reader::DataFrameReader;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use polars::prelude::DataFrame as PlDataFrame;

use crate::config::{
    parse_bool, SparklessConfig, APP_NAME_KEY, CASE_SENSITIVE_KEY, INFER_SCHEMA_LENGTH_KEY,
    SHOW_ROWS_KEY, WAREHOUSE_DIR_KEY,
};
use crate::dataframe::DataFrame;
use crate::error::EngineError;

const DEFAULT_APP_NAME: &str = "home_sales";
const DEFAULT_SHOW_ROWS: usize = 20;

/// A registered temp view: its plan plus, once cached, the materialized rows.
#[derive(Clone)]
pub(crate) struct TempView {
    /// Name as it was registered (lookups ignore case).
    pub(crate) name: String,
    pub(crate) plan: DataFrame,
    pub(crate) cached: Option<PlDataFrame>,
    /// Unique per registration; a replaced view never reuses one.
    pub(crate) generation: u64,
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(0);

type ViewMap = HashMap<String, TempView>;

fn view_key(name: &str) -> String {
    name.to_lowercase()
}

/// Main entry point for creating DataFrames and executing queries.
/// Similar to PySpark's SparkSession but using Polars as the backend.
///
/// Cloning is cheap: clones share the same temp-view catalog.
#[derive(Clone)]
pub struct SparkSession {
    app_name: Option<String>,
    master: Option<String>,
    config: HashMap<String, String>,
    views: Arc<RwLock<ViewMap>>,
}

impl SparkSession {
    pub fn new(
        app_name: Option<String>,
        master: Option<String>,
        config: HashMap<String, String>,
    ) -> Self {
        SparkSession {
            app_name,
            master,
            config,
            views: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn builder() -> SparkSessionBuilder {
        SparkSessionBuilder::new()
    }

    /// Create a session from a [`SparklessConfig`].
    pub fn from_config(config: &SparklessConfig) -> Self {
        Self::builder().with_config(config).get_or_create()
    }

    pub fn app_name(&self) -> &str {
        self.app_name
            .as_deref()
            .or_else(|| self.config.get(APP_NAME_KEY).map(String::as_str))
            .unwrap_or(DEFAULT_APP_NAME)
    }

    pub fn master(&self) -> Option<&str> {
        self.master.as_deref()
    }

    /// Raw session config value.
    pub fn get_config(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// `spark.sql.caseSensitive` (default false).
    pub fn is_case_sensitive(&self) -> bool {
        self.config
            .get(CASE_SENSITIVE_KEY)
            .and_then(|v| parse_bool(v))
            .unwrap_or(false)
    }

    /// Rows used for CSV schema inference; `None` scans the whole file.
    pub fn infer_schema_length(&self) -> Option<usize> {
        self.config
            .get(INFER_SCHEMA_LENGTH_KEY)
            .and_then(|v| v.trim().parse().ok())
    }

    /// Default row count for `show`.
    pub fn show_rows(&self) -> usize {
        self.config
            .get(SHOW_ROWS_KEY)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_SHOW_ROWS)
    }

    /// Resolve a write destination: relative paths land under `spark.sql.warehouse.dir`
    /// when it is set.
    pub fn warehouse_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match self.config.get(WAREHOUSE_DIR_KEY) {
            Some(dir) if path.is_relative() => Path::new(dir).join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Create a DataFrame from a Polars DataFrame
    pub fn create_dataframe_from_polars(&self, df: PlDataFrame) -> DataFrame {
        DataFrame::from_polars_with_options(df, self.is_case_sensitive())
    }

    /// Get a DataFrameReader for reading files
    pub fn read(&self) -> DataFrameReader {
        DataFrameReader::new(self.clone())
    }

    /// Read a CSV file (header, inferred schema).
    pub fn read_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame, EngineError> {
        self.read().csv(path)
    }

    /// Read a Parquet file or a (possibly hive-partitioned) Parquet directory.
    pub fn read_parquet(&self, path: impl AsRef<Path>) -> Result<DataFrame, EngineError> {
        self.read().parquet(path)
    }

    pub(crate) fn views(&self) -> RwLockReadGuard<'_, ViewMap> {
        self.views.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn views_mut(&self) -> RwLockWriteGuard<'_, ViewMap> {
        self.views.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a DataFrame as a temporary view so it can be queried with `sql()`.
    /// Re-registering the same name replaces the view and drops any cached data for it.
    pub fn create_or_replace_temp_view(&self, name: &str, df: DataFrame) {
        let previous = self.views_mut().insert(
            view_key(name),
            TempView {
                name: name.to_string(),
                plan: df,
                cached: None,
                generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            },
        );
        if previous.is_some_and(|v| v.cached.is_some()) {
            log::info!("replaced cached view '{name}'; its cache was dropped");
        } else {
            log::debug!("registered temp view '{name}'");
        }
    }

    /// Return the DataFrame for a registered view. Cached views read from memory.
    pub fn table(&self, name: &str) -> Result<DataFrame, EngineError> {
        let views = self.views();
        let view = views.get(&view_key(name)).ok_or_else(|| {
            EngineError::NotFound(format!(
                "Table or view '{name}' not found. Register it with create_or_replace_temp_view."
            ))
        })?;
        Ok(match &view.cached {
            Some(rows) => DataFrame::from_polars_with_options(rows.clone(), self.is_case_sensitive()),
            None => view.plan.clone(),
        })
    }

    /// Catalog interface: cache state and view management.
    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(self)
    }

    /// Execute a SQL statement over the registered views.
    /// `CACHE TABLE` / `UNCACHE TABLE` return an empty DataFrame.
    pub fn sql(&self, query: &str) -> Result<DataFrame, EngineError> {
        crate::sql::execute_sql(self, query)
    }

    /// Drop every cached view. Views stay registered.
    pub fn stop(&self) {
        self.catalog().clear_cache();
        log::debug!("session '{}' stopped", self.app_name());
    }
}

impl Default for SparkSession {
    fn default() -> Self {
        Self::builder().get_or_create()
    }
}
