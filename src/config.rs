//! Configuration for home-sales sessions.
//!
//! Use [`SparklessConfig`] to configure a session from code, a JSON document or
//! environment variables, then create a session with
//! [`SparkSession::from_config`](crate::SparkSession::from_config).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Session config key for case-sensitive column resolution (PySpark default: false).
pub const CASE_SENSITIVE_KEY: &str = "spark.sql.caseSensitive";
/// Session config key for the default output directory of writes.
pub const WAREHOUSE_DIR_KEY: &str = "spark.sql.warehouse.dir";
/// Session config key for the number of rows used for CSV schema inference.
pub const INFER_SCHEMA_LENGTH_KEY: &str = "spark.sql.csv.inferSchemaLength";
/// Session config key for the default number of rows printed by `show`.
pub const SHOW_ROWS_KEY: &str = "spark.sql.repl.eagerEval.maxNumRows";
pub const APP_NAME_KEY: &str = "spark.app.name";

const ENV_PREFIX: &str = "HOME_SALES_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparklessConfig {
    pub app_name: String,
    pub case_sensitive: bool,
    /// Root for relative write destinations; `None` writes relative to the working dir.
    pub warehouse_dir: Option<PathBuf>,
    /// Rows scanned to infer CSV column types; `None` scans the whole file.
    pub infer_schema_length: Option<usize>,
    pub show_rows: usize,
    /// Extra `spark.*` keys passed through to the session untouched.
    pub extra: HashMap<String, String>,
}

impl Default for SparklessConfig {
    fn default() -> Self {
        SparklessConfig {
            app_name: "home_sales".to_string(),
            case_sensitive: false,
            warehouse_dir: None,
            infer_schema_length: None,
            show_rows: 20,
            extra: HashMap::new(),
        }
    }
}

impl SparklessConfig {
    /// Read `HOME_SALES_APP_NAME`, `HOME_SALES_CASE_SENSITIVE`, `HOME_SALES_WAREHOUSE_DIR`,
    /// `HOME_SALES_INFER_SCHEMA_LENGTH` and `HOME_SALES_SHOW_ROWS`. Unset or unparsable
    /// values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = SparklessConfig::default();
        if let Some(name) = lookup("APP_NAME").filter(|s| !s.trim().is_empty()) {
            config.app_name = name;
        }
        if let Some(v) = lookup("CASE_SENSITIVE") {
            config.case_sensitive = parse_bool(&v).unwrap_or(config.case_sensitive);
        }
        if let Some(dir) = lookup("WAREHOUSE_DIR").filter(|s| !s.trim().is_empty()) {
            config.warehouse_dir = Some(PathBuf::from(dir));
        }
        if let Some(n) = lookup("INFER_SCHEMA_LENGTH").and_then(|s| s.trim().parse().ok()) {
            config.infer_schema_length = Some(n);
        }
        if let Some(n) = lookup("SHOW_ROWS").and_then(|s| s.trim().parse().ok()) {
            config.show_rows = n;
        }
        config
    }

    /// Parse a JSON config document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Flatten into session config keys.
    pub fn to_session_config(&self) -> HashMap<String, String> {
        let mut out = self.extra.clone();
        out.insert(APP_NAME_KEY.to_string(), self.app_name.clone());
        out.insert(CASE_SENSITIVE_KEY.to_string(), self.case_sensitive.to_string());
        if let Some(dir) = &self.warehouse_dir {
            out.insert(WAREHOUSE_DIR_KEY.to_string(), dir.display().to_string());
        }
        if let Some(n) = self.infer_schema_length {
            out.insert(INFER_SCHEMA_LENGTH_KEY.to_string(), n.to_string());
        }
        out.insert(SHOW_ROWS_KEY.to_string(), self.show_rows.to_string());
        out
    }
}

pub(crate) fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
