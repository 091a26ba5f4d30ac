//! DataFrameReader for reading CSV and Parquet files and directories.

use std::collections::HashMap;
use std::path::Path;

use crate::config::parse_bool;
use crate::dataframe::DataFrame;
use crate::error::EngineError;
use crate::io::{read_dataset, CsvOptions, FileFormat};

use super::SparkSession;

/// DataFrameReader for reading various file formats
/// Similar to PySpark's DataFrameReader with option/options/format/load/table
pub struct DataFrameReader {
    pub(super) session: SparkSession,
    options: HashMap<String, String>,
    format: Option<String>,
}

impl DataFrameReader {
    pub fn new(session: SparkSession) -> Self {
        DataFrameReader {
            session,
            options: HashMap::new(),
            format: None,
        }
    }

    /// Add a single option (PySpark: option(key, value)). Returns self for chaining.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Add multiple options (PySpark: options(**kwargs)). Returns self for chaining.
    pub fn options(mut self, opts: impl IntoIterator<Item = (String, String)>) -> Self {
        for (k, v) in opts {
            self.options.insert(k, v);
        }
        self
    }

    /// Set the format for load() (PySpark: format("parquet") etc).
    pub fn format(mut self, fmt: impl Into<String>) -> Self {
        self.format = Some(fmt.into());
        self
    }

    /// Load data from path using format (or infer from extension) and options.
    /// A directory without an explicit format is read as Parquet, Spark's default source.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DataFrame, EngineError> {
        let path = path.as_ref();
        let format = match &self.format {
            Some(name) => FileFormat::from_name(name).ok_or_else(|| {
                EngineError::User(format!(
                    "load: unsupported format '{name}'. Use format('parquet') or format('csv')."
                ))
            })?,
            None => match FileFormat::from_path(path) {
                Some(f) => f,
                None if path.is_dir() => FileFormat::Parquet,
                None => {
                    return Err(EngineError::User(format!(
                        "load: could not infer format for path '{}'. Use format('parquet'|'csv') before load.",
                        path.display()
                    )))
                }
            },
        };
        self.read_format(path, format)
    }

    /// Return the named table/view (PySpark: table(name)).
    pub fn table(&self, name: &str) -> Result<DataFrame, EngineError> {
        self.session.table(name)
    }

    fn option_bool(&self, key: &str) -> Result<Option<bool>, EngineError> {
        match self.options.get(key) {
            None => Ok(None),
            Some(v) => parse_bool(v).map(Some).ok_or_else(|| {
                EngineError::User(format!("option {key}: expected true/false, got '{v}'"))
            }),
        }
    }

    fn csv_options(&self) -> Result<CsvOptions, EngineError> {
        let mut opts = CsvOptions {
            infer_schema_length: self.session.infer_schema_length(),
            ..CsvOptions::default()
        };
        if let Some(header) = self.option_bool("header")? {
            opts.has_header = header;
        }
        if let Some(infer) = self.option_bool("inferSchema")? {
            opts.infer_schema = infer;
        }
        if let Some(v) = self.options.get("inferSchemaLength") {
            let n = v.trim().parse::<usize>().map_err(|_| {
                EngineError::User(format!("option inferSchemaLength: expected a row count, got '{v}'"))
            })?;
            opts.infer_schema_length = Some(n);
        }
        if let Some(sep) = self.options.get("sep").or_else(|| self.options.get("delimiter")) {
            opts.separator = match sep.as_bytes() {
                [b] => *b,
                _ => {
                    return Err(EngineError::User(format!(
                        "option sep: expected a single character, got '{sep}'"
                    )))
                }
            };
        }
        if let Some(null_value) = self.options.get("nullValue") {
            opts.null_value = Some(null_value.clone());
        }
        Ok(opts)
    }

    fn read_format(&self, path: &Path, format: FileFormat) -> Result<DataFrame, EngineError> {
        if !path.exists() {
            return Err(EngineError::Io(format!(
                "Path does not exist: {}",
                path.display()
            )));
        }
        let csv = self.csv_options()?;
        let lf = read_dataset(path, format, &csv)?;
        let df = DataFrame::from_lazy(lf, self.session.is_case_sensitive());
        // resolves the inferred schema now so a malformed file fails at load
        let columns = df
            .columns()
            .map_err(|e| e.with_context(format!("read {}", path.display())))?;
        log::debug!(
            "loaded {} with columns [{}]",
            path.display(),
            columns.join(", ")
        );
        Ok(df)
    }

    /// Read CSV (header row, inferred schema by default).
    pub fn csv(&self, path: impl AsRef<Path>) -> Result<DataFrame, EngineError> {
        self.read_format(path.as_ref(), FileFormat::Csv)
    }

    /// Read a Parquet file, or every Parquet file under a directory with hive
    /// partition columns appended.
    pub fn parquet(&self, path: impl AsRef<Path>) -> Result<DataFrame, EngineError> {
        self.read_format(path.as_ref(), FileFormat::Parquet)
    }
}
