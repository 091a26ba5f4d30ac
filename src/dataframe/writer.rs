//! PySpark-style `DataFrameWriter`: save modes, format and `partitionBy`.

use std::path::Path;

use super::DataFrame;
use crate::error::EngineError;
use crate::io::{write_dataset, FileFormat};

pub use crate::io::WriteSummary;

/// What to do when the destination already exists (PySpark DataFrameWriter.mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Fail if the destination exists (Spark's default).
    #[default]
    ErrorIfExists,
    /// Replace the destination.
    Overwrite,
    /// Add new part files next to the existing ones.
    Append,
    /// Leave an existing destination untouched and write nothing.
    Ignore,
}

impl SaveMode {
    /// Parse Spark's mode names (`overwrite`, `append`, `ignore`, `error`, `errorifexists`).
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(SaveMode::Overwrite),
            "append" => Ok(SaveMode::Append),
            "ignore" => Ok(SaveMode::Ignore),
            "error" | "errorifexists" | "default" => Ok(SaveMode::ErrorIfExists),
            other => Err(EngineError::User(format!(
                "unknown save mode '{other}'. Accepted: overwrite, append, ignore, error, errorifexists"
            ))),
        }
    }
}

/// Builder for writing a DataFrame to a path (PySpark DataFrameWriter).
pub struct DataFrameWriter<'a> {
    df: &'a DataFrame,
    mode: SaveMode,
    format: FileFormat,
    partition_by: Vec<String>,
}

impl<'a> DataFrameWriter<'a> {
    pub(super) fn new(df: &'a DataFrame) -> Self {
        DataFrameWriter {
            df,
            mode: SaveMode::default(),
            format: FileFormat::Parquet,
            partition_by: Vec::new(),
        }
    }

    pub fn mode(mut self, mode: SaveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    /// Partition output by these columns: one `col=value` directory level per column.
    pub fn partition_by<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition_by = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Write Parquet to `path`.
    pub fn parquet(self, path: impl AsRef<Path>) -> Result<WriteSummary, EngineError> {
        self.format(FileFormat::Parquet).save(path)
    }

    /// Write CSV (with header) to `path`.
    pub fn csv(self, path: impl AsRef<Path>) -> Result<WriteSummary, EngineError> {
        self.format(FileFormat::Csv).save(path)
    }

    /// Execute the plan and write it to `path` as a directory of part files.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<WriteSummary, EngineError> {
        let path = path.as_ref();
        let partition_cols: Vec<String> = self
            .partition_by
            .iter()
            .map(|c| self.df.resolve_column_name(c))
            .collect::<Result<Vec<_>, _>>()?;

        let exists = path.exists();
        if exists {
            match self.mode {
                SaveMode::ErrorIfExists => {
                    return Err(EngineError::User(format!(
                        "path {} already exists. Use mode Overwrite or Append.",
                        path.display()
                    )));
                }
                SaveMode::Ignore => {
                    log::info!("{} exists, skipping write (mode ignore)", path.display());
                    return Ok(WriteSummary {
                        rows: 0,
                        files: Vec::new(),
                        partitions: Vec::new(),
                    });
                }
                SaveMode::Append if path.is_file() => {
                    return Err(EngineError::User(format!(
                        "cannot append to {}: it is a file, not a dataset directory",
                        path.display()
                    )));
                }
                SaveMode::Append | SaveMode::Overwrite => {}
            }
        }

        // the plan may read from `path`, so rows are in memory before it is cleared
        let frame = self.df.collect()?;
        if exists && self.mode == SaveMode::Overwrite {
            let removed = if path.is_dir() {
                std::fs::remove_dir_all(path)
            } else {
                std::fs::remove_file(path)
            };
            removed
                .map_err(|e| EngineError::Io(format!("overwrite {}: {e}", path.display())))?;
        }
        write_dataset(frame, path, &partition_cols, self.format)
            .map_err(|e| e.with_context(format!("save({})", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;
    use tempfile::TempDir;

    fn sales() -> DataFrame {
        DataFrame::from_polars(
            df![
                "Date_Built" => &[1990i64, 2001, 1990],
                "price" => &[1.0f64, 2.0, 3.0],
            ]
            .unwrap(),
        )
    }

    #[test]
    fn parse_modes() {
        assert_eq!(SaveMode::parse("Overwrite").unwrap(), SaveMode::Overwrite);
        assert_eq!(SaveMode::parse("errorifexists").unwrap(), SaveMode::ErrorIfExists);
        assert!(SaveMode::parse("upsert").is_err());
    }

    #[test]
    fn default_mode_refuses_existing_path() {
        let tmp = TempDir::new().unwrap();
        let err = sales().write().parquet(tmp.path()).unwrap_err();
        assert!(matches!(err, EngineError::User(_)));
    }

    #[test]
    fn partition_column_resolves_case_insensitively() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("p");
        let summary = sales()
            .write()
            .partition_by(["date_built"])
            .parquet(&out)
            .unwrap();
        assert_eq!(summary.partitions, vec!["Date_Built=1990", "Date_Built=2001"]);
    }

    #[test]
    fn unknown_partition_column_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = sales()
            .write()
            .partition_by(["zipcode"])
            .parquet(tmp.path().join("p"))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn overwrite_replaces_and_append_adds() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("p");
        sales().write().partition_by(["date_built"]).parquet(&out).unwrap();
        let appended = sales()
            .write()
            .mode(SaveMode::Append)
            .partition_by(["date_built"])
            .parquet(&out)
            .unwrap();
        assert_eq!(appended.files.len(), 2);
        let n_files = |dir: &Path| std::fs::read_dir(dir).unwrap().count();
        assert_eq!(n_files(&out.join("Date_Built=1990")), 2);

        sales()
            .write()
            .mode(SaveMode::Overwrite)
            .partition_by(["date_built"])
            .parquet(&out)
            .unwrap();
        assert_eq!(n_files(&out.join("Date_Built=1990")), 1);

        let ignored = sales().write().mode(SaveMode::Ignore).parquet(&out).unwrap();
        assert_eq!(ignored.rows, 0);
    }
}
