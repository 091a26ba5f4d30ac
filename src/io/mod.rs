//! File formats and dataset layout shared by `DataFrameReader` and `DataFrameWriter`.

mod dataset;
pub mod partition;

pub use dataset::{read_dataset, write_dataset, WriteSummary};

use std::fs::File;
use std::path::Path;

use polars::io::HiveOptions;
use polars::prelude::{
    CsvWriter, LazyCsvReader, LazyFileListReader, LazyFrame, NullValues,
    ParquetCompression, ParquetWriter, ScanArgsParquet, SerWriter, DataFrame as PlDataFrame,
};

use crate::error::EngineError;

/// On-disk formats understood by the reader and writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Parquet,
    Csv,
}

impl FileFormat {
    /// Parse a Spark format name (`parquet`, `csv`), case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "parquet" => Some(FileFormat::Parquet),
            "csv" => Some(FileFormat::Csv),
            _ => None,
        }
    }

    /// Format implied by a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_name)
    }

    /// Extension matched when scanning a dataset directory.
    pub(crate) fn glob_extension(&self) -> &'static str {
        match self {
            FileFormat::Parquet => "parquet",
            FileFormat::Csv => "csv",
        }
    }

    /// Extension used for part files.
    pub fn part_extension(&self) -> &'static str {
        match self {
            FileFormat::Parquet => "snappy.parquet",
            FileFormat::Csv => "csv",
        }
    }
}

/// CSV reader settings (PySpark `header`, `inferSchema`, `sep`, `nullValue`).
#[derive(Debug, Clone, PartialEq)]
pub struct CsvOptions {
    pub has_header: bool,
    pub infer_schema: bool,
    /// Rows used for inference; `None` scans the whole file.
    pub infer_schema_length: Option<usize>,
    pub separator: u8,
    pub null_value: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            has_header: true,
            infer_schema: true,
            infer_schema_length: None,
            separator: b',',
            null_value: None,
        }
    }
}

/// Lazily scan `path`. With `hive`, `path` is a glob over part files and the
/// `key=value` directories below the glob root become trailing columns.
pub(crate) fn scan_file(
    path: &Path,
    format: FileFormat,
    csv: &CsvOptions,
    hive: bool,
) -> Result<LazyFrame, EngineError> {
    match format {
        FileFormat::Csv => scan_csv(path, csv),
        FileFormat::Parquet => scan_parquet(path, hive),
    }
}

fn scan_parquet(path: &Path, hive: bool) -> Result<LazyFrame, EngineError> {
    let args = ScanArgsParquet {
        hive_options: HiveOptions {
            enabled: Some(hive),
            ..Default::default()
        },
        glob: hive,
        ..Default::default()
    };
    LazyFrame::scan_parquet(path, args)
        .map_err(|e| EngineError::from(e).with_context(format!("read parquet({})", path.display())))
}

fn scan_csv(path: &Path, opts: &CsvOptions) -> Result<LazyFrame, EngineError> {
    let mut reader = LazyCsvReader::new(path)
        .with_has_header(opts.has_header)
        .with_separator(opts.separator);
    reader = if opts.infer_schema {
        reader
            .with_infer_schema_length(opts.infer_schema_length)
            .with_try_parse_dates(true)
    } else {
        // every column stays a string
        reader.with_infer_schema_length(Some(0))
    };
    if let Some(null_value) = &opts.null_value {
        reader = reader.with_null_values(Some(NullValues::AllColumnsSingle(
            null_value.as_str().into(),
        )));
    }
    reader
        .finish()
        .map_err(|e| EngineError::from(e).with_context(format!("read csv({})", path.display())))
}

/// Write one materialized frame to `path`.
pub(crate) fn write_file(
    df: &mut PlDataFrame,
    path: &Path,
    format: FileFormat,
) -> Result<(), EngineError> {
    let mut file = File::create(path)
        .map_err(|e| EngineError::Io(format!("create {}: {e}", path.display())))?;
    match format {
        FileFormat::Parquet => {
            ParquetWriter::new(&mut file)
                .with_compression(ParquetCompression::Snappy)
                .finish(df)
                .map_err(|e| EngineError::from(e).with_context(format!("write parquet({})", path.display())))?;
        }
        FileFormat::Csv => {
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(df)
                .map_err(|e| EngineError::from(e).with_context(format!("write csv({})", path.display())))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn format_from_name_and_path() {
        assert_eq!(FileFormat::from_name("PARQUET"), Some(FileFormat::Parquet));
        assert_eq!(FileFormat::from_name("json"), None);
        assert_eq!(
            FileFormat::from_path(&PathBuf::from("data/home_sales_revised.csv")),
            Some(FileFormat::Csv)
        );
        assert_eq!(FileFormat::from_path(&PathBuf::from("home_parquet")), None);
    }
}
