//! Directory datasets: part files, `_SUCCESS` marker, hive partition directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use polars::prelude::{DataFrame as PlDataFrame, LazyFrame};

use super::partition::{partition_dir_name, partition_value_string};
use super::{scan_file, write_file, CsvOptions, FileFormat};
use crate::error::EngineError;

const SUCCESS_MARKER: &str = "_SUCCESS";

/// What a dataset write produced.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSummary {
    pub rows: usize,
    pub files: Vec<PathBuf>,
    /// Partition directories relative to the dataset root, sorted.
    pub partitions: Vec<String>,
}

fn run_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{nanos:x}")
}

/// Write `df` under `root` as part files, one directory level per partition column.
/// `partition_cols` must already be resolved to exact column names. Partition columns
/// are stored only in directory names.
pub fn write_dataset(
    df: PlDataFrame,
    root: &Path,
    partition_cols: &[String],
    format: FileFormat,
) -> Result<WriteSummary, EngineError> {
    let width = df.width();
    if !partition_cols.is_empty() && partition_cols.len() >= width {
        return Err(EngineError::User(
            "cannot use all columns as partition columns".into(),
        ));
    }
    fs::create_dir_all(root)
        .map_err(|e| EngineError::Io(format!("create {}: {e}", root.display())))?;

    let rows = df.height();
    let id = run_id();
    let mut files = Vec::new();
    let mut partitions = Vec::new();

    if partition_cols.is_empty() {
        let mut df = df;
        let path = root.join(format!("part-00000-{id}.{}", format.part_extension()));
        write_file(&mut df, &path, format)?;
        files.push(path);
    } else {
        let parts = df.partition_by_stable(partition_cols.iter().map(|s| s.as_str()), true)?;
        for (i, part) in parts.into_iter().enumerate() {
            let mut rel = PathBuf::new();
            for key in partition_cols {
                let value = partition_value_string(&part.column(key.as_str())?.get(0)?);
                rel.push(partition_dir_name(key, value.as_deref()));
            }
            let dir = root.join(&rel);
            fs::create_dir_all(&dir)
                .map_err(|e| EngineError::Io(format!("create {}: {e}", dir.display())))?;
            let mut data = part;
            for key in partition_cols {
                data = data.drop(key.as_str())?;
            }
            let path = dir.join(format!("part-{i:05}-{id}.{}", format.part_extension()));
            write_file(&mut data, &path, format)?;
            files.push(path);
            partitions.push(rel.to_string_lossy().to_string());
        }
        partitions.sort();
    }

    fs::write(root.join(SUCCESS_MARKER), b"")?;
    log::info!(
        "wrote {} rows to {} ({} files, {} partitions)",
        rows,
        root.display(),
        files.len(),
        partitions.len()
    );
    Ok(WriteSummary {
        rows,
        files,
        partitions,
    })
}

/// Scan a file, or every part file under a directory. Parquet directories go through
/// the hive scan, so `key=value` segments become columns after the data columns and
/// `_SUCCESS` never matches the part file glob. CSV directories yield the data
/// columns only. Nothing is read beyond file metadata until the plan runs.
pub fn read_dataset(
    root: &Path,
    format: FileFormat,
    csv: &CsvOptions,
) -> Result<LazyFrame, EngineError> {
    if !root.exists() {
        return Err(EngineError::Io(format!(
            "path does not exist: {}",
            root.display()
        )));
    }
    if root.is_file() {
        return scan_file(root, format, csv, false);
    }

    let pattern = root.join("**").join(format!("*.{}", format.glob_extension()));
    let mut lf = scan_file(&pattern, format, csv, true)?;
    let schema = lf
        .collect_schema()
        .map_err(|e| EngineError::from(e).with_context(format!("read {}", root.display())))?;
    log::debug!(
        "scanning {} ({} columns: [{}])",
        pattern.display(),
        schema.len(),
        schema.iter_names().map(|n| n.as_str()).collect::<Vec<_>>().join(", ")
    );
    Ok(lf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{col, df, IntoLazy, SortMultipleOptions};
    use tempfile::TempDir;

    fn sales() -> PlDataFrame {
        df![
            "id" => &["a", "b", "c", "d"],
            "date_built" => &[Some(1990i64), Some(2001), Some(1990), None],
            "price" => &[100.0f64, 200.0, 300.0, 400.0],
        ]
        .unwrap()
    }

    fn sorted(df: PlDataFrame) -> PlDataFrame {
        df.lazy()
            .sort_by_exprs([col("id")], SortMultipleOptions::default())
            .collect()
            .unwrap()
    }

    #[test]
    fn partitioned_write_layout() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("home_parquet");
        let summary = write_dataset(
            sales(),
            &root,
            &["date_built".to_string()],
            FileFormat::Parquet,
        )
        .unwrap();
        assert_eq!(summary.rows, 4);
        assert_eq!(
            summary.partitions,
            vec![
                "date_built=1990",
                "date_built=2001",
                "date_built=__HIVE_DEFAULT_PARTITION__"
            ]
        );
        assert!(root.join("_SUCCESS").exists());
        assert!(root.join("date_built=1990").is_dir());
    }

    #[test]
    fn partitioned_roundtrip_preserves_rows() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("out");
        write_dataset(
            sales(),
            &root,
            &["date_built".to_string()],
            FileFormat::Parquet,
        )
        .unwrap();
        let back = read_dataset(&root, FileFormat::Parquet, &CsvOptions::default())
            .unwrap()
            .select([col("id"), col("date_built"), col("price")])
            .collect()
            .unwrap();
        assert!(sorted(back).equals_missing(&sorted(sales())));
    }

    #[test]
    fn csv_dataset_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("csv_out");
        write_dataset(sales(), &root, &[], FileFormat::Csv).unwrap();
        let back = read_dataset(&root, FileFormat::Csv, &CsvOptions::default())
            .unwrap()
            .collect()
            .unwrap();
        assert_eq!(back.height(), 4);
        assert_eq!(back.width(), 3);
    }

    #[test]
    fn all_columns_as_partitions_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let one = df!["date_built" => &[1990i64]].unwrap();
        let err = write_dataset(
            one,
            tmp.path(),
            &["date_built".to_string()],
            FileFormat::Parquet,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::User(_)));
    }

    #[test]
    fn missing_and_empty_roots() {
        let tmp = TempDir::new().unwrap();
        let missing = read_dataset(
            &tmp.path().join("nope"),
            FileFormat::Parquet,
            &CsvOptions::default(),
        );
        assert!(matches!(missing, Err(EngineError::Io(_))));
        let empty = read_dataset(tmp.path(), FileFormat::Parquet, &CsvOptions::default());
        assert!(matches!(empty, Err(EngineError::Io(_))));
    }
}
