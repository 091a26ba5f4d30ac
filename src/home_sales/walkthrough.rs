use std::path::{Path, PathBuf};
use std::time::Duration;

use polars::prelude::DataFrame as PlDataFrame;

use super::{
    format_elapsed, timed, validate_schema, HomeSalesQuery, HOME_SALES_VIEW, PARTITIONED_VIEW,
    PARTITION_COLUMN,
};
use crate::dataframe::{render_table, SaveMode};
use crate::error::EngineError;
use crate::session::SparkSession;

const TRUNCATE: usize = 20;

/// Which copy of the data a query ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Uncached,
    Cached,
    Parquet,
}

impl Stage {
    fn label(&self) -> &'static str {
        match self {
            Stage::Uncached => "uncached",
            Stage::Cached => "cached",
            Stage::Parquet => "parquet",
        }
    }
}

/// One executed query: its collected result and how long it took to plan, run and
/// collect.
#[derive(Debug, Clone)]
pub struct QueryRun {
    pub query: HomeSalesQuery,
    pub view: String,
    pub stage: Stage,
    pub result: PlDataFrame,
    pub elapsed: Duration,
}

/// Everything the walkthrough observed, in the order it happened.
#[derive(Debug, Clone)]
pub struct WalkthroughReport {
    pub csv_path: PathBuf,
    pub parquet_dir: PathBuf,
    pub rows: usize,
    pub runs: Vec<QueryRun>,
    /// `date_built=<year>` directories written, sorted.
    pub partitions: Vec<String>,
    pub cached_after_cache: bool,
    pub cached_after_uncache: bool,
    show_rows: usize,
}

impl WalkthroughReport {
    /// The run of `query` at `stage`, if the walkthrough executed it.
    pub fn run(&self, query: HomeSalesQuery, stage: Stage) -> Option<&QueryRun> {
        self.runs
            .iter()
            .find(|r| r.query == query && r.stage == stage)
    }

    fn comparison_elapsed(&self, stage: Stage) -> Option<Duration> {
        self.run(HomeSalesQuery::PriceByViewRating, stage)
            .map(|r| r.elapsed)
    }

    pub fn uncached_elapsed(&self) -> Option<Duration> {
        self.comparison_elapsed(Stage::Uncached)
    }

    pub fn cached_elapsed(&self) -> Option<Duration> {
        self.comparison_elapsed(Stage::Cached)
    }

    pub fn parquet_elapsed(&self) -> Option<Duration> {
        self.comparison_elapsed(Stage::Parquet)
    }

    /// The console transcript: each question, its result table and elapsed time,
    /// interleaved with the cache and Parquet steps.
    pub fn render(&self) -> Result<String, EngineError> {
        let mut lines = vec![format!(
            "Loaded {} rows from {} into '{HOME_SALES_VIEW}'\n",
            self.rows,
            self.csv_path.display()
        )];
        for run in &self.runs {
            match run.stage {
                Stage::Cached if run.query == HomeSalesQuery::PriceByViewRating => {
                    lines.push(format!(
                        "Cached '{HOME_SALES_VIEW}': {}\n",
                        self.cached_after_cache
                    ));
                }
                Stage::Parquet => {
                    lines.push(format!(
                        "Wrote {} partitions by {PARTITION_COLUMN} to {} and registered '{PARTITIONED_VIEW}'\n",
                        self.partitions.len(),
                        self.parquet_dir.display()
                    ));
                }
                _ => {}
            }
            lines.push(format!("{} [{}, {}]", run.query.title(), run.view, run.stage.label()));
            let shown = run.result.head(Some(self.show_rows));
            let more = (run.result.height() > self.show_rows).then_some(self.show_rows);
            lines.push(render_table(&shown, TRUNCATE, more)?);
            lines.push(format!("{}\n", format_elapsed(run.elapsed)));
        }
        lines.push(format!(
            "Uncached '{HOME_SALES_VIEW}': is_cached = {}",
            self.cached_after_uncache
        ));
        let mut out = lines.join("\n");
        out.push('\n');
        Ok(out)
    }
}

/// Load the sales CSV, answer the four questions, then compare the last query's
/// latency uncached, cached and over a partitioned Parquet copy.
pub struct Walkthrough {
    session: SparkSession,
    csv_path: PathBuf,
    parquet_dir: PathBuf,
    show_rows: usize,
}

impl Walkthrough {
    /// A relative `parquet_dir` is placed under the session's warehouse directory.
    pub fn new(
        session: SparkSession,
        csv_path: impl AsRef<Path>,
        parquet_dir: impl AsRef<Path>,
    ) -> Self {
        let parquet_dir = session.warehouse_path(parquet_dir);
        let show_rows = session.show_rows();
        Walkthrough {
            session,
            csv_path: csv_path.as_ref().to_path_buf(),
            parquet_dir,
            show_rows,
        }
    }

    /// Rows printed per result table.
    pub fn show_rows(mut self, n: usize) -> Self {
        self.show_rows = n;
        self
    }

    fn execute(
        &self,
        query: HomeSalesQuery,
        view: &str,
        stage: Stage,
    ) -> Result<QueryRun, EngineError> {
        let label = format!("{query:?} on {view} ({})", stage.label());
        let (result, elapsed) = timed(&label, || query.run(&self.session, view)?.collect())?;
        Ok(QueryRun {
            query,
            view: view.to_string(),
            stage,
            result,
            elapsed,
        })
    }

    pub fn run(&self) -> Result<WalkthroughReport, EngineError> {
        let sales = self
            .session
            .read()
            .option("header", "true")
            .option("inferSchema", "true")
            .csv(&self.csv_path)?;
        validate_schema(&sales)?;
        let rows = sales.count()?;
        log::info!(
            "loaded {rows} rows from {} as '{HOME_SALES_VIEW}'",
            self.csv_path.display()
        );
        self.session
            .create_or_replace_temp_view(HOME_SALES_VIEW, sales);

        let mut runs = Vec::with_capacity(HomeSalesQuery::ALL.len() + 2);
        for query in HomeSalesQuery::ALL {
            runs.push(self.execute(query, HOME_SALES_VIEW, Stage::Uncached)?);
        }

        let catalog = self.session.catalog();
        catalog.cache_table(HOME_SALES_VIEW)?;
        let cached_after_cache = catalog.is_cached(HOME_SALES_VIEW)?;
        runs.push(self.execute(
            HomeSalesQuery::PriceByViewRating,
            HOME_SALES_VIEW,
            Stage::Cached,
        )?);

        let summary = self
            .session
            .table(HOME_SALES_VIEW)?
            .write()
            .mode(SaveMode::Overwrite)
            .partition_by([PARTITION_COLUMN])
            .parquet(&self.parquet_dir)?;
        log::info!(
            "wrote {} rows in {} partitions to {}",
            summary.rows,
            summary.partitions.len(),
            self.parquet_dir.display()
        );
        let reloaded = self.session.read_parquet(&self.parquet_dir)?;
        self.session
            .create_or_replace_temp_view(PARTITIONED_VIEW, reloaded);
        runs.push(self.execute(
            HomeSalesQuery::PriceByViewRating,
            PARTITIONED_VIEW,
            Stage::Parquet,
        )?);

        catalog.uncache_table(HOME_SALES_VIEW)?;
        let cached_after_uncache = catalog.is_cached(HOME_SALES_VIEW)?;
        if cached_after_uncache {
            return Err(EngineError::Internal(format!(
                "'{HOME_SALES_VIEW}' is still cached after uncache"
            )));
        }

        Ok(WalkthroughReport {
            csv_path: self.csv_path.clone(),
            parquet_dir: self.parquet_dir.clone(),
            rows,
            runs,
            partitions: summary.partitions,
            cached_after_cache,
            cached_after_uncache,
            show_rows: self.show_rows,
        })
    }
}
