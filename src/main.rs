//! Home sales walkthrough
//!
//! Usage:
//!   home-sales home_sales_revised.csv --parquet-dir home_parquet --show 20
//!
//! Settings not given on the command line come from `HOME_SALES_*` environment
//! variables; `RUST_LOG=info` logs each stage and timing.

use clap::Parser;
use std::path::PathBuf;

use home_sales::{SparkSession, SparklessConfig, Walkthrough};

#[derive(Parser, Debug)]
#[command(name = "home-sales")]
#[command(about = "Aggregate home sales with cached views and partitioned Parquet")]
#[command(version)]
struct Args {
    /// Home sales CSV with a header row
    #[arg(default_value = "home_sales_revised.csv")]
    csv: PathBuf,

    /// Destination of the Parquet copy partitioned by date_built
    #[arg(long, default_value = "home_parquet")]
    parquet_dir: PathBuf,

    /// Rows printed per result table
    #[arg(long)]
    show: Option<usize>,
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    let config = SparklessConfig::from_env();
    let session = SparkSession::from_config(&config);

    let mut walkthrough = Walkthrough::new(session.clone(), &args.csv, &args.parquet_dir);
    if let Some(n) = args.show {
        walkthrough = walkthrough.show_rows(n);
    }

    let transcript = walkthrough.run().and_then(|report| report.render());
    session.stop();
    match transcript {
        Ok(text) => print!("{text}"),
        Err(e) => {
            eprintln!("home-sales: {e}");
            std::process::exit(1);
        }
    }
}
