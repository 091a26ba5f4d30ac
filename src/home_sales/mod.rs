//! The home-sales walkthrough: load the sales CSV, run the fixed aggregation queries,
//! compare uncached, cached and partitioned-Parquet latency.

mod queries;
mod timing;
mod walkthrough;

pub use queries::HomeSalesQuery;
pub use timing::{format_elapsed, timed};
pub use walkthrough::{QueryRun, Stage, Walkthrough, WalkthroughReport};

use crate::dataframe::DataFrame;
use crate::error::EngineError;
use crate::schema::DataType;

/// View name of the CSV data.
pub const HOME_SALES_VIEW: &str = "home_sales";
/// View name of the Parquet reload.
pub const PARTITIONED_VIEW: &str = "partitioned_home_sales";
/// Column the Parquet copy is partitioned by.
pub const PARTITION_COLUMN: &str = "date_built";

/// Columns the walkthrough queries read.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "date",
    "price",
    "bedrooms",
    "bathrooms",
    "floors",
    "sqft_living",
    "view",
    "date_built",
];

/// Check that `df` has every required column and that all but `date` are numeric.
/// `date` may be a date, a timestamp or an ISO date string.
pub fn validate_schema(df: &DataFrame) -> Result<(), EngineError> {
    let schema = df.schema()?;
    for required in REQUIRED_COLUMNS {
        let name = df.resolve_column_name(required).map_err(|_| {
            EngineError::Schema(format!(
                "home sales data is missing column '{required}' (found: [{}])",
                schema
                    .fields()
                    .iter()
                    .map(|f| f.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;
        let field = schema
            .field(&name)
            .ok_or_else(|| EngineError::Internal(format!("resolved column '{name}' has no field")))?;
        let ok = if required == "date" {
            matches!(
                field.data_type,
                DataType::Date | DataType::Timestamp | DataType::String
            )
        } else {
            field.data_type.is_numeric()
        };
        if !ok {
            return Err(EngineError::Schema(format!(
                "column '{name}' has type {}, expected {}",
                field.data_type.simple_string(),
                if required == "date" { "date" } else { "a numeric type" }
            )));
        }
    }
    Ok(())
}
