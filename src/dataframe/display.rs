//! Spark-style console rendering for `show()`.

use crate::error::EngineError;
use polars::prelude::{AnyValue, DataFrame as PlDataFrame};

const MIN_COLUMN_WIDTH: usize = 3;

/// Render a cell value the way Spark's `show` does: `NULL` for nulls, strings without
/// quotes, integral doubles with one decimal.
pub fn format_any_value(av: &AnyValue<'_>) -> String {
    match av {
        AnyValue::Null => "NULL".to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Float64(f) => format_double(*f),
        AnyValue::Float32(f) => format_double(f64::from(*f)),
        other => other.to_string(),
    }
}

fn format_double(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

fn truncate_cell(s: String, truncate: usize) -> String {
    if truncate == 0 || s.chars().count() <= truncate {
        return s;
    }
    if truncate < 4 {
        s.chars().take(truncate).collect()
    } else {
        let mut cut: String = s.chars().take(truncate - 3).collect();
        cut.push_str("...");
        cut
    }
}

fn pad(s: &str, width: usize, right_align: bool) -> String {
    let fill = width.saturating_sub(s.chars().count());
    if right_align {
        format!("{}{}", " ".repeat(fill), s)
    } else {
        format!("{}{}", s, " ".repeat(fill))
    }
}

/// Render `df` as a bordered table. `truncated_at` adds Spark's
/// "only showing top n rows" footer.
pub fn render_table(
    df: &PlDataFrame,
    truncate: usize,
    truncated_at: Option<usize>,
) -> Result<String, EngineError> {
    let columns = df.get_columns();
    let header: Vec<String> = columns
        .iter()
        .map(|c| truncate_cell(c.name().to_string(), truncate))
        .collect();
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let mut row = Vec::with_capacity(columns.len());
        for c in columns {
            row.push(truncate_cell(format_any_value(&c.get(i)?), truncate));
        }
        rows.push(row);
    }

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(j, h)| {
            rows.iter()
                .map(|r| r[j].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
                .max(MIN_COLUMN_WIDTH)
        })
        .collect();

    let right_align = truncate > 0;
    let border: String = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .fold(String::from("+"), |acc, dash| acc + &dash + "+");
    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .fold(String::from("|"), |acc, (cell, w)| {
                acc + &pad(cell, *w, right_align) + "|"
            })
    };

    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    out.push_str(&line(&header));
    out.push('\n');
    out.push_str(&border);
    out.push('\n');
    for row in &rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out.push_str(&border);
    out.push('\n');
    if let Some(n) = truncated_at {
        let noun = if n == 1 { "row" } else { "rows" };
        out.push_str(&format!("only showing top {n} {noun}\n"));
    }
    Ok(out)
}
