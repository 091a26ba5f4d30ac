//! Hive-style partition directory names for dataset writes: `key=value` segments
//! with Spark's `%XX` escaping and the default partition for nulls. Reads go
//! through the polars hive scan, which decodes the same layout.

use polars::prelude::AnyValue;

/// Directory value used for null partition values.
pub const DEFAULT_PARTITION_NAME: &str = "__HIVE_DEFAULT_PARTITION__";

fn needs_escape(c: char) -> bool {
    (c as u32) < 0x20
        || matches!(
            c,
            '"' | '#' | '%' | '\'' | '*' | '/' | ':' | '=' | '?' | '\\' | '\u{7f}' | '{' | '['
                | ']' | '^'
        )
}

/// Escape a partition key or value for use in a path segment (`%XX` for reserved chars).
pub fn escape_path_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if needs_escape(c) {
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

/// `key=value` directory name; `None` maps to the default partition.
pub fn partition_dir_name(key: &str, value: Option<&str>) -> String {
    let value = match value {
        Some(v) if !v.is_empty() => escape_path_name(v),
        _ => DEFAULT_PARTITION_NAME.to_string(),
    };
    format!("{}={}", escape_path_name(key), value)
}

/// Text of a partition value as it appears in the directory name; `None` for nulls.
pub fn partition_value_string(av: &AnyValue<'_>) -> Option<String> {
    match av {
        AnyValue::Null => None,
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_characters_are_escaped() {
        assert_eq!(escape_path_name("a/b=c%d:e"), "a%2Fb%3Dc%25d%3Ae");
        assert_eq!(escape_path_name("New York"), "New York");
        assert_eq!(escape_path_name("tab\there"), "tab%09here");
    }

    #[test]
    fn dir_names() {
        assert_eq!(partition_dir_name("date_built", Some("1990")), "date_built=1990");
        assert_eq!(
            partition_dir_name("date_built", None),
            "date_built=__HIVE_DEFAULT_PARTITION__"
        );
        assert_eq!(
            partition_dir_name("date_built", Some("")),
            "date_built=__HIVE_DEFAULT_PARTITION__"
        );
        assert_eq!(partition_dir_name("city", Some("x=y")), "city=x%3Dy");
    }

    #[test]
    fn value_strings() {
        assert_eq!(partition_value_string(&AnyValue::Null), None);
        assert_eq!(partition_value_string(&AnyValue::Int64(1990)), Some("1990".to_string()));
        assert_eq!(partition_value_string(&AnyValue::String("a/b")), Some("a/b".to_string()));
    }
}
