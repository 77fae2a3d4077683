//! Frame-level helpers shared by the consolidation and join modules.

use std::collections::HashSet;

use polars::prelude::{AnyValue, DataFrame};

use fuse_model::{JoinError, Result};

/// Separator for composite key strings. Unlikely to occur in data.
const KEY_SEPARATOR: char = '\x1f';

pub(crate) fn frame_error(error: polars::prelude::PolarsError) -> JoinError {
    JoinError::Frame(error.to_string())
}

/// Converts a Polars `AnyValue` to a normalized string representation.
/// Nulls become empty strings; integral floats drop the fraction so that
/// a numeric `5` and a textual `"5"` key compare equal.
pub fn any_to_string(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(v) => v.trim().to_string(),
        AnyValue::StringOwned(v) => v.trim().to_string(),
        AnyValue::Int8(v) => v.to_string(),
        AnyValue::Int16(v) => v.to_string(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::UInt8(v) => v.to_string(),
        AnyValue::UInt16(v) => v.to_string(),
        AnyValue::UInt32(v) => v.to_string(),
        AnyValue::UInt64(v) => v.to_string(),
        AnyValue::Float32(v) => format_numeric(f64::from(v)),
        AnyValue::Float64(v) => format_numeric(v),
        AnyValue::Boolean(v) => if v { "1" } else { "0" }.to_string(),
        other => other.to_string(),
    }
}

/// Formats a float without a trailing `.0` for integral values.
pub fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// True when the frame has a column with this exact name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Composite key string for row `idx` over `keys`. Null components
/// contribute an empty segment.
pub fn composite_key(df: &DataFrame, keys: &[&str], idx: usize) -> Result<String> {
    let mut parts = Vec::with_capacity(keys.len());
    for key in keys {
        let column = df.column(key).map_err(frame_error)?;
        let value = column
            .as_materialized_series()
            .get(idx)
            .map_err(frame_error)?;
        parts.push(any_to_string(value));
    }
    Ok(parts.join(&KEY_SEPARATOR.to_string()))
}

/// Distinct composite keys over the given columns.
pub fn key_set(df: &DataFrame, keys: &[&str]) -> Result<HashSet<String>> {
    let mut set = HashSet::with_capacity(df.height());
    for idx in 0..df.height() {
        set.insert(composite_key(df, keys, idx)?);
    }
    Ok(set)
}

/// Distinct value count of a single column, when present.
pub fn unique_count(df: &DataFrame, name: &str) -> Option<usize> {
    let column = df.column(name).ok()?;
    column.as_materialized_series().n_unique().ok()
}

/// Null count of a single column, when present.
pub fn null_count(df: &DataFrame, name: &str) -> Option<usize> {
    let column = df.column(name).ok()?;
    Some(column.as_materialized_series().null_count())
}

/// Non-empty string values of a column, for range scans.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df.column(name).map_err(frame_error)?;
    let series = column.as_materialized_series();
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let value = any_to_string(series.get(idx).map_err(frame_error)?);
        if !value.is_empty() {
            values.push(value);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    #[test]
    fn composite_keys_normalize_numeric_and_text() {
        let numeric = df!("CustomerID" => [5i64, 6]).unwrap();
        let textual = df!("CustomerID" => ["5", "6"]).unwrap();
        assert_eq!(
            composite_key(&numeric, &["CustomerID"], 0).unwrap(),
            composite_key(&textual, &["CustomerID"], 0).unwrap()
        );
    }

    #[test]
    fn key_set_counts_distinct_tuples() {
        let frame = df!(
            "CustomerID" => ["C1", "C1", "C2"],
            "BillingDate" => ["2024-01-01", "2024-01-01", "2024-02-01"]
        )
        .unwrap();
        let set = key_set(&frame, &["CustomerID", "BillingDate"]).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn missing_column_is_absent_not_an_error() {
        let frame = df!("CustomerID" => ["C1"]).unwrap();
        assert!(unique_count(&frame, "ProductID").is_none());
        assert!(null_count(&frame, "ProductID").is_none());
        assert!(!has_column(&frame, "ProductID"));
    }
}
