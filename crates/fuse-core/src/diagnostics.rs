//! Join-health diagnostics.
//!
//! Read-only and side-effect-free: every function here inspects frames
//! and produces a [`JoinDiagnostics`] record for operator review before a
//! join is confirmed and after it is committed. Columns absent from a
//! table (e.g. `ProductID` at customer level) are omitted from the record
//! rather than failing.

use chrono::NaiveDate;
use polars::prelude::DataFrame;

use fuse_model::{Category, DateRange, JoinDiagnostics, JoinKind, KeyCardinality, Result};

use crate::frame_utils::{column_names, has_column, key_set, null_count, string_values, unique_count};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Diagnostics for a single-file category pending acceptance.
pub fn single_table(df: &DataFrame, category: Category, keys: &[&str]) -> JoinDiagnostics {
    JoinDiagnostics {
        kind: JoinKind::SingleTable { category },
        left_rows: df.height(),
        right_rows: None,
        result_rows: None,
        keys: key_stats(df, None, None, keys),
        overlap_pct: None,
        date_range: date_range(df, category.date_column()),
        empty_result: df.height() == 0,
    }
}

/// Diagnostics for a single-file category after acceptance.
pub fn single_table_accepted(df: &DataFrame, category: Category, keys: &[&str]) -> JoinDiagnostics {
    let mut diag = single_table(df, category, keys);
    diag.result_rows = Some(df.height());
    for stat in &mut diag.keys {
        stat.result_unique = stat.left_unique.into();
        stat.result_nulls = null_count(df, &stat.column);
    }
    diag
}

/// Diagnostics for a prospective pairwise join. For inter-category joins
/// the overlap percentage of base keys found in the secondary table is
/// included.
pub fn prospective_pair(
    left: &DataFrame,
    right: &DataFrame,
    keys: &[&str],
    kind: JoinKind,
) -> Result<JoinDiagnostics> {
    Ok(JoinDiagnostics {
        kind,
        left_rows: left.height(),
        right_rows: Some(right.height()),
        result_rows: None,
        keys: key_stats(left, Some(right), None, keys),
        overlap_pct: overlap_for_kind(left, right, keys, kind)?,
        date_range: range_for_kind(left, keys, kind),
        empty_result: false,
    })
}

/// Diagnostics for a committed pairwise join.
pub fn completed_pair(
    left: &DataFrame,
    right: &DataFrame,
    result: &DataFrame,
    keys: &[&str],
    kind: JoinKind,
) -> Result<JoinDiagnostics> {
    Ok(JoinDiagnostics {
        kind,
        left_rows: left.height(),
        right_rows: Some(right.height()),
        result_rows: Some(result.height()),
        keys: key_stats(left, Some(right), Some(result), keys),
        overlap_pct: overlap_for_kind(left, right, keys, kind)?,
        date_range: range_for_kind(result, keys, kind),
        empty_result: is_empty_result(left, result),
    })
}

/// Fraction (0..=100) of distinct left-side key tuples present in the
/// right side.
pub fn overlap_percentage(left: &DataFrame, right: &DataFrame, keys: &[&str]) -> Result<f64> {
    let left_keys = key_set(left, keys)?;
    if left_keys.is_empty() {
        return Ok(0.0);
    }
    let right_keys = key_set(right, keys)?;
    let matched = left_keys
        .iter()
        .filter(|key| right_keys.contains(*key))
        .count();
    Ok(matched as f64 / left_keys.len() as f64 * 100.0)
}

/// Observed min/max of a date column. Values that all parse as dates are
/// ordered chronologically; otherwise lexically. `None` when the column
/// is absent or has no non-empty values.
pub fn date_range(df: &DataFrame, column: &str) -> Option<DateRange> {
    if !has_column(df, column) {
        return None;
    }
    let values = string_values(df, column).ok()?;
    if values.is_empty() {
        return None;
    }
    let parsed: Option<Vec<(NaiveDate, &String)>> = values
        .iter()
        .map(|value| parse_date(value).map(|date| (date, value)))
        .collect();
    let (min, max) = match parsed {
        Some(pairs) => {
            let min = pairs.iter().min_by_key(|(date, _)| *date)?.1.clone();
            let max = pairs.iter().max_by_key(|(date, _)| *date)?.1.clone();
            (min, max)
        }
        None => (
            values.iter().min()?.clone(),
            values.iter().max()?.clone(),
        ),
    };
    Some(DateRange {
        column: column.to_string(),
        min,
        max,
    })
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

fn key_stats(
    left: &DataFrame,
    right: Option<&DataFrame>,
    result: Option<&DataFrame>,
    keys: &[&str],
) -> Vec<KeyCardinality> {
    keys.iter()
        .filter_map(|key| {
            let left_unique = unique_count(left, key)?;
            Some(KeyCardinality {
                column: (*key).to_string(),
                left_unique,
                right_unique: right.and_then(|df| unique_count(df, key)),
                result_unique: result.and_then(|df| unique_count(df, key)),
                result_nulls: result.and_then(|df| null_count(df, key)),
            })
        })
        .collect()
}

fn overlap_for_kind(
    left: &DataFrame,
    right: &DataFrame,
    keys: &[&str],
    kind: JoinKind,
) -> Result<Option<f64>> {
    match kind {
        JoinKind::Inter { .. } => overlap_percentage(left, right, keys).map(Some),
        _ => Ok(None),
    }
}

fn range_for_kind(df: &DataFrame, keys: &[&str], kind: JoinKind) -> Option<DateRange> {
    let column = match kind {
        JoinKind::Inter { .. } => Category::BASE.date_column(),
        JoinKind::IntraPair { category, .. } | JoinKind::SingleTable { category } => {
            category.date_column()
        }
    };
    // The date key is always the last join key; fall back to it when the
    // category column is somehow absent.
    date_range(df, column).or_else(|| keys.last().and_then(|key| date_range(df, key)))
}

/// A committed result is flagged empty when it has no rows, or when every
/// column contributed by the right side is entirely null.
fn is_empty_result(left: &DataFrame, result: &DataFrame) -> bool {
    if result.height() == 0 {
        return true;
    }
    let left_columns = column_names(left);
    let contributed: Vec<String> = column_names(result)
        .into_iter()
        .filter(|name| !left_columns.contains(name))
        .collect();
    !contributed.is_empty()
        && contributed
            .iter()
            .all(|name| null_count(result, name) == Some(result.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    #[test]
    fn overlap_counts_distinct_base_keys() {
        let base = df!(
            "CustomerID" => ["C1", "C2", "C3", "C3"],
            "BillingDate" => ["2024-01-01", "2024-01-01", "2024-01-01", "2024-01-01"]
        )
        .unwrap();
        let secondary = df!(
            "CustomerID" => ["C1", "C3"],
            "BillingDate" => ["2024-01-01", "2024-01-01"]
        )
        .unwrap();
        let pct =
            overlap_percentage(&base, &secondary, &["CustomerID", "BillingDate"]).unwrap();
        assert!((pct - 66.666).abs() < 0.01);
    }

    #[test]
    fn date_range_orders_chronologically() {
        let frame = df!(
            "BillingDate" => ["2024-02-10", "2024-01-05", "2024-12-01"]
        )
        .unwrap();
        let range = date_range(&frame, "BillingDate").unwrap();
        assert_eq!(range.min, "2024-01-05");
        assert_eq!(range.max, "2024-12-01");
    }

    #[test]
    fn absent_diagnostic_columns_are_omitted() {
        let left = df!(
            "CustomerID" => ["C1"],
            "BillingDate" => ["2024-01-01"]
        )
        .unwrap();
        let diag = single_table(&left, Category::Billing, &["CustomerID", "ProductID", "BillingDate"]);
        let columns: Vec<&str> = diag.keys.iter().map(|k| k.column.as_str()).collect();
        assert_eq!(columns, vec!["CustomerID", "BillingDate"]);
    }

    #[test]
    fn fully_null_contribution_is_flagged_empty() {
        let left = df!("CustomerID" => ["C1", "C2"]).unwrap();
        let result = df!(
            "CustomerID" => ["C1", "C2"],
            "Tickets" => [None::<i64>, None::<i64>]
        )
        .unwrap();
        assert!(is_empty_result(&left, &result));
    }

    #[test]
    fn matched_contribution_is_not_flagged_empty() {
        let left = df!("CustomerID" => ["C1", "C2"]).unwrap();
        let result = df!(
            "CustomerID" => ["C1", "C2"],
            "Tickets" => [Some(3i64), None]
        )
        .unwrap();
        assert!(!is_empty_result(&left, &result));
    }
}
