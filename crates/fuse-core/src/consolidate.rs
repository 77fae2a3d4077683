//! Intra-category consolidation.
//!
//! Files within one category are reduced left-to-right, in upload order,
//! through pairwise inner joins on the category's join key set. Inner
//! semantics are deliberate: within a category, rows that do not match
//! across files are incomplete duplicates of the same billing/usage/
//! support event, not valid data points to pad with nulls.

use polars::prelude::{DataFrame, IntoLazy, JoinArgs, JoinType, col};
use tracing::{debug, info};

use fuse_model::{Category, Granularity, JoinError, Result, join_keys};

use crate::frame_utils::{frame_error, has_column};
use crate::standardize::standardized;

/// Verifies every join key is present, naming the offending table
/// otherwise.
pub fn verify_join_keys(
    df: &DataFrame,
    keys: &[&str],
    category: Category,
    table: &str,
) -> Result<()> {
    for key in keys {
        if !has_column(df, key) {
            return Err(JoinError::MissingJoinKey {
                category,
                table: table.to_string(),
                key: (*key).to_string(),
            });
        }
    }
    Ok(())
}

/// Inner join of one consolidated accumulator with the next file.
///
/// Non-key column collisions on the right side receive `suffix`.
pub fn inner_join_pair(
    left: &DataFrame,
    right: &DataFrame,
    keys: &[&str],
    suffix: &str,
) -> Result<DataFrame> {
    let left_on: Vec<_> = keys.iter().map(|key| col(*key)).collect();
    let right_on = left_on.clone();
    let joined = left
        .clone()
        .lazy()
        .join(
            right.clone().lazy(),
            left_on,
            right_on,
            JoinArgs::new(JoinType::Inner).with_suffix(Some(suffix.into())),
        )
        .collect()
        .map_err(frame_error)?;
    debug!(
        left_rows = left.height(),
        right_rows = right.height(),
        result_rows = joined.height(),
        "committed inner join"
    );
    Ok(joined)
}

/// Label used in errors and logs for the `index`-th file (1-based) of a
/// category.
pub fn table_label(category: Category, index: usize) -> String {
    format!("{} file {index}", category.as_str())
}

/// Consolidates all files of one category in a single call.
///
/// The interactive pipeline commits one pairwise join per resumption;
/// this convenience reduction applies the identical sequence at once and
/// is primarily useful for non-interactive callers and tests.
pub fn consolidate_category(
    files: &[DataFrame],
    category: Category,
    granularity: Granularity,
) -> Result<DataFrame> {
    let keys = join_keys(category, granularity);
    let first = files.first().ok_or_else(|| JoinError::Frame(format!(
        "no files to consolidate for category '{category}'"
    )))?;
    let mut accumulator = standardized(first);
    if files.len() == 1 {
        return Ok(accumulator);
    }
    verify_join_keys(&accumulator, &keys, category, &table_label(category, 1))?;
    for (index, file) in files.iter().enumerate().skip(1) {
        let incoming = standardized(file);
        verify_join_keys(&incoming, &keys, category, &table_label(category, index + 1))?;
        accumulator = inner_join_pair(
            &accumulator,
            &incoming,
            &keys,
            &format!("_file{}", index + 1),
        )?;
    }
    info!(
        category = %category,
        files = files.len(),
        rows = accumulator.height(),
        "consolidated category"
    );
    Ok(accumulator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    fn billing_file_one() -> DataFrame {
        df!(
            "CustomerID" => ["C1", "C2", "C3"],
            "BillingDate" => ["2024-01-01", "2024-01-01", "2024-02-01"],
            "Amount" => [100.0, 200.0, 300.0]
        )
        .unwrap()
    }

    fn billing_file_two() -> DataFrame {
        df!(
            "CustomerID_" => ["C1", "C3", "C4"],
            "BillingDate" => ["2024-01-01", "2024-02-01", "2024-03-01"],
            "Tax" => [10.0, 30.0, 40.0]
        )
        .unwrap()
    }

    #[test]
    fn single_file_is_standardized_passthrough() {
        let files = vec![billing_file_two()];
        let result =
            consolidate_category(&files, Category::Billing, Granularity::CustomerLevel).unwrap();
        assert_eq!(result.height(), 3);
        assert!(has_column(&result, "CustomerID"));
    }

    #[test]
    fn inner_join_keeps_matching_rows_only() {
        let files = vec![billing_file_one(), billing_file_two()];
        let result =
            consolidate_category(&files, Category::Billing, Granularity::CustomerLevel).unwrap();
        // C1 and C3 match on (CustomerID, BillingDate); C2 and C4 do not.
        assert_eq!(result.height(), 2);
        assert!(has_column(&result, "Amount"));
        assert!(has_column(&result, "Tax"));
    }

    #[test]
    fn missing_key_names_table_and_key() {
        let incomplete = df!(
            "CustomerID" => ["C1"],
            "Amount" => [1.0]
        )
        .unwrap();
        let files = vec![billing_file_one(), incomplete];
        let error = consolidate_category(&files, Category::Billing, Granularity::CustomerLevel)
            .unwrap_err();
        match error {
            JoinError::MissingJoinKey { category, table, key } => {
                assert_eq!(category, Category::Billing);
                assert_eq!(table, "billing file 2");
                assert_eq!(key, "BillingDate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reduction_never_exceeds_minimum_matched_subset() {
        let third = df!(
            "CustomerID" => ["C1"],
            "BillingDate" => ["2024-01-01"],
            "Discount" => [5.0]
        )
        .unwrap();
        let files = vec![billing_file_one(), billing_file_two(), third];
        let result =
            consolidate_category(&files, Category::Billing, Granularity::CustomerLevel).unwrap();
        assert_eq!(result.height(), 1);
    }
}
