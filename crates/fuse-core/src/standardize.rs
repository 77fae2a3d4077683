//! Key-column name standardization.
//!
//! Uploaded files frequently carry duplicate-suffixed key columns
//! (`CustomerID_` and similar export artifacts). Every known variant is
//! listed in a declarative table consulted before any join; extending the
//! list never touches join logic. Standardization is idempotent and never
//! fails: a missing key is simply left absent and surfaces later as a
//! join-key error.

use polars::prelude::DataFrame;
use tracing::debug;

use crate::frame_utils::has_column;

/// Canonical key column names and their known upload variants.
const KEY_VARIANTS: &[(&str, &[&str])] = &[
    ("CustomerID", &["CustomerID_", "customer_id"]),
    ("ProductID", &["ProductID_", "product_id"]),
    ("BillingDate", &["BillingDate_"]),
    ("UsageDate", &["UsageDate_"]),
    ("TicketOpenDate", &["TicketOpenDate_"]),
];

/// Rewrites known key-name variants to their canonical names.
///
/// Returns the applied `(variant, canonical)` renames. A variant is left
/// untouched when the canonical column already exists, since renaming
/// would create a duplicate label.
pub fn standardize_columns(df: &mut DataFrame) -> Vec<(String, String)> {
    let mut applied = Vec::new();
    for (canonical, variants) in KEY_VARIANTS {
        if has_column(df, canonical) {
            continue;
        }
        for variant in *variants {
            if has_column(df, variant) {
                if df.rename(variant, (*canonical).into()).is_ok() {
                    debug!(variant, canonical, "standardized key column");
                    applied.push(((*variant).to_string(), (*canonical).to_string()));
                }
                break;
            }
        }
    }
    applied
}

/// Standardizing copy of `df`, leaving the caller-owned input untouched.
pub fn standardized(df: &DataFrame) -> DataFrame {
    let mut copy = df.clone();
    standardize_columns(&mut copy);
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    #[test]
    fn renames_trailing_underscore_variants() {
        let mut frame = df!(
            "CustomerID_" => ["C1", "C2"],
            "BillingDate" => ["2024-01-01", "2024-01-02"],
            "Amount" => [10.0, 20.0]
        )
        .unwrap();
        let applied = standardize_columns(&mut frame);
        assert_eq!(
            applied,
            vec![("CustomerID_".to_string(), "CustomerID".to_string())]
        );
        assert!(has_column(&frame, "CustomerID"));
        assert!(!has_column(&frame, "CustomerID_"));
    }

    #[test]
    fn is_idempotent() {
        let mut frame = df!(
            "CustomerID_" => ["C1"],
            "UsageDate_" => ["2024-01-01"]
        )
        .unwrap();
        standardize_columns(&mut frame);
        let names_after_first: Vec<String> = crate::frame_utils::column_names(&frame);
        let applied_again = standardize_columns(&mut frame);
        assert!(applied_again.is_empty());
        assert_eq!(crate::frame_utils::column_names(&frame), names_after_first);
    }

    #[test]
    fn variant_kept_when_canonical_already_present() {
        let mut frame = df!(
            "CustomerID" => ["C1"],
            "CustomerID_" => ["C9"]
        )
        .unwrap();
        let applied = standardize_columns(&mut frame);
        assert!(applied.is_empty());
        assert!(has_column(&frame, "CustomerID_"));
    }

    #[test]
    fn missing_keys_are_left_absent() {
        let mut frame = df!("Amount" => [1.0]).unwrap();
        let applied = standardize_columns(&mut frame);
        assert!(applied.is_empty());
        assert!(!has_column(&frame, "CustomerID"));
    }
}
