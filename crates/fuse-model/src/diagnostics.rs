//! Join-health diagnostic records.
//!
//! A [`JoinDiagnostics`] describes either a prospective join (before the
//! operator confirms it) or a completed one. Records are plain data with
//! serde derives so UI and persistence layers never touch the frame
//! engine. Columns missing from a table are simply omitted from the
//! record, never an error.

use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Which join a diagnostic record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    /// Pairwise intra-category join; `pair` is the 1-based file pair
    /// (accumulator through file `pair.0`, joined with file `pair.1`).
    IntraPair { category: Category, pair: (usize, usize) },
    /// Single-file category accepted as its own consolidated table.
    SingleTable { category: Category },
    /// A secondary category left-joined onto the billing base.
    Inter { secondary: Category },
}

/// Per-key-column cardinality and null statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCardinality {
    pub column: String,
    pub left_unique: usize,
    /// Absent for single-table diagnostics.
    pub right_unique: Option<usize>,
    /// Populated once the join has been committed.
    pub result_unique: Option<usize>,
    /// Null count of this key in the committed result.
    pub result_nulls: Option<usize>,
}

/// Observed min/max of a date column, as formatted values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub column: String,
    pub min: String,
    pub max: String,
}

/// Health statistics for a prospective or completed join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinDiagnostics {
    pub kind: JoinKind,
    pub left_rows: usize,
    /// Absent for single-table diagnostics.
    pub right_rows: Option<usize>,
    /// Absent until the join is committed.
    pub result_rows: Option<usize>,
    pub keys: Vec<KeyCardinality>,
    /// Fraction (0..=100) of distinct base keys present in the secondary
    /// table. Inter-category joins only.
    pub overlap_pct: Option<f64>,
    /// Observed range of the relevant date column, when present.
    pub date_range: Option<DateRange>,
    /// True when the committed result has zero rows or every joined
    /// secondary value is null. Reported for operator review, not an
    /// error.
    pub empty_result: bool,
}

impl JoinDiagnostics {
    /// True when the record describes a join that has not been
    /// committed yet.
    pub fn is_prospective(&self) -> bool {
        self.result_rows.is_none()
    }

    pub fn category(&self) -> Category {
        match self.kind {
            JoinKind::IntraPair { category, .. } | JoinKind::SingleTable { category } => category,
            JoinKind::Inter { secondary } => secondary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prospective_until_result_known() {
        let mut diag = JoinDiagnostics {
            kind: JoinKind::SingleTable {
                category: Category::Usage,
            },
            left_rows: 10,
            right_rows: None,
            result_rows: None,
            keys: Vec::new(),
            overlap_pct: None,
            date_range: None,
            empty_result: false,
        };
        assert!(diag.is_prospective());
        diag.result_rows = Some(10);
        assert!(!diag.is_prospective());
    }

    #[test]
    fn round_trips_through_json() {
        let diag = JoinDiagnostics {
            kind: JoinKind::Inter {
                secondary: Category::Support,
            },
            left_rows: 80,
            right_rows: Some(95),
            result_rows: Some(80),
            keys: vec![KeyCardinality {
                column: "CustomerID".to_string(),
                left_unique: 40,
                right_unique: Some(45),
                result_unique: Some(40),
                result_nulls: Some(0),
            }],
            overlap_pct: Some(87.5),
            date_range: Some(DateRange {
                column: "BillingDate".to_string(),
                min: "2024-01-01".to_string(),
                max: "2024-06-30".to_string(),
            }),
            empty_result: false,
        };
        let json = serde_json::to_string(&diag).expect("serialize diagnostics");
        let round: JoinDiagnostics = serde_json::from_str(&json).expect("deserialize diagnostics");
        assert_eq!(round, diag);
    }
}
