//! Deterministic category detection.
//!
//! Each category has a native date column, which makes headers the most
//! reliable signal: a table carrying `UsageDate` is a usage extract. The
//! file stem is the fallback for tables whose date column was renamed
//! upstream. Callers may always override the detected category.

use polars::prelude::DataFrame;

use fuse_model::Category;

/// Detects the category of a loaded table from its headers, falling
/// back to the file stem. Returns `None` when neither signal matches.
pub fn detect_category(stem: &str, frame: &DataFrame) -> Option<Category> {
    by_date_column(frame).or_else(|| by_stem(stem))
}

fn by_date_column(frame: &DataFrame) -> Option<Category> {
    let names: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|name| name.trim_end_matches('_').to_string())
        .collect();
    Category::ALL
        .into_iter()
        .find(|category| names.iter().any(|name| name == category.date_column()))
}

fn by_stem(stem: &str) -> Option<Category> {
    let lowered = stem.to_lowercase();
    Category::ALL
        .into_iter()
        .find(|category| lowered.contains(category.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    #[test]
    fn detects_by_native_date_column() {
        let frame = df!(
            "CustomerID" => ["C1"],
            "UsageDate" => ["2024-01-01"]
        )
        .unwrap();
        assert_eq!(detect_category("extract_7", &frame), Some(Category::Usage));
    }

    #[test]
    fn detects_suffixed_date_variant() {
        let frame = df!(
            "CustomerID" => ["C1"],
            "TicketOpenDate_" => ["2024-01-01"]
        )
        .unwrap();
        assert_eq!(detect_category("dump", &frame), Some(Category::Support));
    }

    #[test]
    fn falls_back_to_file_stem() {
        let frame = df!("CustomerID" => ["C1"]).unwrap();
        assert_eq!(
            detect_category("billing_2024_q1", &frame),
            Some(Category::Billing)
        );
        assert_eq!(detect_category("mystery", &frame), None);
    }
}
