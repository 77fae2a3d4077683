use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use fuse_ingest::{IngestError, discover_tables, list_csv_files};
use fuse_model::Category;

fn scratch_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("fuse-ingest-{label}-{nanos}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn missing_directory_is_an_error() {
    let dir = std::env::temp_dir().join("fuse-ingest-does-not-exist");
    let error = list_csv_files(&dir).unwrap_err();
    assert!(matches!(error, IngestError::DirectoryNotFound { .. }));
}

#[test]
fn lists_only_csv_files_in_name_order() {
    let dir = scratch_dir("list");
    fs::write(dir.join("b_usage.csv"), "CustomerID,UsageDate\nC1,2024-01-01\n").unwrap();
    fs::write(dir.join("a_billing.CSV"), "CustomerID,BillingDate\nC1,2024-01-01\n").unwrap();
    fs::write(dir.join("notes.txt"), "ignore me").unwrap();

    let files = list_csv_files(&dir).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|path| path.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["a_billing.CSV", "b_usage.csv"]);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn classifies_by_headers_and_reports_skipped() {
    let dir = scratch_dir("classify");
    fs::write(
        dir.join("extract_one.csv"),
        "CustomerID,BillingDate,Amount\nC1,2024-01-01,10\n",
    )
    .unwrap();
    fs::write(
        dir.join("extract_two.csv"),
        "CustomerID,BillingDate,Amount\nC2,2024-01-02,20\n",
    )
    .unwrap();
    fs::write(
        dir.join("tickets.csv"),
        "CustomerID,TicketOpenDate_\nC1,2024-01-03\n",
    )
    .unwrap();
    fs::write(dir.join("mystery.csv"), "Foo,Bar\n1,2\n").unwrap();

    let discovered = discover_tables(&dir).unwrap();
    assert_eq!(discovered.file_count(), 3);
    assert_eq!(discovered.tables[&Category::Billing].len(), 2);
    assert_eq!(discovered.tables[&Category::Support].len(), 1);
    assert!(!discovered.tables.contains_key(&Category::Usage));
    assert_eq!(discovered.skipped.len(), 1);
    assert!(discovered.skipped[0].ends_with("mystery.csv"));

    // Upload order follows filename order within a category.
    let billing = &discovered.tables[&Category::Billing];
    assert!(billing[0].path.ends_with("extract_one.csv"));
    assert!(billing[1].path.ends_with("extract_two.csv"));

    fs::remove_dir_all(&dir).unwrap();
}
