//! Directory discovery and classification.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;
use tracing::{info, warn};

use fuse_model::Category;

use crate::detect::detect_category;
use crate::error::{IngestError, Result};
use crate::loader::read_csv;

/// A loaded table together with its source path.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub path: PathBuf,
    pub frame: DataFrame,
}

/// Result of scanning a data directory.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredTables {
    /// Classified tables per category, in filename order (the upload
    /// order the join engine honors).
    pub tables: BTreeMap<Category, Vec<LoadedTable>>,
    /// CSV files no category could be determined for.
    pub skipped: Vec<PathBuf>,
}

impl DiscoveredTables {
    pub fn file_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Lists all CSV files in a directory, sorted by filename.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|source| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| extension.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Loads and classifies every CSV in `dir`. Unclassifiable files are
/// reported in `skipped`, not an error: the operator decides whether to
/// rename or drop them.
pub fn discover_tables(dir: &Path) -> Result<DiscoveredTables> {
    let mut discovered = DiscoveredTables::default();
    for path in list_csv_files(dir)? {
        let frame = read_csv(&path)?;
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("");
        match detect_category(stem, &frame) {
            Some(category) => {
                info!(path = %path.display(), %category, rows = frame.height(), "classified table");
                discovered
                    .tables
                    .entry(category)
                    .or_default()
                    .push(LoadedTable { path, frame });
            }
            None => {
                warn!(path = %path.display(), "could not determine category, skipping");
                discovered.skipped.push(path);
            }
        }
    }
    Ok(discovered)
}
