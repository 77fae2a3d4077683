//! CSV file loading.

use std::path::Path;

use polars::prelude::{CsvReadOptions, DataFrame, SerReader};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Reads one CSV file into a frame. Headers are required; schema is
/// inferred from the leading rows.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let reader = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|error| IngestError::CsvRead {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
    let frame = reader.finish().map_err(|error| IngestError::CsvRead {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    debug!(path = %path.display(), rows = frame.height(), columns = frame.width(), "loaded csv");
    Ok(frame)
}
