use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to read directory {}: {source}", path.display())]
    DirectoryRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read CSV {}: {message}", path.display())]
    CsvRead { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, IngestError>;
