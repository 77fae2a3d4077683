//! CSV ingestion and category discovery for the tablefuse engine.

pub mod detect;
pub mod discovery;
pub mod error;
pub mod loader;

pub use detect::detect_category;
pub use discovery::{DiscoveredTables, LoadedTable, discover_tables, list_csv_files};
pub use error::{IngestError, Result};
pub use loader::read_csv;
