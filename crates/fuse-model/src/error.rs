use thiserror::Error;

use crate::category::Category;

/// Typed failures surfaced by the join engine.
///
/// Every error is returned to the caller as a `Result`; a failed
/// transition never crosses the state-machine boundary as a panic and
/// never mutates the pipeline state, so retrying after fixing inputs
/// is always safe.
#[derive(Debug, Error)]
pub enum JoinError {
    /// A required join key column is absent from a specific table.
    #[error("join key '{key}' not found in {table} ({category} category)")]
    MissingJoinKey {
        category: Category,
        /// Human-readable table label, e.g. "usage file 2".
        table: String,
        key: String,
    },

    /// The inter-category phase needs the billing base plus at least
    /// one usage or support table.
    #[error("at least one usage or support table is required for joining")]
    InsufficientCategories,

    /// A key column could not be coerced to a common comparable type.
    #[error("column '{column}' could not be coerced to a common type: {left} vs {right}")]
    TypeMismatch {
        column: String,
        left: String,
        right: String,
    },

    /// An underlying frame-engine operation failed.
    #[error("frame operation failed: {0}")]
    Frame(String),
}

pub type Result<T> = std::result::Result<T, JoinError>;
