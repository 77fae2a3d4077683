//! Table consolidation and join engine.
//!
//! Consumes caller-owned raw tables grouped by category, consolidates
//! each category through confirmed inner joins, and left-joins the
//! consolidated categories onto the billing base into one
//! analysis-ready table. Driven step-by-step through
//! [`pipeline::advance`] with externally persisted state.

pub mod consolidate;
pub mod diagnostics;
pub mod frame_utils;
pub mod joiner;
pub mod pipeline;
pub mod standardize;

pub use consolidate::{consolidate_category, inner_join_pair, verify_join_keys};
pub use joiner::{add_presence_flags, build_final_table, prepare_inter_join, resolve_sequence};
pub use pipeline::{Advance, PendingAction, StepOutput, TableStore, advance, reset};
pub use standardize::{standardize_columns, standardized};
