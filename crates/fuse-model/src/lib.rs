pub mod category;
pub mod diagnostics;
pub mod error;
pub mod keys;
pub mod state;

pub use category::{Category, Granularity, JoinOrder};
pub use diagnostics::{DateRange, JoinDiagnostics, JoinKind, KeyCardinality};
pub use error::{JoinError, Result};
pub use keys::{CUSTOMER_ID, PRODUCT_ID, inter_join_keys, join_keys, membership_keys};
pub use state::{Phase, PipelineState, Signal};
