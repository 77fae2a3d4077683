//! CLI library components for tablefuse.

pub mod logging;
