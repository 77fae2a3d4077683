//! CLI argument definitions for tablefuse.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use fuse_model::{Granularity, JoinOrder};

#[derive(Parser)]
#[command(
    name = "tablefuse",
    version,
    about = "tablefuse - consolidate and join categorized customer tables",
    long_about = "Consolidate billing, support and usage CSV extracts into a single\n\
                  analysis table.\n\n\
                  Files within a category are reduced by inner joins; support and\n\
                  usage are then left-joined onto the billing base. Every join is\n\
                  confirmed step by step, with progress persisted between runs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run every remaining join to completion, confirming each step.
    Run(RunArgs),

    /// Perform at most one pipeline step, then persist progress.
    Step(StepArgs),

    /// Show discovered files, consolidation progress and the current phase.
    Status(DataArgs),

    /// Write the final table as CSV.
    Export(ExportArgs),

    /// Discard persisted progress, keeping the raw CSV files.
    Reset(DataArgs),
}

/// Arguments shared by every subcommand that touches a data directory.
#[derive(Parser)]
pub struct DataArgs {
    /// Directory containing the categorized CSV files.
    #[arg(value_name = "DATA_DIR")]
    pub data_dir: PathBuf,

    /// Path of the persisted progress file (default: <DATA_DIR>/.tablefuse-state.json).
    #[arg(long = "state", value_name = "PATH")]
    pub state: Option<PathBuf>,

    /// Join granularity. Product level requires ProductID in every table.
    #[arg(long = "granularity", value_enum, default_value = "customer")]
    pub granularity: GranularityArg,
}

impl DataArgs {
    pub fn state_path(&self) -> PathBuf {
        self.state
            .clone()
            .unwrap_or_else(|| self.data_dir.join(".tablefuse-state.json"))
    }
}

#[derive(Parser)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Order of the secondary joins. Required when both usage and
    /// support tables are present.
    #[arg(long = "join-order", value_enum)]
    pub join_order: Option<JoinOrderArg>,

    /// Write the final table to this CSV path once the run completes.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct StepArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Confirm the pending join or phase transition.
    #[arg(long = "confirm")]
    pub confirm: bool,

    /// Choose the order of the secondary joins (commits the choice).
    #[arg(long = "join-order", value_enum, conflicts_with = "confirm")]
    pub join_order: Option<JoinOrderArg>,
}

#[derive(Parser)]
pub struct ExportArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Output CSV path (default: <DATA_DIR>/final_table.csv).
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// CLI granularity choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum GranularityArg {
    Customer,
    Product,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Customer => Granularity::CustomerLevel,
            GranularityArg::Product => Granularity::ProductLevel,
        }
    }
}

/// CLI join-order choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum JoinOrderArg {
    UsageFirst,
    SupportFirst,
}

impl From<JoinOrderArg> for JoinOrder {
    fn from(arg: JoinOrderArg) -> Self {
        match arg {
            JoinOrderArg::UsageFirst => JoinOrder::UsageFirst,
            JoinOrderArg::SupportFirst => JoinOrder::SupportFirst,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
