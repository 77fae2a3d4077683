//! Subcommand implementations.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use tracing::{info, info_span, warn};

use fuse_core::{PendingAction, StepOutput, TableStore, advance};
use fuse_ingest::discover_tables;
use fuse_model::{PipelineState, Signal};

use crate::cli::{DataArgs, ExportArgs, RunArgs, StepArgs};
use crate::state_io;
use crate::summary;

struct LoadedData {
    store: TableStore,
    skipped: Vec<PathBuf>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let span = info_span!("run", data_dir = %args.data.data_dir.display());
    let _guard = span.enter();
    let LoadedData { mut store, skipped } = load_data(&args.data)?;
    warn_skipped(&skipped);
    let mut state = initial_state(&args.data, &mut store)?;
    let state_path = args.data.state_path();

    loop {
        let probe = advance(&state, &mut store, None)?;
        state = probe.state;
        let signal = match probe.output {
            StepOutput::Finished => break,
            StepOutput::Pending(PendingAction::ChooseJoinOrder) => {
                let order = args.join_order.ok_or_else(|| {
                    anyhow!(
                        "both usage and support tables are present; \
                         pass --join-order usage-first or --join-order support-first"
                    )
                })?;
                Signal::ChooseOrder(order.into())
            }
            StepOutput::Pending(_) => Signal::Confirm,
            StepOutput::Committed { .. } => continue,
        };
        let step = advance(&state, &mut store, Some(signal))?;
        if let StepOutput::Committed {
            diagnostics: Some(diagnostics),
        } = &step.output
        {
            summary::print_diagnostics(diagnostics);
        }
        state = step.state;
        // Persist after every commit so an aborted run resumes where it
        // stopped.
        state_io::save_state(&state_path, &state)?;
    }

    state_io::save_state(&state_path, &state)?;
    let final_table = store
        .final_table()
        .ok_or_else(|| anyhow!("pipeline finished without producing a final table"))?;
    println!(
        "Final table: {} rows x {} columns",
        final_table.height(),
        final_table.width()
    );
    if let Some(path) = &args.output {
        write_csv(final_table, path)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

pub fn step(args: &StepArgs) -> Result<()> {
    let LoadedData { mut store, skipped } = load_data(&args.data)?;
    warn_skipped(&skipped);
    let state = initial_state(&args.data, &mut store)?;

    let signal = if let Some(order) = args.join_order {
        Some(Signal::ChooseOrder(order.into()))
    } else if args.confirm {
        Some(Signal::Confirm)
    } else {
        None
    };
    let step = advance(&state, &mut store, signal)?;
    match &step.output {
        StepOutput::Pending(action) => summary::print_pending(action),
        StepOutput::Committed { diagnostics } => {
            println!("Committed one step.");
            if let Some(diagnostics) = diagnostics {
                summary::print_diagnostics(diagnostics);
            }
            println!("Now: {}", summary::describe_phase(&step.state.phase));
        }
        StepOutput::Finished => {
            println!("Pipeline is complete; use 'tablefuse export' to write the final table.");
        }
    }
    state_io::save_state(&args.data.state_path(), &step.state)?;
    Ok(())
}

pub fn status(args: &DataArgs) -> Result<()> {
    let LoadedData { mut store, skipped } = load_data(args)?;
    let state = initial_state(args, &mut store)?;
    summary::print_status(&state, &store, &skipped);
    Ok(())
}

pub fn export(args: &ExportArgs) -> Result<()> {
    let LoadedData { mut store, .. } = load_data(&args.data)?;
    let state = initial_state(&args.data, &mut store)?;
    if !state.is_terminal() {
        bail!(
            "pipeline is not finished ({}); complete it with 'tablefuse run' or 'tablefuse step'",
            summary::describe_phase(&state.phase)
        );
    }
    let final_table = store
        .final_table()
        .ok_or_else(|| anyhow!("no final table available"))?;
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| args.data.data_dir.join("final_table.csv"));
    write_csv(final_table, &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn reset(args: &DataArgs) -> Result<()> {
    let path = args.state_path();
    if state_io::remove_state(&path)? {
        info!(path = %path.display(), "removed pipeline state");
        println!("Progress discarded; raw CSV files are untouched.");
    } else {
        println!("Nothing to reset.");
    }
    Ok(())
}

fn load_data(args: &DataArgs) -> Result<LoadedData> {
    let discovered = discover_tables(&args.data_dir)
        .with_context(|| format!("scan data directory {}", args.data_dir.display()))?;
    if discovered.is_empty() {
        bail!(
            "no categorized CSV files found in {}",
            args.data_dir.display()
        );
    }
    let mut store = TableStore::new();
    for (category, tables) in discovered.tables {
        for table in tables {
            store.add_file(category, table.frame);
        }
    }
    Ok(LoadedData {
        store,
        skipped: discovered.skipped,
    })
}

fn warn_skipped(skipped: &[PathBuf]) {
    for path in skipped {
        warn!(path = %path.display(), "no category detected, file ignored");
    }
}

/// Loads the persisted snapshot and replays it against the freshly
/// discovered tables, or starts fresh when no snapshot exists.
fn initial_state(args: &DataArgs, store: &mut TableStore) -> Result<PipelineState> {
    match state_io::load_state(&args.state_path())? {
        Some(persisted) => replay(&persisted, store),
        None => Ok(PipelineState::new(args.granularity.into())),
    }
}

/// Re-derives the consolidated and working tables recorded in a
/// persisted snapshot by re-running its committed transitions against
/// the raw tables. The engine is deterministic, so feeding the recorded
/// confirmations reproduces the snapshot exactly; a mismatch means the
/// data directory changed since the snapshot was written.
fn replay(persisted: &PipelineState, store: &mut TableStore) -> Result<PipelineState> {
    let mut state = PipelineState::new(persisted.granularity);
    // Commits plus the commit-free transitions (phase gate, join order).
    let limit = persisted.committed.len() + 4;
    for _ in 0..=limit {
        let probe = advance(&state, store, None)?;
        state = probe.state;
        if state == *persisted {
            return Ok(state);
        }
        let signal = match probe.output {
            StepOutput::Finished => break,
            StepOutput::Pending(PendingAction::ChooseJoinOrder) => {
                let order = persisted
                    .join_order
                    .ok_or_else(|| anyhow!("saved progress is missing its join order"))?;
                Signal::ChooseOrder(order)
            }
            StepOutput::Pending(_) => Signal::Confirm,
            StepOutput::Committed { .. } => continue,
        };
        let step = advance(&state, store, Some(signal))?;
        state = step.state;
        if state == *persisted {
            return Ok(state);
        }
    }
    bail!(
        "saved progress does not match the data directory; \
         run 'tablefuse reset' and start over"
    )
}

fn write_csv(frame: &DataFrame, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("create output file {}", path.display()))?;
    let mut frame = frame.clone();
    CsvWriter::new(file)
        .include_header(true)
        .finish(&mut frame)
        .with_context(|| format!("write CSV {}", path.display()))?;
    Ok(())
}
