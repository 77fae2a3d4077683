//! Terminal rendering of diagnostics and pipeline status.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use fuse_core::{PendingAction, TableStore};
use fuse_model::{Category, JoinDiagnostics, JoinKind, Phase, PipelineState};

pub fn print_pending(action: &PendingAction) {
    match action {
        PendingAction::ConfirmSingleTable {
            category,
            diagnostics,
        } => {
            println!("Pending: accept the single {category} file as its consolidated table.");
            print_diagnostics(diagnostics);
            println!("Re-run with --confirm to accept.");
        }
        PendingAction::ConfirmIntraJoin {
            category,
            pair,
            diagnostics,
        } => {
            println!(
                "Pending: inner-join {category} files {} and {} on the category keys.",
                pair.0, pair.1
            );
            print_diagnostics(diagnostics);
            println!("Re-run with --confirm to commit the join.");
        }
        PendingAction::ConfirmPhaseAdvance => {
            println!("Pending: all categories consolidated.");
            println!("Re-run with --confirm to start the cross-category joins.");
        }
        PendingAction::ChooseJoinOrder => {
            println!("Pending: both usage and support tables are available.");
            println!("Re-run with --join-order usage-first or --join-order support-first.");
        }
        PendingAction::ConfirmInterJoin {
            secondary,
            diagnostics,
        } => {
            println!("Pending: left-join the {secondary} table onto the billing base.");
            print_diagnostics(diagnostics);
            println!("Re-run with --confirm to commit the join.");
        }
    }
}

pub fn print_diagnostics(diagnostics: &JoinDiagnostics) {
    println!("{}", describe_kind(diagnostics.kind));
    let rows = match (diagnostics.right_rows, diagnostics.result_rows) {
        (Some(right), Some(result)) => {
            format!(
                "Rows: {} x {} -> {}",
                diagnostics.left_rows, right, result
            )
        }
        (Some(right), None) => format!("Rows: {} x {}", diagnostics.left_rows, right),
        _ => format!("Rows: {}", diagnostics.left_rows),
    };
    println!("{rows}");
    if let Some(overlap) = diagnostics.overlap_pct {
        println!("Key overlap: {overlap:.1}%");
    }
    if let Some(range) = &diagnostics.date_range {
        println!("{}: {} .. {}", range.column, range.min, range.max);
    }
    if diagnostics.empty_result {
        println!("WARNING: the joined result is empty or carries no secondary values.");
    }
    if diagnostics.keys.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Key"),
        header_cell("Left unique"),
        header_cell("Right unique"),
        header_cell("Result unique"),
        header_cell("Result nulls"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for key in &diagnostics.keys {
        table.add_row(vec![
            Cell::new(&key.column),
            Cell::new(key.left_unique),
            optional_cell(key.right_unique),
            optional_cell(key.result_unique),
            null_cell(key.result_nulls),
        ]);
    }
    println!("{table}");
}

pub fn print_status(state: &PipelineState, store: &TableStore, skipped: &[std::path::PathBuf]) {
    println!("Granularity: {}", state.granularity);
    println!("Phase: {}", describe_phase(&state.phase));
    println!("Committed steps: {}", state.committed.len());
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Category"),
        header_cell("Files"),
        header_cell("Consolidated rows"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for category in Category::ALL {
        let files = store.file_count(category);
        let consolidated = store.consolidated(category).map(polars::prelude::DataFrame::height);
        table.add_row(vec![
            Cell::new(category.as_str()),
            Cell::new(files),
            optional_cell(consolidated),
        ]);
    }
    println!("{table}");
    if let Some(working) = store.working_table() {
        println!("Working table: {} rows x {} columns", working.height(), working.width());
    }
    if let Some(final_table) = store.final_table() {
        println!(
            "Final table: {} rows x {} columns",
            final_table.height(),
            final_table.width()
        );
    }
    if !skipped.is_empty() {
        println!("Skipped (no category detected):");
        for path in skipped {
            println!("- {}", path.display());
        }
    }
}

pub fn describe_phase(phase: &Phase) -> String {
    match phase {
        Phase::Intra { category, committed } => {
            format!("consolidating {category} ({committed} joins committed)")
        }
        Phase::IntraComplete => "consolidation complete, awaiting go-ahead".to_string(),
        Phase::AwaitingJoinOrder => "awaiting the secondary join order".to_string(),
        Phase::Inter { joined } => {
            if joined.is_empty() {
                "joining secondaries onto billing".to_string()
            } else {
                let names: Vec<&str> = joined.iter().map(Category::as_str).collect();
                format!("joining secondaries onto billing ({} done)", names.join(", "))
            }
        }
        Phase::Done => "done".to_string(),
    }
}

fn describe_kind(kind: JoinKind) -> String {
    match kind {
        JoinKind::IntraPair { category, pair } => {
            format!("{category}: files {} + {}", pair.0, pair.1)
        }
        JoinKind::SingleTable { category } => format!("{category}: single file"),
        JoinKind::Inter { secondary } => format!("billing + {secondary}"),
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn optional_cell(value: Option<usize>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn null_cell(value: Option<usize>) -> Cell {
    match value {
        Some(value) if value > 0 => Cell::new(value).fg(Color::Yellow),
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
