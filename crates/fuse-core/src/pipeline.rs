//! Step-wise, resumable pipeline driver.
//!
//! The engine is driven by repeated calls to [`advance`]: each call reads
//! a caller-persisted [`PipelineState`] snapshot, performs at most one
//! committed transition, and returns the successor state. Calls without
//! operator input are no-ops that report the pending action together with
//! prospective diagnostics. A failed transition returns the error and
//! leaves both the state and the derived tables unchanged, so retrying
//! after fixing inputs is safe.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use tracing::{debug, info};

use fuse_model::{
    Category, JoinDiagnostics, JoinError, JoinKind, Phase, PipelineState, Result, Signal,
    join_keys,
};

use crate::consolidate::{inner_join_pair, table_label, verify_join_keys};
use crate::diagnostics;
use crate::joiner::{
    add_presence_flags, available_secondaries, prepare_inter_join, resolve_sequence,
};
use crate::standardize::standardized;

/// Caller-owned tables the pipeline reads and derives from.
///
/// Raw tables are immutable once handed over; consolidated and final
/// tables are derived state that an explicit [`reset`] clears. The store
/// holds no hidden progress: everything needed to resume lives in the
/// persisted [`PipelineState`].
#[derive(Debug, Default, Clone)]
pub struct TableStore {
    raw: BTreeMap<Category, Vec<DataFrame>>,
    consolidated: BTreeMap<Category, DataFrame>,
    working: Option<DataFrame>,
    final_table: Option<DataFrame>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an uploaded file to a category, preserving upload order.
    pub fn add_file(&mut self, category: Category, table: DataFrame) {
        self.raw.entry(category).or_default().push(table);
    }

    pub fn with_files(
        mut self,
        category: Category,
        tables: impl IntoIterator<Item = DataFrame>,
    ) -> Self {
        for table in tables {
            self.add_file(category, table);
        }
        self
    }

    pub fn files(&self, category: Category) -> &[DataFrame] {
        self.raw.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn file_count(&self, category: Category) -> usize {
        self.files(category).len()
    }

    pub fn consolidated(&self, category: Category) -> Option<&DataFrame> {
        self.consolidated.get(&category)
    }

    pub fn consolidated_tables(&self) -> &BTreeMap<Category, DataFrame> {
        &self.consolidated
    }

    /// The running inter-join result, observable between commits.
    pub fn working_table(&self) -> Option<&DataFrame> {
        self.working.as_ref()
    }

    /// The final table, present once the pipeline reaches `Done`.
    pub fn final_table(&self) -> Option<&DataFrame> {
        self.final_table.as_ref()
    }

    fn clear_derived(&mut self) {
        self.consolidated.clear();
        self.working = None;
        self.final_table = None;
    }
}

/// What the engine is waiting on, returned by input-less calls.
#[derive(Debug, Clone)]
pub enum PendingAction {
    /// A single-file category awaits acceptance as its consolidated
    /// table.
    ConfirmSingleTable {
        category: Category,
        diagnostics: JoinDiagnostics,
    },
    /// A pairwise intra-category join awaits confirmation.
    ConfirmIntraJoin {
        category: Category,
        pair: (usize, usize),
        diagnostics: JoinDiagnostics,
    },
    /// All categories are consolidated; awaiting the go-ahead into the
    /// inter-category phase.
    ConfirmPhaseAdvance,
    /// Both secondaries are present; awaiting the operator's order.
    ChooseJoinOrder,
    /// A secondary left-join awaits confirmation.
    ConfirmInterJoin {
        secondary: Category,
        diagnostics: JoinDiagnostics,
    },
}

/// Outcome of one [`advance`] call.
#[derive(Debug, Clone)]
pub enum StepOutput {
    /// Nothing committed; the caller should elicit this action.
    Pending(PendingAction),
    /// Exactly one step was committed.
    Committed {
        diagnostics: Option<JoinDiagnostics>,
    },
    /// The pipeline is terminal; the final table is available.
    Finished,
}

/// Successor state plus the call's outcome.
#[derive(Debug, Clone)]
pub struct Advance {
    pub state: PipelineState,
    pub output: StepOutput,
}

/// Performs at most one state transition.
///
/// `input` carries the operator's confirmation or join-order choice; a
/// signal that does not match the pending action is treated as no new
/// input, keeping the call idempotent.
pub fn advance(
    state: &PipelineState,
    store: &mut TableStore,
    input: Option<Signal>,
) -> Result<Advance> {
    let mut next = state.clone();
    next.phase = normalize_phase(&next.phase, store);

    match next.phase.clone() {
        Phase::Intra { category, committed } => {
            advance_intra(next, store, input, category, committed)
        }
        Phase::IntraComplete => advance_phase_gate(next, store, input),
        Phase::AwaitingJoinOrder => advance_join_order(next, input),
        Phase::Inter { joined } => advance_inter(next, store, input, joined),
        Phase::Done => Ok(Advance {
            state: next,
            output: StepOutput::Finished,
        }),
    }
}

/// Clears derived tables and returns a fresh state with the same
/// granularity. Always safe: the caller retains the raw tables.
pub fn reset(state: &PipelineState, store: &mut TableStore) -> PipelineState {
    store.clear_derived();
    info!("pipeline reset");
    PipelineState::new(state.granularity)
}

/// Skips categories without files; a category with uploads is never
/// skipped. Deterministic and commit-free, so repeated normalization of
/// the same snapshot yields the same phase.
fn normalize_phase(phase: &Phase, store: &TableStore) -> Phase {
    let Phase::Intra { category, committed } = phase else {
        return phase.clone();
    };
    let mut current = *category;
    let mut committed = *committed;
    loop {
        if store.file_count(current) > 0 {
            return Phase::Intra {
                category: current,
                committed,
            };
        }
        debug!(category = %current, "skipping category without files");
        match current.next() {
            Some(next) => {
                current = next;
                committed = 0;
            }
            None => return Phase::IntraComplete,
        }
    }
}

/// Phase that follows a finished category: the next category with files,
/// or `IntraComplete`.
fn phase_after_category(category: Category, store: &TableStore) -> Phase {
    match category.next() {
        Some(next) => normalize_phase(
            &Phase::Intra {
                category: next,
                committed: 0,
            },
            store,
        ),
        None => Phase::IntraComplete,
    }
}

fn advance_intra(
    mut state: PipelineState,
    store: &mut TableStore,
    input: Option<Signal>,
    category: Category,
    committed: usize,
) -> Result<Advance> {
    let granularity = state.granularity;
    let keys = join_keys(category, granularity);
    let file_count = store.file_count(category);
    let confirmed = matches!(input, Some(Signal::Confirm));

    if file_count == 1 {
        let table = standardized(&store.files(category)[0]);
        if !confirmed {
            let diagnostics = diagnostics::single_table(&table, category, &keys);
            state.phase = Phase::Intra { category, committed };
            return Ok(Advance {
                state,
                output: StepOutput::Pending(PendingAction::ConfirmSingleTable {
                    category,
                    diagnostics,
                }),
            });
        }
        let diagnostics = diagnostics::single_table_accepted(&table, category, &keys);
        store.consolidated.insert(category, table);
        state.record_commit(PipelineState::accept_commit_key(category));
        state.phase = phase_after_category(category, store);
        info!(category = %category, "accepted single-file category");
        return Ok(Advance {
            state,
            output: StepOutput::Committed {
                diagnostics: Some(diagnostics),
            },
        });
    }

    // Multiple files: one pairwise inner join per confirmation,
    // committed strictly left-to-right in upload order.
    let pair = (committed + 1, committed + 2);
    let accumulator = if committed == 0 {
        standardized(&store.files(category)[0])
    } else {
        store
            .consolidated(category)
            .cloned()
            .ok_or_else(|| JoinError::Frame(format!(
                "state records {committed} committed joins for '{category}' but no consolidated table exists"
            )))?
    };
    let incoming = standardized(&store.files(category)[committed + 1]);
    verify_join_keys(&accumulator, &keys, category, &table_label(category, pair.0))?;
    verify_join_keys(&incoming, &keys, category, &table_label(category, pair.1))?;

    let kind = JoinKind::IntraPair { category, pair };
    if !confirmed {
        let diagnostics = diagnostics::prospective_pair(&accumulator, &incoming, &keys, kind)?;
        state.phase = Phase::Intra { category, committed };
        return Ok(Advance {
            state,
            output: StepOutput::Pending(PendingAction::ConfirmIntraJoin {
                category,
                pair,
                diagnostics,
            }),
        });
    }

    let result = inner_join_pair(&accumulator, &incoming, &keys, &format!("_file{}", pair.1))?;
    let diagnostics = diagnostics::completed_pair(&accumulator, &incoming, &result, &keys, kind)?;
    store.consolidated.insert(category, result);
    state.record_commit(PipelineState::intra_commit_key(category, pair.0));
    let joins_needed = file_count - 1;
    state.phase = if committed + 1 == joins_needed {
        phase_after_category(category, store)
    } else {
        Phase::Intra {
            category,
            committed: committed + 1,
        }
    };
    Ok(Advance {
        state,
        output: StepOutput::Committed {
            diagnostics: Some(diagnostics),
        },
    })
}

fn advance_phase_gate(
    mut state: PipelineState,
    store: &TableStore,
    input: Option<Signal>,
) -> Result<Advance> {
    if !store.consolidated.contains_key(&Category::BASE) {
        return Err(JoinError::InsufficientCategories);
    }
    let available = available_secondaries(&store.consolidated);
    if available.is_empty() {
        return Err(JoinError::InsufficientCategories);
    }
    if !matches!(input, Some(Signal::Confirm)) {
        return Ok(Advance {
            state,
            output: StepOutput::Pending(PendingAction::ConfirmPhaseAdvance),
        });
    }
    state.phase = if available.len() == 2 && state.join_order.is_none() {
        Phase::AwaitingJoinOrder
    } else {
        Phase::Inter { joined: Vec::new() }
    };
    Ok(Advance {
        state,
        output: StepOutput::Committed { diagnostics: None },
    })
}

fn advance_join_order(mut state: PipelineState, input: Option<Signal>) -> Result<Advance> {
    match input {
        Some(Signal::ChooseOrder(order)) => {
            state.join_order = Some(order);
            state.phase = Phase::Inter { joined: Vec::new() };
            info!(%order, "join order chosen");
            Ok(Advance {
                state,
                output: StepOutput::Committed { diagnostics: None },
            })
        }
        _ => Ok(Advance {
            state,
            output: StepOutput::Pending(PendingAction::ChooseJoinOrder),
        }),
    }
}

fn advance_inter(
    mut state: PipelineState,
    store: &mut TableStore,
    input: Option<Signal>,
    joined: Vec<Category>,
) -> Result<Advance> {
    let granularity = state.granularity;
    let available = available_secondaries(&store.consolidated);
    let sequence = resolve_sequence(&available, state.join_order)?;
    let remaining: Vec<Category> = sequence
        .iter()
        .copied()
        .filter(|category| !joined.contains(category))
        .collect();
    let Some(secondary) = remaining.first().copied() else {
        // Every secondary already committed; tolerate stale snapshots.
        state.phase = Phase::Done;
        return Ok(Advance {
            state,
            output: StepOutput::Finished,
        });
    };

    let base = match store.working_table() {
        Some(working) => working.clone(),
        None => store
            .consolidated(Category::BASE)
            .cloned()
            .ok_or(JoinError::InsufficientCategories)?,
    };
    let prepared = prepare_inter_join(
        &base,
        &store.consolidated[&secondary],
        secondary,
        granularity,
    )?;
    let kind = JoinKind::Inter { secondary };

    if !matches!(input, Some(Signal::Confirm)) {
        let diagnostics = diagnostics::prospective_pair(
            &prepared.base,
            &prepared.secondary,
            &prepared.keys,
            kind,
        )?;
        return Ok(Advance {
            state,
            output: StepOutput::Pending(PendingAction::ConfirmInterJoin {
                secondary,
                diagnostics,
            }),
        });
    }

    let result = prepared.execute()?;
    let diagnostics = diagnostics::completed_pair(
        &prepared.base,
        &prepared.secondary,
        &result,
        &prepared.keys,
        kind,
    )?;
    state.record_commit(PipelineState::inter_commit_key(secondary));
    let mut joined = joined;
    joined.push(secondary);
    if joined.len() == sequence.len() {
        let mut final_table = result;
        add_presence_flags(&mut final_table, &store.consolidated, granularity)?;
        store.working = None;
        store.final_table = Some(final_table);
        state.phase = Phase::Done;
        info!("inter-category joins complete");
    } else {
        store.working = Some(result);
        state.phase = Phase::Inter { joined };
    }
    Ok(Advance {
        state,
        output: StepOutput::Committed {
            diagnostics: Some(diagnostics),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuse_model::Granularity;
    use polars::prelude::df;

    fn store_with_billing_and_usage() -> TableStore {
        let billing = df!(
            "CustomerID" => ["C1", "C2"],
            "BillingDate" => ["2024-01-01", "2024-01-02"],
            "Amount" => [10.0, 20.0]
        )
        .unwrap();
        let usage = df!(
            "CustomerID" => ["C1"],
            "UsageDate" => ["2024-01-01"],
            "Sessions" => [3i64]
        )
        .unwrap();
        TableStore::new()
            .with_files(Category::Billing, [billing])
            .with_files(Category::Usage, [usage])
    }

    #[test]
    fn no_input_is_a_no_op() {
        let mut store = store_with_billing_and_usage();
        let state = PipelineState::new(Granularity::CustomerLevel);
        let first = advance(&state, &mut store, None).unwrap();
        let second = advance(&first.state, &mut store, None).unwrap();
        assert_eq!(first.state, second.state);
        assert!(store.consolidated_tables().is_empty());
    }

    #[test]
    fn empty_categories_are_skipped() {
        let mut store = store_with_billing_and_usage();
        let state = PipelineState::new(Granularity::CustomerLevel);
        // Billing single-file acceptance.
        let step = advance(&state, &mut store, Some(Signal::Confirm)).unwrap();
        // Support has no files: the machine lands directly on usage.
        assert_eq!(
            step.state.phase,
            Phase::Intra {
                category: Category::Usage,
                committed: 0
            }
        );
    }

    #[test]
    fn terminal_state_is_immutable() {
        let mut store = store_with_billing_and_usage();
        let mut state = PipelineState::new(Granularity::CustomerLevel);
        state.phase = Phase::Done;
        let step = advance(&state, &mut store, Some(Signal::Confirm)).unwrap();
        assert_eq!(step.state, state);
        assert!(matches!(step.output, StepOutput::Finished));
    }

    #[test]
    fn reset_clears_derived_tables_only() {
        let mut store = store_with_billing_and_usage();
        let state = PipelineState::new(Granularity::CustomerLevel);
        let step = advance(&state, &mut store, Some(Signal::Confirm)).unwrap();
        assert!(store.consolidated(Category::Billing).is_some());
        let fresh = reset(&step.state, &mut store);
        assert!(store.consolidated_tables().is_empty());
        assert_eq!(fresh, PipelineState::new(Granularity::CustomerLevel));
        assert_eq!(store.file_count(Category::Billing), 1);
    }
}
