//! Externally persisted pipeline progress.
//!
//! [`PipelineState`] is the explicit state value the caller persists
//! between calls into the engine. It replaces a mutable session store:
//! the engine reads a snapshot, returns a successor, and never retains
//! hidden state of its own. How the snapshot survives across calls
//! (JSON file, database row, ...) is the caller's concern.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::category::{Category, Granularity, JoinOrder};

/// Pipeline phase. Transitions are monotonic: intra-category joins run
/// first, then (optionally) the join-order choice, then inter-category
/// joins. `Done` is terminal and only an explicit reset leaves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Consolidating one category; `committed` counts the pairwise
    /// joins already committed for it.
    Intra { category: Category, committed: usize },
    /// Every category with files has a consolidated table; awaiting
    /// confirmation to enter the inter-category phase.
    IntraComplete,
    /// Both secondary categories are available; awaiting the
    /// operator's join-order choice.
    AwaitingJoinOrder,
    /// Left-joining secondaries onto the billing base; `joined` lists
    /// the secondaries committed so far, in join order.
    Inter { joined: Vec<Category> },
    /// Final table produced. Terminal.
    Done,
}

/// Operator input carried into a resume call. At most one signal is
/// consumed per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// Confirm the pending join or phase transition.
    Confirm,
    /// Choose the secondary join order (only meaningful while the
    /// machine awaits it).
    ChooseOrder(JoinOrder),
}

/// The persisted progress record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    pub granularity: Granularity,
    pub phase: Phase,
    /// Chosen secondary order, once elicited.
    pub join_order: Option<JoinOrder>,
    /// Identifiers of joins already committed, e.g. `"billing:1"` or
    /// `"inter:usage"`. A resume call re-confirming one of these is a
    /// no-op.
    pub committed: BTreeSet<String>,
}

impl PipelineState {
    /// Fresh state at the start of the intra-category phase.
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            phase: Phase::Intra {
                category: Category::Billing,
                committed: 0,
            },
            join_order: None,
            committed: BTreeSet::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    /// Session key for a pairwise intra join, mirroring one
    /// confirmation per committed pair.
    pub fn intra_commit_key(category: Category, pair_index: usize) -> String {
        format!("{}:{}", category.as_str(), pair_index)
    }

    /// Session key for a single-file category accepted as consolidated.
    pub fn accept_commit_key(category: Category) -> String {
        format!("{}:accept", category.as_str())
    }

    /// Session key for a committed secondary join.
    pub fn inter_commit_key(secondary: Category) -> String {
        format!("inter:{}", secondary.as_str())
    }

    pub fn is_committed(&self, key: &str) -> bool {
        self.committed.contains(key)
    }

    pub fn record_commit(&mut self, key: String) {
        self.committed.insert(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_at_billing() {
        let state = PipelineState::new(Granularity::CustomerLevel);
        assert_eq!(
            state.phase,
            Phase::Intra {
                category: Category::Billing,
                committed: 0
            }
        );
        assert!(!state.is_terminal());
        assert!(state.committed.is_empty());
    }

    #[test]
    fn commit_keys_are_stable() {
        assert_eq!(
            PipelineState::intra_commit_key(Category::Billing, 1),
            "billing:1"
        );
        assert_eq!(
            PipelineState::accept_commit_key(Category::Usage),
            "usage:accept"
        );
        assert_eq!(
            PipelineState::inter_commit_key(Category::Usage),
            "inter:usage"
        );
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut state = PipelineState::new(Granularity::ProductLevel);
        state.join_order = Some(JoinOrder::SupportFirst);
        state.record_commit(PipelineState::intra_commit_key(Category::Billing, 1));
        state.phase = Phase::Inter {
            joined: vec![Category::Support],
        };
        let json = serde_json::to_string(&state).expect("serialize state");
        let round: PipelineState = serde_json::from_str(&json).expect("deserialize state");
        assert_eq!(round, state);
    }
}
