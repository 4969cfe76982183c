//! This module contains the [`Trail`], the record of branch decisions that
//! were taken to reach an execution state.

use std::fmt::{Display, Formatter};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The ordered sequence of branch identifiers chosen to reach a state.
///
/// A decision is only recorded when a step produces more than one successor,
/// and the identifier is the 1-based index of the chosen successor in step
/// order. Feeding a trail to the selected branches strategy replays the path.
#[derive(
    Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct Trail {
    decisions: Vec<u64>,
}

impl Trail {
    /// Creates an empty trail, as held by the initial state of a run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the branch with identifier `decision` was taken.
    pub fn push(&mut self, decision: u64) {
        self.decisions.push(decision);
    }

    /// Gets the decisions in the order that they were taken.
    #[must_use]
    pub fn decisions(&self) -> &[u64] {
        self.decisions.as_slice()
    }

    /// Gets the most recent decision, if any.
    #[must_use]
    pub fn last(&self) -> Option<u64> {
        self.decisions.last().copied()
    }

    /// Gets the number of decisions in the trail.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    /// Checks if no decision has been taken yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

impl From<Vec<u64>> for Trail {
    fn from(decisions: Vec<u64>) -> Self {
        Self { decisions }
    }
}

impl From<Trail> for Vec<u64> {
    fn from(value: Trail) -> Self {
        value.decisions
    }
}

/// Displays the trail as dot-separated decisions, or `root` when empty.
impl Display for Trail {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.decisions.is_empty() {
            write!(f, "root")
        } else {
            write!(f, "{}", self.decisions.iter().join("."))
        }
    }
}
