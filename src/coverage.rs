//! This module contains coverage tracking over program nodes.

use std::collections::{btree_set, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::program::NodeId;

/// A set of program nodes.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CoverageSet {
    nodes: BTreeSet<NodeId>,
}

impl CoverageSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node` to the set, returning whether it was new.
    pub fn insert(&mut self, node: NodeId) -> bool {
        self.nodes.insert(node)
    }

    /// Checks if `node` is in the set.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Gets the number of nodes in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Checks if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over the nodes in ascending order.
    pub fn iter(&self) -> btree_set::Iter<'_, NodeId> {
        self.nodes.iter()
    }

    /// Adds every node of `other` to the set.
    pub fn extend(&mut self, other: &Self) {
        self.nodes.extend(other.nodes.iter().copied());
    }
}

impl FromIterator<NodeId> for CoverageSet {
    fn from_iter<T: IntoIterator<Item = NodeId>>(iter: T) -> Self {
        let nodes = iter.into_iter().collect();
        Self { nodes }
    }
}

impl<'a> IntoIterator for &'a CoverageSet {
    type IntoIter = btree_set::Iter<'a, NodeId>;
    type Item = &'a NodeId;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The coverage accumulated over one run.
///
/// Only the nodes of accepted paths are ever added, and nodes outside the
/// coverable set are ignored, so the covered set never shrinks and never
/// exceeds the coverable one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CoverageTracker {
    coverable: CoverageSet,
    covered:   CoverageSet,
}

impl CoverageTracker {
    /// Creates a tracker over the `coverable` nodes of a program.
    #[must_use]
    pub fn new(coverable: CoverageSet) -> Self {
        let covered = CoverageSet::new();
        Self { coverable, covered }
    }

    /// Records the nodes `visited` on an accepted path, returning the number
    /// of nodes that were newly covered.
    pub fn update(&mut self, visited: &CoverageSet) -> usize {
        visited
            .iter()
            .filter(|node| self.coverable.contains(**node))
            .filter(|node| self.covered.insert(**node))
            .count()
    }

    /// Checks if `nodes` contains a coverable node that is not covered yet.
    #[must_use]
    pub fn has_uncovered(&self, nodes: &CoverageSet) -> bool {
        nodes
            .iter()
            .any(|node| self.coverable.contains(*node) && !self.covered.contains(*node))
    }

    /// Gets the covered nodes.
    #[must_use]
    pub fn covered(&self) -> &CoverageSet {
        &self.covered
    }

    /// Gets the coverable nodes.
    #[must_use]
    pub fn coverable(&self) -> &CoverageSet {
        &self.coverable
    }

    /// Gets the fraction of coverable nodes that are covered, or one when
    /// nothing is coverable.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Node counts are far below 2^52
    pub fn ratio(&self) -> f64 {
        if self.coverable.is_empty() {
            1.0
        } else {
            self.covered.len() as f64 / self.coverable.len() as f64
        }
    }
}
