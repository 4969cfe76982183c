//! This module contains the [`Stepper`] interface through which targets plug
//! their statement and expression semantics into the core, and the [`Branch`]
//! type that steps produce.

use std::fmt::Debug;

use crate::{
    coverage::CoverageSet,
    error::execution::UnlocatedResult,
    expr::{fold, ExprRef},
    program::NodeRef,
    state::ExecutionState,
};

/// A candidate successor of a step.
#[derive(Clone, Debug)]
pub struct Branch {
    /// The condition under which the branch is taken, evaluated against the
    /// environment before the step. It has already been appended to the path
    /// constraint of `next`.
    pub constraint: ExprRef,

    /// The successor state.
    pub next: ExecutionState,

    /// Nodes the branch may go on to reach, consulted by coverage-guided
    /// selection.
    pub potential: Option<CoverageSet>,
}

impl Branch {
    /// Creates a branch taken under `constraint`, appending the constraint to
    /// the path constraint of `next`.
    #[must_use]
    pub fn new(constraint: ExprRef, mut next: ExecutionState) -> Self {
        next.add_constraint(constraint.clone());
        Self {
            constraint,
            next,
            potential: None,
        }
    }

    /// Creates a branch that is always taken.
    #[must_use]
    pub fn unconstrained(next: ExecutionState) -> Self {
        Self::new(fold::tru(), next)
    }

    /// Creates a branch that can never be taken.
    #[must_use]
    pub fn infeasible(next: ExecutionState) -> Self {
        Self::new(fold::fals(), next)
    }

    /// Sets the nodes the branch may go on to reach.
    #[must_use]
    pub fn with_potential(mut self, potential: CoverageSet) -> Self {
        self.potential = Some(potential);
        self
    }

    /// Additionally requires `constraint` to hold on this branch.
    pub fn conjoin(&mut self, constraint: ExprRef) {
        self.constraint = fold::and(self.constraint.clone(), constraint.clone());
        self.next.add_constraint(constraint);
    }

    /// Gets the nodes this branch covers or may cover: the nodes visited by
    /// the successor together with its potential.
    #[must_use]
    pub fn reachable_nodes(&self) -> CoverageSet {
        let mut nodes = self.next.visited().clone();
        if let Some(potential) = &self.potential {
            nodes.extend(potential);
        }
        nodes
    }
}

/// The target-specific semantics of statements and expressions.
///
/// Implementations must treat the input state as read-only and build every
/// successor from a clone of it. The node being stepped is the command at the
/// top of the state's body; a stepper replaces or pops that command in each
/// successor.
pub trait Stepper
where
    Self: Debug,
{
    /// Steps the statement `node`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] with [`crate::error::execution::Error::Unimplemented`]
    /// if the target cannot model the statement, or any other error if the
    /// step fails.
    fn step_statement(&self, state: &ExecutionState, node: &NodeRef)
        -> UnlocatedResult<Vec<Branch>>;

    /// Steps the expression `node`.
    ///
    /// When the expression is the value of a pending return, each successor
    /// must replace that return with one carrying the evaluated value.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] with [`crate::error::execution::Error::Unimplemented`]
    /// if the target cannot model the expression, or any other error if the
    /// step fails.
    fn step_expression(
        &self,
        state: &ExecutionState,
        node: &NodeRef,
    ) -> UnlocatedResult<Vec<Branch>>;
}

/// A dynamically dispatched [`Stepper`].
pub type DynStepper = Box<dyn Stepper>;

#[cfg(test)]
mod test {
    use crate::{
        continuation::Namespace,
        expr::{fold, Sort},
        state::ExecutionState,
        stepper::Branch,
    };

    #[test]
    fn pushes_the_constraint_into_the_successor() {
        let state = ExecutionState::new(vec![], Namespace::new());
        let condition = fold::var("c", Sort::Bool);

        let branch = Branch::new(condition.clone(), state.clone());
        assert_eq!(branch.next.path_constraint(), &[condition.clone()]);
        assert!(state.path_constraint().is_empty());

        let mut branch = Branch::unconstrained(state);
        assert!(branch.next.path_constraint().is_empty());
        branch.conjoin(condition.clone());
        assert_eq!(branch.constraint, condition);
        assert_eq!(branch.next.path_constraint(), &[condition]);
    }
}
