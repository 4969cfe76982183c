//! This module contains the small-step evaluator, the transition function of
//! the symbolic execution.
//!
//! Given a non-terminal state, [`Evaluator::step`] inspects the next pending
//! command and produces the successor branches. Program nodes are handed to
//! the target [`crate::stepper::Stepper`], while every other command kind is
//! handled here. The input state is never modified.

use log::{debug, trace, warn};

use crate::{
    constant::DEFAULT_GUARD_VIOLATION_CEILING,
    continuation::{Command, Guard, ReturnValue},
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    program::{NodeKind, NodeRef},
    reachability::DynReachabilityEngine,
    solver::Solver,
    state::ExecutionState,
    stepper::{Branch, DynStepper},
};

/// The small-step evaluator, along with the guard counters of one run.
#[derive(Debug)]
pub struct Evaluator {
    /// The target semantics for program nodes.
    stepper: DynStepper,

    /// The reachability filter, if one is configured.
    reachability: Option<DynReachabilityEngine>,

    /// The number of violated guards after which the run is aborted.
    guard_violation_ceiling: usize,

    /// The number of guards that could not hold so far.
    guard_violations: usize,

    /// The number of guards stepped so far.
    guard_evaluations: usize,

    /// The number of solver queries made for guards so far.
    solver_calls: usize,
}

impl Evaluator {
    /// Creates an evaluator over the target `stepper`.
    #[must_use]
    pub fn new(stepper: DynStepper) -> Self {
        Self {
            stepper,
            reachability: None,
            guard_violation_ceiling: DEFAULT_GUARD_VIOLATION_CEILING,
            guard_violations: 0,
            guard_evaluations: 0,
            solver_calls: 0,
        }
    }

    /// Filters tracked call sites through `engine`.
    #[must_use]
    pub fn with_reachability(mut self, engine: DynReachabilityEngine) -> Self {
        self.reachability = Some(engine);
        self
    }

    /// Sets the number of violated guards after which the run is aborted.
    #[must_use]
    pub fn with_guard_violation_ceiling(mut self, ceiling: usize) -> Self {
        self.guard_violation_ceiling = ceiling;
        self
    }

    /// Gets the reachability filter, if one is configured.
    #[must_use]
    pub fn reachability(&self) -> Option<&DynReachabilityEngine> {
        self.reachability.as_ref()
    }

    /// Gets the number of guards that could not hold so far.
    #[must_use]
    pub fn guard_violations(&self) -> usize {
        self.guard_violations
    }

    /// Gets the number of guards stepped so far.
    #[must_use]
    pub fn guard_evaluations(&self) -> usize {
        self.guard_evaluations
    }

    /// Gets the number of solver queries made for guards so far.
    #[must_use]
    pub fn solver_calls(&self) -> usize {
        self.solver_calls
    }

    /// Steps `state`, producing its successor branches. A stepper may yield no
    /// branches at all, which leaves the strategy nothing to select.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `state` is terminal, if the stepper fails (this
    /// includes [`Error::Unimplemented`], which is left for the strategy to
    /// handle), if too many guards have been violated, or if a command cannot
    /// be applied to the state.
    pub fn step(&mut self, state: &ExecutionState, solver: &mut dyn Solver) -> Result<Vec<Branch>> {
        let trail = state.trail();
        let Some(command) = state.next_command() else {
            if state.is_terminal() {
                return Err(Error::SteppedTerminalState.locate(trail));
            }

            trace!("Resuming the caller frame at trail {trail}");
            let mut next = state.clone();
            next.pop_continuation(None).locate(trail)?;
            return Ok(vec![Branch::unconstrained(next)]);
        };
        trace!("Stepping `{command}` at trail {trail}");

        let branches = match command {
            Command::Node(node) => self.step_node(state, node)?,
            Command::Trace(event) => {
                let event = event.subst(state.env()).locate(trail)?;
                let mut next = state.clone();
                next.add_trace(event);
                next.pop_body();
                vec![Branch::unconstrained(next)]
            }
            Command::Return(ReturnValue::None) => {
                let mut next = state.clone();
                next.pop_continuation(None).locate(trail)?;
                vec![Branch::unconstrained(next)]
            }
            Command::Return(ReturnValue::Symbolic(value)) => {
                let value = state.subst(value).locate(trail)?;
                let mut next = state.clone();
                next.pop_continuation(Some(value)).locate(trail)?;
                vec![Branch::unconstrained(next)]
            }
            Command::Return(ReturnValue::Node(node)) => {
                self.stepper.step_expression(state, node).locate(trail)?
            }
            Command::Exception(kind) => {
                let mut next = state.clone();
                next.handle_exception(kind).locate(trail)?;
                vec![Branch::unconstrained(next)]
            }
            Command::PropertyUpdate { name, value } => {
                let mut next = state.clone();
                next.set_property(name.clone(), value.clone());
                next.pop_body();
                vec![Branch::unconstrained(next)]
            }
            Command::Guard(guard) => vec![self.step_guard(state, guard, solver)?],
        };

        Ok(branches)
    }

    /// Steps a program node, consulting the reachability filter first if the
    /// node is a tracked call site.
    fn step_node(&self, state: &ExecutionState, node: &NodeRef) -> Result<Vec<Branch>> {
        let trail = state.trail();
        let filter = self
            .reachability
            .as_ref()
            .filter(|engine| engine.tracks(node))
            .zip(state.reachability_cursor());

        let Some((engine, cursor)) = filter else {
            return self.dispatch(state, node);
        };

        let step = engine.next(cursor, node).locate(trail)?;
        if !step.success {
            debug!("Call site {node} cannot match the tracked pattern at trail {trail}");
            return Ok(vec![Branch::infeasible(state.clone())]);
        }

        let mut branches = self.dispatch(state, node)?;
        for branch in &mut branches {
            branch.next.set_reachability_cursor(step.cursor.clone());
            if let Some(constraint) = &step.constraint {
                branch.conjoin(constraint.clone());
            }
        }

        Ok(branches)
    }

    /// Hands `node` to the stepper and marks it as visited in every
    /// successor.
    fn dispatch(&self, state: &ExecutionState, node: &NodeRef) -> Result<Vec<Branch>> {
        let trail = state.trail();
        let mut branches = match node.kind() {
            NodeKind::Statement => self.stepper.step_statement(state, node),
            NodeKind::Expression => self.stepper.step_expression(state, node),
        }
        .locate(trail)?;

        for branch in &mut branches {
            branch.next.mark_visited(node.id());
        }

        Ok(branches)
    }

    /// Steps a guard. The result is a single branch, constrained by the guard
    /// if it can hold and by `false` otherwise.
    fn step_guard(
        &mut self,
        state: &ExecutionState,
        guard: &Guard,
        solver: &mut dyn Solver,
    ) -> Result<Branch> {
        let trail = state.trail();
        self.guard_evaluations += 1;

        let condition = state.subst(&guard.condition).locate(trail)?;
        let holds = if condition.is_tainted() {
            false
        } else if let Some(literal) = condition.as_bool() {
            literal
        } else {
            let mut query = state.path_constraint().to_vec();
            query.push(condition.clone());
            self.solver_calls += 1;
            solver.check_sat(&query).is_sat()
        };

        if !holds {
            self.guard_violations += 1;
            warn!(
                "Guard `{}` cannot hold at trail {trail} ({} violations so far)",
                guard.reason, self.guard_violations
            );
            if self.guard_violations > self.guard_violation_ceiling {
                return Err(Error::GuardCeilingExceeded {
                    violations: self.guard_violations,
                    ceiling:    self.guard_violation_ceiling,
                }
                .locate(trail));
            }
            return Ok(Branch::infeasible(state.clone()));
        }

        let mut next = state.clone();
        next.pop_body();
        Ok(Branch::new(condition, next))
    }
}
