//! The exploration core shared by every strategy: stepping with
//! unimplemented-construct handling, branch selection with viability checks,
//! terminal-state handling and the per-run counters.

use std::rc::Rc;

use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    coverage::CoverageTracker,
    error::{
        container::Locatable,
        execution::{Error, Errors, Result},
    },
    evaluator::Evaluator,
    expr::ExprRef,
    final_state::FinalState,
    program::ProgramInfo,
    reachability::DynReachabilityEngine,
    solver::{DynSolver, SatResult},
    state::{trail::Trail, ExecutionState},
    stepper::{Branch, DynStepper},
    strategy::{Callback, Config},
    watchdog::DynWatchdog,
};

/// The counters of one run.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Statistics {
    /// The number of evaluator steps.
    pub steps: usize,

    /// The number of solver queries, including those made for guards.
    pub solver_calls: usize,

    /// The number of guards stepped.
    pub guard_evaluations: usize,

    /// The number of guards that could not hold.
    pub guard_violations: usize,

    /// The number of times a strategy resumed from its reservoir.
    pub backtracks: usize,

    /// The number of accepted terminal states.
    pub tests: usize,
}

/// How a branch is picked from a branch set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Pick {
    /// Uniformly at random.
    Random,

    /// Uniformly at random among the branches that reach an uncovered node,
    /// or among all branches if none does.
    Uncovered,
}

/// The per-run exploration context.
///
/// The guard counters, the coverage and the random generator live here
/// rather than in global state, so that runs are independent of one another.
#[derive(Debug)]
pub struct Explorer {
    evaluator:  Evaluator,
    solver:     DynSolver,
    program:    Rc<dyn ProgramInfo>,
    coverage:   CoverageTracker,
    rng:        StdRng,
    watchdog:   DynWatchdog,
    config:     Config,
    warnings:   Errors,
    statistics: Statistics,
    iterations: usize,
}

impl Explorer {
    /// Creates the exploration context for `program`.
    ///
    /// The solver is seeded and given its timeout from `config`.
    #[must_use]
    pub fn new(
        program: Rc<dyn ProgramInfo>,
        stepper: DynStepper,
        mut solver: DynSolver,
        config: Config,
        watchdog: DynWatchdog,
    ) -> Self {
        let evaluator =
            Evaluator::new(stepper).with_guard_violation_ceiling(config.guard_violation_ceiling);
        solver.set_timeout(config.solver_timeout_ms);
        let rng = match config.seed {
            Some(seed) => {
                solver.seed(seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };
        let coverage = CoverageTracker::new(program.coverable_nodes());

        Self {
            evaluator,
            solver,
            program,
            coverage,
            rng,
            watchdog,
            config,
            warnings: Errors::new(),
            statistics: Statistics::default(),
            iterations: 0,
        }
    }

    /// Filters tracked call sites through `engine`.
    #[must_use]
    pub fn with_reachability(mut self, engine: DynReachabilityEngine) -> Self {
        self.evaluator = self.evaluator.with_reachability(engine);
        self
    }

    /// Builds the state every execution starts from.
    #[must_use]
    pub fn initial_state(&self) -> ExecutionState {
        let mut state = ExecutionState::new(
            self.program.pipeline_sequence(),
            self.program.initial_namespace(),
        );
        if let Some(engine) = self.evaluator.reachability() {
            state.set_reachability_cursor(engine.initial_cursor());
        }
        state
    }

    /// Steps `state`, numbering the successors in the trail when there is
    /// more than one.
    ///
    /// Returns [`None`] when the path hit an unimplemented construct and the
    /// run is not strict. The condition is logged and recorded as a warning,
    /// and the caller backtracks as it would for an unviable path.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the watchdog fired or stepping failed fatally.
    pub fn step(&mut self, state: &ExecutionState) -> Result<Option<Vec<Branch>>> {
        self.poll_watchdog(state.trail())?;
        self.statistics.steps += 1;

        match self.evaluator.step(state, self.solver.as_mut()) {
            Ok(mut branches) => {
                if branches.len() > 1 {
                    for (id, branch) in (1u64..).zip(branches.iter_mut()) {
                        branch.next.push_decision(id);
                    }
                }
                Ok(Some(branches))
            }
            Err(error) if error.payload.is_unimplemented() && !self.config.strict => {
                warn!("{error}; abandoning the path");
                self.warnings.add(error);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Removes branches from `branches` according to `pick` until one is
    /// viable, returning its successor.
    ///
    /// A literal `false` constraint is discarded and a literal `true` one
    /// accepted without consulting the solver. Any other constraint is only
    /// checked when `guarantee` is set, in which case the successor's whole
    /// path constraint must be satisfiable. Unknown counts as unsatisfiable.
    pub fn choose_branch(
        &mut self,
        branches: &mut Vec<Branch>,
        guarantee: bool,
        pick: Pick,
    ) -> Option<ExecutionState> {
        while !branches.is_empty() {
            let index = self.pick_index(branches, pick);
            let branch = branches.remove(index);

            match branch.constraint.as_bool() {
                Some(false) => {
                    debug!("Discarding infeasible branch at trail {}", branch.next.trail());
                }
                Some(true) => return Some(branch.next),
                None if !guarantee => return Some(branch.next),
                None => {
                    if self.check(branch.next.path_constraint()).is_sat() {
                        return Some(branch.next);
                    }
                    debug!("Discarding unviable branch at trail {}", branch.next.trail());
                }
            }
        }

        None
    }

    /// Checks whether the constraint of `branch`, on its own, can hold.
    pub fn is_locally_viable(&mut self, branch: &Branch) -> bool {
        match branch.constraint.as_bool() {
            Some(literal) => literal,
            None => self.check(&[branch.constraint.clone()]).is_sat(),
        }
    }

    /// Hands the terminal `state` to `callback` if its path constraint is
    /// satisfiable, returning whether the callback asked to stop.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the final state cannot be built.
    pub fn handle_terminal(
        &mut self,
        state: ExecutionState,
        callback: &mut Callback<'_>,
    ) -> Result<bool> {
        let trail = state.trail().clone();
        let answer = self.check(state.path_constraint());
        if answer != SatResult::Sat {
            let error = Error::UnviableTerminal {
                answer: answer.to_string(),
            };
            self.warn(&trail, error);
            return Ok(false);
        }

        let final_state =
            FinalState::new(self.solver.as_ref(), state, self.program.as_ref()).locate(&trail)?;
        let newly_covered = self.coverage.update(final_state.state().visited());
        self.statistics.tests += 1;
        info!(
            "Accepted test {} at trail {trail}, covering {newly_covered} new nodes",
            self.statistics.tests
        );

        Ok(callback(&final_state))
    }

    /// Polls the watchdog if it is due.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the watchdog asks to stop.
    pub fn poll_watchdog(&mut self, trail: &Trail) -> Result<()> {
        let due = self.iterations % self.watchdog.poll_every().max(1) == 0;
        self.iterations += 1;
        if due && self.watchdog.should_stop() {
            return Err(Error::StoppedByWatchdog.locate(trail));
        }

        Ok(())
    }

    /// Records that the strategy resumed from its reservoir.
    pub fn record_backtrack(&mut self) {
        self.statistics.backtracks += 1;
    }

    /// Gets the random generator of the run.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Gets the coverage accumulated so far.
    #[must_use]
    pub fn coverage(&self) -> &CoverageTracker {
        &self.coverage
    }

    /// Gets the configuration of the run.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gets the recoverable conditions encountered so far.
    #[must_use]
    pub fn warnings(&self) -> &Errors {
        &self.warnings
    }

    /// Records a recoverable condition.
    pub fn warn(&mut self, trail: &Trail, error: Error) {
        warn!("[trail {trail}]: {error}");
        self.warnings.add_located(trail, error);
    }

    /// Gets the counters of the run so far.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        Statistics {
            solver_calls: self.statistics.solver_calls + self.evaluator.solver_calls(),
            guard_evaluations: self.evaluator.guard_evaluations(),
            guard_violations: self.evaluator.guard_violations(),
            ..self.statistics
        }
    }

    /// Asks the solver about `constraints`.
    fn check(&mut self, constraints: &[ExprRef]) -> SatResult {
        self.statistics.solver_calls += 1;
        self.solver.check_sat(constraints)
    }

    fn pick_index(&mut self, branches: &[Branch], pick: Pick) -> usize {
        if pick == Pick::Uncovered {
            let uncovered: Vec<usize> = branches
                .iter()
                .enumerate()
                .filter(|(_, branch)| self.coverage.has_uncovered(&branch.reachable_nodes()))
                .map(|(index, _)| index)
                .collect();
            if !uncovered.is_empty() {
                return uncovered[self.rng.gen_range(0..uncovered.len())];
            }
        }

        self.rng.gen_range(0..branches.len())
    }
}
