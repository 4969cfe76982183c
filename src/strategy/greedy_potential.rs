//! The coverage-guided strategy.

use log::{debug, info};
use rand::Rng;

use crate::{
    error::execution::Result,
    state::ExecutionState,
    stepper::Branch,
    strategy::{Callback, ExplorationStrategy, Explorer, Pick},
};

/// Explores by preferring branches that may reach nodes no accepted test has
/// covered yet.
///
/// The branches that were not taken are kept as sets in a flat reservoir.
/// When resuming from it, a set is picked at random, except that every
/// `coverage_scan_interval`-th selection scans the reservoir for a set with
/// an uncovered node in reach. After `random_fallback_threshold` selections
/// in a row without an accepted test, every choice becomes purely random
/// until a test is accepted again.
#[derive(Debug)]
pub struct GreedyPotential {
    explorer:     Explorer,
    reservoir:    Vec<Vec<Branch>>,
    selections:   usize,
    without_test: usize,
}

impl GreedyPotential {
    #[must_use]
    pub fn new(explorer: Explorer) -> Self {
        Self {
            explorer,
            reservoir: Vec::new(),
            selections: 0,
            without_test: 0,
        }
    }

    fn is_falling_back(&self) -> bool {
        self.without_test >= self.explorer.config().random_fallback_threshold
    }

    fn pick(&self) -> Pick {
        if self.is_falling_back() {
            Pick::Random
        } else {
            Pick::Uncovered
        }
    }

    /// Selects from `branches`, keeping the rest in the reservoir.
    fn select(&mut self, mut branches: Vec<Branch>) -> Option<ExecutionState> {
        self.without_test += 1;
        if self.without_test == self.explorer.config().random_fallback_threshold {
            info!(
                "No test after {} selections, falling back to random selection",
                self.without_test
            );
        }

        let guarantee = branches.len() > 1;
        let pick = self.pick();
        let chosen = self.explorer.choose_branch(&mut branches, guarantee, pick);
        if !branches.is_empty() {
            self.reservoir.push(branches);
        }
        chosen
    }

    /// Picks the reservoir set to resume from.
    fn reservoir_index(&mut self) -> usize {
        self.selections += 1;
        let interval = self.explorer.config().coverage_scan_interval.max(1);

        if !self.is_falling_back() && self.selections % interval == 0 {
            let coverage = self.explorer.coverage();
            let found = self.reservoir.iter().position(|branches| {
                branches
                    .iter()
                    .any(|branch| coverage.has_uncovered(&branch.reachable_nodes()))
            });
            if let Some(index) = found {
                debug!("Coverage scan resumes from reservoir set {index}");
                self.selections = 0;
                return index;
            }
        }

        self.explorer.rng().gen_range(0..self.reservoir.len())
    }

    fn backtrack(&mut self) -> Option<ExecutionState> {
        while !self.reservoir.is_empty() {
            let index = self.reservoir_index();
            let branches = self.reservoir.swap_remove(index);
            self.explorer.record_backtrack();
            if let Some(state) = self.select(branches) {
                return Some(state);
            }
        }

        None
    }
}

impl ExplorationStrategy for GreedyPotential {
    fn run(&mut self, callback: &mut Callback<'_>) -> Result<()> {
        let mut current = Some(self.explorer.initial_state());

        while let Some(state) = current.take() {
            if state.is_terminal() {
                let accepted = self.explorer.statistics().tests;
                if self.explorer.handle_terminal(state, callback)? {
                    return Ok(());
                }
                if self.explorer.statistics().tests > accepted {
                    self.without_test = 0;
                }
                current = self.backtrack();
                continue;
            }

            let Some(branches) = self.explorer.step(&state)? else {
                current = self.backtrack();
                continue;
            };

            current = if branches.len() > 1 {
                self.select(branches)
            } else {
                let mut branches = branches;
                self.explorer.choose_branch(&mut branches, false, Pick::Random)
            };
            if current.is_none() {
                current = self.backtrack();
            }
        }

        debug!("Greedy potential reservoir exhausted");
        Ok(())
    }

    fn explorer(&self) -> &Explorer {
        &self.explorer
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::{
        solver::EnumerativeSolver,
        strategy::{greedy_potential::GreedyPotential, Config, ExplorationStrategy, Explorer},
        target::simple::{Expr, SimpleProgram, SimpleStepper},
        watchdog::LazyWatchdog,
    };

    fn program() -> SimpleProgram {
        let mut program = SimpleProgram::new();
        let mut pipeline = vec![program.extract("a", 8), program.extract("b", 8)];
        for field in ["a", "b"] {
            pipeline.push(program.if_else(
                Expr::ult(Expr::field(field, 8), Expr::bits(16, 8)),
                vec![program.trace(format!("{field} low"))],
                vec![program.trace(format!("{field} high"))],
            ));
        }
        program.set_pipeline(pipeline);
        program
    }

    fn explorer(config: Config) -> Explorer {
        Explorer::new(
            Rc::new(program()),
            Box::new(SimpleStepper),
            Box::new(EnumerativeSolver::new()),
            config,
            LazyWatchdog.in_rc(),
        )
    }

    #[test]
    fn reaches_full_coverage_before_exhaustion() -> anyhow::Result<()> {
        let config = Config::default().with_seed(3).with_coverage_scan_interval(1);
        let mut strategy = GreedyPotential::new(explorer(config));
        let mut tests = 0;
        strategy.run(&mut |_| {
            tests += 1;
            tests == 3
        })?;

        assert_eq!(tests, 3);
        assert_eq!(strategy.explorer().coverage().ratio(), 1.0);

        Ok(())
    }

    #[test]
    fn exhausts_the_reservoir_with_random_fallback() -> anyhow::Result<()> {
        let config = Config::default()
            .with_seed(5)
            .with_random_fallback_threshold(0)
            .with_coverage_scan_interval(1);
        let mut strategy = GreedyPotential::new(explorer(config));
        let mut traces = Vec::new();
        strategy.run(&mut |state| {
            traces.push(state.trace().to_vec());
            false
        })?;

        traces.sort();
        traces.dedup();
        assert_eq!(traces.len(), 4);

        Ok(())
    }
}
