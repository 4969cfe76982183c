//! The bounded exhaustive strategy.

use log::{debug, info};
use rand::seq::SliceRandom;

use crate::{
    error::execution::Result,
    state::ExecutionState,
    strategy::{Callback, ExplorationStrategy, Explorer},
};

/// Enumerates terminal states eagerly, when the strategy is built.
///
/// Enumeration follows every branch whose own constraint is satisfiable in
/// isolation, so a recorded terminal can still have an unsatisfiable path
/// constraint. Such terminals are weeded out when they are handed over. At
/// most `linear_enumeration_bound` terminals are recorded, and running the
/// strategy hands them over in random order.
#[derive(Debug)]
pub struct LinearEnumeration {
    explorer:  Explorer,
    terminals: Vec<ExecutionState>,
}

impl LinearEnumeration {
    /// Enumerates the terminal states reachable in `explorer`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if stepping fails fatally or the watchdog fires.
    pub fn new(mut explorer: Explorer) -> Result<Self> {
        let bound = explorer.config().linear_enumeration_bound;
        let mut terminals = Vec::new();
        let mut pending = vec![explorer.initial_state()];

        while let Some(state) = pending.pop() {
            if terminals.len() >= bound {
                debug!("Reached the enumeration bound of {bound} terminals");
                break;
            }
            if state.is_terminal() {
                terminals.push(state);
                continue;
            }

            let Some(branches) = explorer.step(&state)? else {
                continue;
            };
            // Reversed so that the first branch is explored first.
            for branch in branches.into_iter().rev() {
                if explorer.is_locally_viable(&branch) {
                    pending.push(branch.next);
                }
            }
        }

        info!("Enumerated {} terminal states", terminals.len());
        Ok(Self {
            explorer,
            terminals,
        })
    }

    /// Gets the terminal states that have not been handed over yet.
    #[must_use]
    pub fn terminals(&self) -> &[ExecutionState] {
        &self.terminals
    }
}

impl ExplorationStrategy for LinearEnumeration {
    fn run(&mut self, callback: &mut Callback<'_>) -> Result<()> {
        let mut terminals = std::mem::take(&mut self.terminals);
        terminals.shuffle(self.explorer.rng());

        for state in terminals {
            self.explorer.poll_watchdog(state.trail())?;
            if self.explorer.handle_terminal(state, callback)? {
                return Ok(());
            }
        }

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
        strategy::{linear_enumeration::LinearEnumeration, Config, ExplorationStrategy, Explorer},
        target::simple::{Expr, SimpleProgram, SimpleStepper},
        watchdog::LazyWatchdog,
    };

    fn explorer(program: SimpleProgram, bound: usize) -> Explorer {
        Explorer::new(
            Rc::new(program),
            Box::new(SimpleStepper),
            Box::new(EnumerativeSolver::new()),
            Config::default().with_seed(1).with_linear_enumeration_bound(bound),
            LazyWatchdog.in_rc(),
        )
    }

    fn diamond() -> SimpleProgram {
        let mut program = SimpleProgram::new();
        let pipeline = vec![
            program.extract("x", 8),
            program.if_else(
                Expr::eq(Expr::field("x", 8), Expr::bits(0, 8)),
                vec![program.trace("zero")],
                vec![program.trace("nonzero")],
            ),
        ];
        program.set_pipeline(pipeline);
        program
    }

    #[test]
    fn emits_mutually_exclusive_tests() -> anyhow::Result<()> {
        let mut strategy = LinearEnumeration::new(explorer(diamond(), 2))?;
        assert_eq!(strategy.terminals().len(), 2);

        let mut traces = Vec::new();
        strategy.run(&mut |state| {
            traces.push(state.trace().to_vec());
            false
        })?;

        traces.sort();
        assert_eq!(
            traces,
            vec![vec!["nonzero".to_string()], vec!["zero".to_string()]]
        );
        assert!(strategy.terminals().is_empty());

        Ok(())
    }

    #[test]
    fn respects_the_enumeration_bound() -> anyhow::Result<()> {
        let strategy = LinearEnumeration::new(explorer(diamond(), 1))?;
        assert_eq!(strategy.terminals().len(), 1);

        Ok(())
    }

    #[test]
    fn skips_literally_false_branches_without_the_solver() -> anyhow::Result<()> {
        let mut program = SimpleProgram::new();
        let pipeline = vec![program.if_else(
            Expr::boolean(false),
            vec![program.trace("dead")],
            vec![program.trace("live")],
        )];
        program.set_pipeline(pipeline);

        let strategy = LinearEnumeration::new(explorer(program, 10))?;
        assert_eq!(strategy.terminals().len(), 1);
        assert_eq!(strategy.explorer().statistics().solver_calls, 0);

        Ok(())
    }
}
