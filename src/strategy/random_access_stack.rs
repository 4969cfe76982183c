//! The depth-first strategy that backtracks a random number of levels.

use log::debug;
use rand::Rng;

use crate::{
    error::execution::Result,
    state::ExecutionState,
    stepper::Branch,
    strategy::{Callback, ExplorationStrategy, Explorer, Pick},
};

/// Explores like [`crate::strategy::IncrementalStack`], but on backtracking
/// pops a random number of levels from the stack at once.
///
/// The resumed branch is selected from the deepest of the popped levels, the
/// one closest to the root. The remaining popped branches go to a buffer
/// that is drained before the stack is consulted again, so no branch is
/// ever lost.
#[derive(Debug)]
pub struct RandomAccessStack {
    explorer: Explorer,
    stack:    Vec<Vec<Branch>>,
    buffer:   Vec<Branch>,
}

impl RandomAccessStack {
    #[must_use]
    pub fn new(explorer: Explorer) -> Self {
        let stack = Vec::new();
        let buffer = Vec::new();
        Self {
            explorer,
            stack,
            buffer,
        }
    }

    fn backtrack(&mut self) -> Option<ExecutionState> {
        loop {
            if !self.buffer.is_empty() {
                self.explorer.record_backtrack();
                let chosen = self.explorer.choose_branch(&mut self.buffer, true, Pick::Random);
                if chosen.is_some() {
                    return chosen;
                }
                continue;
            }

            if self.stack.is_empty() {
                return None;
            }

            let depth = self.stack.len();
            let levels = self.explorer.rng().gen_range(1..=depth);
            let mut popped = self.stack.split_off(depth - levels);
            self.explorer.record_backtrack();
            debug!("Backtracking {levels} of {depth} levels");

            let mut lowest = popped.remove(0);
            let chosen = self.explorer.choose_branch(&mut lowest, true, Pick::Random);
            self.buffer.extend(lowest);
            self.buffer.extend(popped.into_iter().flatten());
            if chosen.is_some() {
                return chosen;
            }
        }
    }
}

impl ExplorationStrategy for RandomAccessStack {
    fn run(&mut self, callback: &mut Callback<'_>) -> Result<()> {
        let mut current = Some(self.explorer.initial_state());

        while let Some(state) = current.take() {
            if state.is_terminal() {
                if self.explorer.handle_terminal(state, callback)? {
                    return Ok(());
                }
                current = self.backtrack();
                continue;
            }

            let Some(mut branches) = self.explorer.step(&state)? else {
                current = self.backtrack();
                continue;
            };

            let guarantee = branches.len() > 1;
            current = self.explorer.choose_branch(&mut branches, guarantee, Pick::Random);
            if !branches.is_empty() {
                self.stack.push(branches);
            }
            if current.is_none() {
                current = self.backtrack();
            }
        }

        debug!("Random access stack exhausted");
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
        strategy::{random_access_stack::RandomAccessStack, Config, ExplorationStrategy, Explorer},
        target::simple::{Expr, SimpleProgram, SimpleStepper},
        watchdog::LazyWatchdog,
    };

    #[test]
    fn finds_every_path_of_nested_branches() -> anyhow::Result<()> {
        let mut program = SimpleProgram::new();
        let inner = |program: &SimpleProgram, name: &str| {
            program.if_else(
                Expr::eq(Expr::field(name, 8), Expr::bits(1, 8)),
                vec![program.trace(format!("{name} set"))],
                vec![program.trace(format!("{name} clear"))],
            )
        };
        let pipeline = vec![
            program.extract("a", 8),
            program.extract("b", 8),
            inner(&program, "a"),
            inner(&program, "b"),
        ];
        program.set_pipeline(pipeline);

        for seed in 0..4 {
            let explorer = Explorer::new(
                Rc::new(program.clone()),
                Box::new(SimpleStepper),
                Box::new(EnumerativeSolver::new()),
                Config::default().with_seed(seed),
                LazyWatchdog.in_rc(),
            );
            let mut strategy = RandomAccessStack::new(explorer);
            let mut traces = Vec::new();
            strategy.run(&mut |state| {
                traces.push(state.trace().to_vec());
                false
            })?;

            traces.sort();
            traces.dedup();
            assert_eq!(traces.len(), 4);
            assert_eq!(strategy.explorer().coverage().ratio(), 1.0);
        }

        Ok(())
    }
}
