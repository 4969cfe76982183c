//! The depth-first strategy with a stack of pending branch sets.

use log::debug;

use crate::{
    error::execution::Result,
    state::ExecutionState,
    stepper::Branch,
    strategy::{Callback, ExplorationStrategy, Explorer, Pick},
};

/// Explores depth-first, keeping the branches that were not taken at each
/// step as one entry on a stack.
///
/// When a step yields more than one branch, the chosen branch is guaranteed
/// to be viable. Backtracking always resumes from the most recent set.
#[derive(Debug)]
pub struct IncrementalStack {
    explorer: Explorer,
    stack:    Vec<Vec<Branch>>,
}

impl IncrementalStack {
    #[must_use]
    pub fn new(explorer: Explorer) -> Self {
        let stack = Vec::new();
        Self { explorer, stack }
    }

    /// Resumes from the top of the stack, popping sets until one yields a
    /// viable branch.
    fn backtrack(&mut self) -> Option<ExecutionState> {
        while let Some(mut branches) = self.stack.pop() {
            self.explorer.record_backtrack();
            if let Some(state) = self.explorer.choose_branch(&mut branches, true, Pick::Random) {
                if !branches.is_empty() {
                    self.stack.push(branches);
                }
                return Some(state);
            }
        }

        None
    }
}

impl ExplorationStrategy for IncrementalStack {
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

        debug!("Incremental stack exhausted");
        Ok(())
    }

    fn explorer(&self) -> &Explorer {
        &self.explorer
    }
}
