//! The strategy that replays a recorded trail.

use log::{debug, warn};

use crate::{
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    state::trail::Trail,
    strategy::{Callback, ExplorationStrategy, Explorer},
};

/// Replays the branch decisions of a trail, for example one located on an
/// error or recorded in a test, to reproduce a single path.
///
/// Whenever a step yields more than one branch, the branch whose 1-based
/// identifier is the next decision of the trail is taken, without consulting
/// the solver. The strategy produces at most one test.
#[derive(Debug)]
pub struct SelectedBranches {
    explorer: Explorer,
    trail:    Trail,
}

impl SelectedBranches {
    #[must_use]
    pub fn new(explorer: Explorer, trail: Trail) -> Self {
        Self { explorer, trail }
    }

    /// Gets the trail being replayed.
    #[must_use]
    pub fn trail(&self) -> &Trail {
        &self.trail
    }
}

impl ExplorationStrategy for SelectedBranches {
    fn run(&mut self, callback: &mut Callback<'_>) -> Result<()> {
        let mut decisions = self.trail.decisions().iter().copied();
        let mut state = self.explorer.initial_state();

        while !state.is_terminal() {
            let Some(mut branches) = self.explorer.step(&state)? else {
                return Ok(());
            };

            let branch = if branches.len() > 1 {
                let id = decisions
                    .next()
                    .ok_or_else(|| Error::ReplayTrailExhausted.locate(state.trail()))?;
                let available = branches.len();
                let index = usize::try_from(id)
                    .ok()
                    .and_then(|id| id.checked_sub(1))
                    .filter(|index| *index < available)
                    .ok_or_else(|| Error::NoSuchBranch { id, available }.locate(state.trail()))?;
                branches.swap_remove(index)
            } else {
                branches.pop().ok_or_else(|| Error::InvalidBranchSet.locate(state.trail()))?
            };

            if branch.constraint.as_bool() == Some(false) {
                warn!("The replayed path is infeasible at trail {}", branch.next.trail());
                return Ok(());
            }
            state = branch.next;
        }

        if decisions.next().is_some() {
            debug!("Replay reached a terminal state before the end of trail {}", self.trail);
        }
        self.explorer.handle_terminal(state, callback)?;

        Ok(())
    }

    fn explorer(&self) -> &Explorer {
        &self.explorer
    }
}
