//! This module contains the contract through which the core talks to a
//! constraint solver, along with a bundled reference implementation.
//!
//! The core never relies on solver-side incrementality: every query carries
//! the full set of constraints it is about, and a [`Model`] may only be
//! requested immediately after a [`SatResult::Sat`] answer.

pub mod enumerative;
pub mod model;

use std::fmt::{Debug, Display, Formatter};

pub use enumerative::EnumerativeSolver;
pub use model::Model;

use crate::{error::execution::UnlocatedResult, expr::ExprRef};

/// The answer to a satisfiability query.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SatResult {
    /// The conjunction of the constraints has a model.
    Sat,

    /// The conjunction of the constraints has no model.
    Unsat,

    /// The solver gave up, usually because the query timed out.
    ///
    /// Every call site in the core treats this exactly like
    /// [`SatResult::Unsat`], which may discard feasible paths on a slow
    /// solver.
    Unknown,
}

impl SatResult {
    /// Checks if the result is [`SatResult::Sat`].
    #[must_use]
    pub fn is_sat(&self) -> bool {
        matches!(self, Self::Sat)
    }
}

impl Display for SatResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sat => write!(f, "sat"),
            Self::Unsat => write!(f, "unsat"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A dynamically dispatched [`Solver`].
pub type DynSolver = Box<dyn Solver>;

/// The interface to a constraint solver.
///
/// The solver is the only resource shared across a whole run. It is used in
/// strict request/response fashion from the exploration thread.
pub trait Solver
where
    Self: Debug,
{
    /// Checks whether the conjunction of `constraints` is satisfiable.
    fn check_sat(&mut self, constraints: &[ExprRef]) -> SatResult;

    /// Gets the assignment found by the most recent satisfiable check.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the most recent check was not satisfiable.
    fn model(&self) -> UnlocatedResult<Model>;

    /// Seeds any randomness the solver uses.
    fn seed(&mut self, seed: u64);

    /// Sets the timeout for each subsequent query.
    fn set_timeout(&mut self, timeout_ms: u64);
}
