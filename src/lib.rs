//! This library implements the symbolic execution core of a test generator
//! for packet-processing programs. Given a program, it explores the program's
//! execution paths and turns every feasible path into a concrete test: an
//! input packet, the output packet the program is expected to produce, and
//! whatever control-plane configuration the path relies on.
//!
//! The core does not know any particular packet-processing language. A
//! target plugs in through the [`program::ProgramInfo`] and
//! [`stepper::Stepper`] interfaces, and the [`target::simple`] target that
//! ships with the crate demonstrates both.
//!
//! # How it Works
//!
//! From a very high level, test generation proceeds as follows:
//!
//! 1. An initial [`state::ExecutionState`] is built from the program's
//!    pipeline sequence. Its continuation is a body of pending
//!    [`continuation::Command`]s plus a stack of suspended frames.
//! 2. An [`strategy::ExplorationStrategy`] repeatedly hands a state to the
//!    [`evaluator::Evaluator`], which steps the next pending command and
//!    produces the successor [`stepper::Branch`]es, each carrying a
//!    constraint that is conjoined onto its path constraint.
//! 3. The strategy picks a successor to continue with, consulting the
//!    [`solver::Solver`] where feasibility must be guaranteed, and keeps the
//!    others for backtracking.
//! 4. Every terminal state whose path constraint is satisfiable becomes a
//!    [`final_state::FinalState`] with a complete concrete model, which the
//!    [`generator::Generator`] renders into a [`generator::test_case::TestCase`].
//!
//! # Basic Usage
//!
//! ```
//! use std::rc::Rc;
//!
//! use packet_testgen as ptg;
//! use packet_testgen::{
//!     solver::EnumerativeSolver,
//!     strategy::Config,
//!     target::simple::{Expr, SimpleProgram, SimpleStepper},
//!     watchdog::LazyWatchdog,
//! };
//!
//! let mut program = SimpleProgram::new();
//! let pipeline = vec![
//!     program.extract("ttl", 8),
//!     program.if_else(
//!         Expr::eq(Expr::field("ttl", 8), Expr::bits(0, 8)),
//!         vec![program.reject()],
//!         vec![program.emit(Expr::field("ttl", 8))],
//!     ),
//! ];
//! program.set_pipeline(pipeline);
//!
//! let report = ptg::new(
//!     Rc::new(program),
//!     Box::new(SimpleStepper),
//!     Box::new(EnumerativeSolver::new()),
//!     Config::default().with_seed(0),
//!     LazyWatchdog.in_rc(),
//! )
//! .generate()
//! .unwrap();
//!
//! assert_eq!(report.tests.len(), 2);
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod constant;
pub mod continuation;
pub mod coverage;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod final_state;
pub mod generator;
pub mod program;
pub mod reachability;
pub mod solver;
pub mod state;
pub mod stepper;
pub mod strategy;
pub mod target;
pub mod watchdog;

// Re-exports to provide the library interface.
pub use generator::{new, test_case::Report};
