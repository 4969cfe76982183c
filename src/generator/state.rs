//! This module contains the state tracking functionality for the generator.

use std::fmt::Debug;

use crate::{
    generator::test_case::Report,
    reachability::DynReachabilityEngine,
    solver::DynSolver,
    stepper::DynStepper,
    strategy::{Config, DynStrategy},
    watchdog::DynWatchdog,
};

/// A marker trait that says that the type implementing it is a generator
/// state.
///
/// Generator states can be transitioned between as part of the
/// [`crate::generator::Generator`] state machine, and are intended to enforce
/// that correct state transitions take place.
pub trait State
where
    Self: Debug + Sized,
{
}

/// The initial state for the generator.
#[derive(Debug)]
pub struct HasProgram {
    /// The semantics of the program's nodes.
    pub stepper: DynStepper,

    /// The solver that decides path feasibility.
    pub solver: DynSolver,

    /// The configuration of the run.
    pub config: Config,

    /// The reachability filter, if any.
    pub reachability: Option<DynReachabilityEngine>,

    /// The watchdog that is monitoring the progress of the generator.
    pub watchdog: DynWatchdog,
}
impl State for HasProgram {}

/// The generator has built its exploration strategy.
#[derive(Debug)]
pub struct StrategyReady {
    /// The strategy, ready to run.
    pub strategy: DynStrategy,

    /// The number of tests after which exploration stops, or zero.
    pub max_tests: usize,
}
impl State for StrategyReady {}

/// The generator has finished exploring.
#[derive(Debug)]
pub struct ExplorationComplete {
    /// The tests and summary of the run.
    pub report: Report,
}
impl State for ExplorationComplete {}
