//! This module contains the type definitions necessary to support external
//! cancellation of a test generation run.
//!
//! # Cooperative Monitoring
//!
//! Exploration is a single-threaded loop, so a watchdog cannot interrupt it.
//! Instead every strategy polls its watchdog every [`Watchdog::poll_every`]
//! iterations and aborts with
//! [`crate::error::execution::Error::StoppedByWatchdog`] when asked to. A
//! long-running solver query or stepper call is never interrupted.

use std::{
    cell::Cell,
    fmt::Debug,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::constant::DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS;

/// A dynamically dispatched [`Watchdog`] instance.
pub type DynWatchdog = Rc<dyn Watchdog>;

/// The interface to an object that can be polled to see if exploration needs
/// to stop.
pub trait Watchdog
where
    Self: Debug,
{
    /// Checks if the strategy should halt exploration and return an error.
    #[must_use]
    fn should_stop(&self) -> bool;

    /// Gets the number of loop iterations the strategy should wait before
    /// polling the watchdog.
    #[must_use]
    fn poll_every(&self) -> usize;
}

/// An implementation of the [`Watchdog`] trait that never stops exploration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LazyWatchdog;

impl LazyWatchdog {
    /// Wraps `self` into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> DynWatchdog {
        Rc::new(self)
    }
}

impl Watchdog for LazyWatchdog {
    fn should_stop(&self) -> bool {
        false
    }

    fn poll_every(&self) -> usize {
        // Large enough that it is effectively never consulted.
        1_000_000_000_000
    }
}

/// A watchdog that stops exploration based on a flag in the form of an atomic
/// boolean, usually flipped from another thread or a signal handler.
///
/// By default, it requests polling every
/// [`DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS`]. This is configurable by calling
/// [`Self::polling_every`].
#[derive(Clone, Debug)]
pub struct FlagWatchdog {
    /// The flag that should be set externally to stop exploration.
    flag: Arc<AtomicBool>,

    /// The number of loop iterations to wait between polls.
    poll_loop_iterations: usize,
}

impl FlagWatchdog {
    /// Constructs a new `FlagWatchdog` wrapping the provided `flag`.
    #[must_use]
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        let poll_loop_iterations = DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS;
        Self {
            flag,
            poll_loop_iterations,
        }
    }

    /// Specifies the number of loop iterations that the strategy should wait
    /// before polling the watchdog for status.
    #[must_use]
    pub fn polling_every(mut self, iterations: usize) -> Self {
        self.poll_loop_iterations = iterations.max(1);
        self
    }

    /// Wraps the watchdog into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> DynWatchdog {
        Rc::new(self)
    }
}

impl Watchdog for FlagWatchdog {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn poll_every(&self) -> usize {
        self.poll_loop_iterations
    }
}

/// A watchdog that bounds the total number of exploration iterations.
///
/// Every poll accounts for [`Watchdog::poll_every`] iterations, so the bound
/// is enforced to within one polling interval.
#[derive(Clone, Debug)]
pub struct StepBudgetWatchdog {
    /// The number of iterations after which exploration stops.
    budget: usize,

    /// The number of iterations accounted for so far.
    consumed: Cell<usize>,

    /// The number of loop iterations to wait between polls.
    poll_loop_iterations: usize,
}

impl StepBudgetWatchdog {
    /// Constructs a watchdog that stops exploration after `budget` iterations,
    /// polled every iteration.
    #[must_use]
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            consumed: Cell::new(0),
            poll_loop_iterations: 1,
        }
    }

    /// Specifies how many iterations pass between polls.
    #[must_use]
    pub fn polling_every(mut self, iterations: usize) -> Self {
        self.poll_loop_iterations = iterations.max(1);
        self
    }

    /// Gets the number of iterations that have been accounted for.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.consumed.get()
    }

    /// Wraps the watchdog into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> DynWatchdog {
        Rc::new(self)
    }
}

impl Watchdog for StepBudgetWatchdog {
    fn should_stop(&self) -> bool {
        let consumed = self.consumed.get().saturating_add(self.poll_loop_iterations);
        self.consumed.set(consumed);
        consumed > self.budget
    }

    fn poll_every(&self) -> usize {
        self.poll_loop_iterations
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use crate::watchdog::{FlagWatchdog, LazyWatchdog, StepBudgetWatchdog, Watchdog};

    #[test]
    fn lazy_watchdog_never_stops() {
        assert!(!LazyWatchdog.should_stop());
    }

    #[test]
    fn flag_watchdog_follows_its_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let watchdog = FlagWatchdog::new(flag.clone()).polling_every(0);
        assert_eq!(watchdog.poll_every(), 1);
        assert!(!watchdog.should_stop());

        flag.store(true, Ordering::Relaxed);
        assert!(watchdog.should_stop());
    }

    #[test]
    fn step_budget_watchdog_stops_after_budget() {
        let watchdog = StepBudgetWatchdog::new(3);
        assert!(!watchdog.should_stop());
        assert!(!watchdog.should_stop());
        assert!(!watchdog.should_stop());
        assert!(watchdog.should_stop());
        assert_eq!(watchdog.consumed(), 4);
    }
}
