//! This module contains the exploration strategies, the algorithms that drive
//! the evaluator through the state space and hand terminal states to a test
//! emission callback.
//!
//! # Shared Template
//!
//! Every strategy repeatedly steps a current state through the shared
//! [`Explorer`], selects one successor, and keeps the others in a
//! strategy-specific reservoir for backtracking. The strategies differ only in
//! the shape of that reservoir and in their selection policy:
//!
//! - [`IncrementalStack`]: depth-first with a stack of branch sets.
//! - [`RandomAccessStack`]: depth-first, backtracking a random number of
//!   levels at once.
//! - [`GreedyPotential`]: prefers branches that reach uncovered nodes.
//! - [`LinearEnumeration`]: enumerates terminal states eagerly, up to a bound.
//! - [`SelectedBranches`]: replays a recorded trail of branch decisions.

pub mod explorer;
pub mod greedy_potential;
pub mod incremental_stack;
pub mod linear_enumeration;
pub mod random_access_stack;
pub mod selected_branches;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

pub use explorer::{Explorer, Pick, Statistics};
pub use greedy_potential::GreedyPotential;
pub use incremental_stack::IncrementalStack;
pub use linear_enumeration::LinearEnumeration;
pub use random_access_stack::RandomAccessStack;
pub use selected_branches::SelectedBranches;

use crate::{
    constant::{
        DEFAULT_COVERAGE_SCAN_INTERVAL,
        DEFAULT_GUARD_VIOLATION_CEILING,
        DEFAULT_LINEAR_ENUMERATION_BOUND,
        DEFAULT_MAX_TESTS,
        DEFAULT_RANDOM_FALLBACK_THRESHOLD,
        DEFAULT_SOLVER_TIMEOUT_MS,
        DEFAULT_STRICT_MODE_ENABLED,
    },
    error::execution::Result,
    final_state::FinalState,
    state::trail::Trail,
};

/// The test emission callback. Returning `true` stops exploration.
pub type Callback<'a> = dyn FnMut(&FinalState) -> bool + 'a;

/// The interface shared by every exploration strategy.
pub trait ExplorationStrategy
where
    Self: Debug,
{
    /// Explores until `callback` asks to stop or there is nothing left to
    /// explore.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] on any fatal condition, located at the trail of the
    /// path that raised it.
    fn run(&mut self, callback: &mut Callback<'_>) -> Result<()>;

    /// Gets the shared exploration core, for access to its statistics,
    /// coverage and warnings.
    fn explorer(&self) -> &Explorer;
}

/// A dynamically dispatched [`ExplorationStrategy`].
pub type DynStrategy = Box<dyn ExplorationStrategy>;

/// Builds the strategy described by `kind` around `explorer`.
///
/// # Errors
///
/// Returns [`Err`] if the strategy fails during construction, which can only
/// happen for [`LinearEnumeration`].
pub fn build(kind: &StrategyKind, explorer: Explorer) -> Result<DynStrategy> {
    let strategy: DynStrategy = match kind {
        StrategyKind::IncrementalStack => Box::new(IncrementalStack::new(explorer)),
        StrategyKind::RandomAccessStack => Box::new(RandomAccessStack::new(explorer)),
        StrategyKind::GreedyPotential => Box::new(GreedyPotential::new(explorer)),
        StrategyKind::LinearEnumeration => Box::new(LinearEnumeration::new(explorer)?),
        StrategyKind::SelectedBranches { trail } => {
            Box::new(SelectedBranches::new(explorer, trail.clone()))
        }
    };

    Ok(strategy)
}

/// The available exploration strategies.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    IncrementalStack,
    RandomAccessStack,
    GreedyPotential,
    LinearEnumeration,
    SelectedBranches {
        trail: Trail,
    },
}

/// The configuration of a test generation run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// The seed for the random choices of the strategy and the solver. Runs
    /// with the same seed, program and solver explore in the same order.
    ///
    /// Defaults to [`None`], which seeds from entropy.
    pub seed: Option<u64>,

    /// Whether an unimplemented construct aborts the run instead of only
    /// abandoning the path.
    ///
    /// Defaults to [`DEFAULT_STRICT_MODE_ENABLED`].
    pub strict: bool,

    /// The number of violated guards after which the run is aborted.
    ///
    /// Defaults to [`DEFAULT_GUARD_VIOLATION_CEILING`].
    pub guard_violation_ceiling: usize,

    /// The number of selections between scans for uncovered branches in the
    /// greedy potential strategy.
    ///
    /// Defaults to [`DEFAULT_COVERAGE_SCAN_INTERVAL`].
    pub coverage_scan_interval: usize,

    /// The number of selections without an accepted test after which the
    /// greedy potential strategy selects purely at random.
    ///
    /// Defaults to [`DEFAULT_RANDOM_FALLBACK_THRESHOLD`].
    pub random_fallback_threshold: usize,

    /// The maximum number of terminal states the linear enumeration strategy
    /// records.
    ///
    /// Defaults to [`DEFAULT_LINEAR_ENUMERATION_BOUND`].
    pub linear_enumeration_bound: usize,

    /// The timeout for each solver query in milliseconds.
    ///
    /// Defaults to [`DEFAULT_SOLVER_TIMEOUT_MS`].
    pub solver_timeout_ms: u64,

    /// The number of tests after which the generator stops, with zero meaning
    /// no limit.
    ///
    /// Defaults to [`DEFAULT_MAX_TESTS`].
    pub max_tests: usize,

    /// The exploration strategy.
    pub strategy: StrategyKind,
}

impl Config {
    /// Sets the `seed` config parameter to `value`.
    #[must_use]
    pub fn with_seed(mut self, value: u64) -> Self {
        self.seed = Some(value);
        self
    }

    /// Sets the `strict` config parameter to `value`.
    #[must_use]
    pub fn with_strict(mut self, value: bool) -> Self {
        self.strict = value;
        self
    }

    /// Sets the `guard_violation_ceiling` config parameter to `value`.
    #[must_use]
    pub fn with_guard_violation_ceiling(mut self, value: usize) -> Self {
        self.guard_violation_ceiling = value;
        self
    }

    /// Sets the `coverage_scan_interval` config parameter to `value`.
    #[must_use]
    pub fn with_coverage_scan_interval(mut self, value: usize) -> Self {
        self.coverage_scan_interval = value;
        self
    }

    /// Sets the `random_fallback_threshold` config parameter to `value`.
    #[must_use]
    pub fn with_random_fallback_threshold(mut self, value: usize) -> Self {
        self.random_fallback_threshold = value;
        self
    }

    /// Sets the `linear_enumeration_bound` config parameter to `value`.
    #[must_use]
    pub fn with_linear_enumeration_bound(mut self, value: usize) -> Self {
        self.linear_enumeration_bound = value;
        self
    }

    /// Sets the `solver_timeout_ms` config parameter to `value`.
    #[must_use]
    pub fn with_solver_timeout_ms(mut self, value: u64) -> Self {
        self.solver_timeout_ms = value;
        self
    }

    /// Sets the `max_tests` config parameter to `value`.
    #[must_use]
    pub fn with_max_tests(mut self, value: usize) -> Self {
        self.max_tests = value;
        self
    }

    /// Sets the `strategy` config parameter to `value`.
    #[must_use]
    pub fn with_strategy(mut self, value: StrategyKind) -> Self {
        self.strategy = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let seed = None;
        let strict = DEFAULT_STRICT_MODE_ENABLED;
        let guard_violation_ceiling = DEFAULT_GUARD_VIOLATION_CEILING;
        let coverage_scan_interval = DEFAULT_COVERAGE_SCAN_INTERVAL;
        let random_fallback_threshold = DEFAULT_RANDOM_FALLBACK_THRESHOLD;
        let linear_enumeration_bound = DEFAULT_LINEAR_ENUMERATION_BOUND;
        let solver_timeout_ms = DEFAULT_SOLVER_TIMEOUT_MS;
        let max_tests = DEFAULT_MAX_TESTS;
        let strategy = StrategyKind::default();
        Self {
            seed,
            strict,
            guard_violation_ceiling,
            coverage_scan_interval,
            random_fallback_threshold,
            linear_enumeration_bound,
            solver_timeout_ms,
            max_tests,
            strategy,
        }
    }
}
