//! This module contains the definition of the test generator itself.

pub mod state;
pub mod test_case;

use std::rc::Rc;

use log::info;

use crate::{
    error,
    generator::{
        state::State,
        test_case::{CoverageSummary, Report, TestCase},
    },
    program::ProgramInfo,
    reachability::DynReachabilityEngine,
    solver::DynSolver,
    stepper::DynStepper,
    strategy,
    strategy::{Config, Explorer},
    watchdog::DynWatchdog,
};

/// Creates a new generator for the provided `program`, whose nodes are given
/// meaning by `stepper`, and which decides feasibility with `solver`.
#[must_use]
pub fn new(
    program: Rc<dyn ProgramInfo>,
    stepper: DynStepper,
    solver: DynSolver,
    config: Config,
    watchdog: DynWatchdog,
) -> Generator<state::HasProgram> {
    let state = state::HasProgram {
        stepper,
        solver,
        config,
        reachability: None,
        watchdog,
    };
    Generator { program, state }
}

/// The driver of test generation, responsible for turning a program into a
/// report of tests.
///
/// # Enforcing Valid State Transitions
///
/// The generator enforces that only correct state transitions can occur
/// through use of structs that implement the exact state required by it at
/// any given point.
///
/// There is the [`Self::state`] function that provides access to the state
/// data of whichever state the generator is currently in.
pub struct Generator<S: State> {
    /// The program tests are generated for.
    program: Rc<dyn ProgramInfo>,

    /// The internal state of the generator.
    state: S,
}

/// The operations available in all states.
impl<S: State> Generator<S> {
    /// Gets a reference to the program tests are generated for.
    pub fn program(&self) -> &dyn ProgramInfo {
        self.program.as_ref()
    }

    /// Gets an immutable reference to the current state of the generator.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Moves the generator into the state `NS`, created by applying
    /// `transform` to the current state.
    fn transform_state<NS: State>(
        self,
        transform: impl FnOnce(S) -> error::Result<NS>,
    ) -> error::Result<Generator<NS>> {
        let state = transform(self.state)?;
        let program = self.program;

        Ok(Generator { program, state })
    }
}

/// A type that allows the user to easily name the initial state of the
/// generator.
pub type InitialGenerator = Generator<state::HasProgram>;

/// Operations available on a newly-created generator.
impl Generator<state::HasProgram> {
    /// Prunes paths that cannot match the call-site pattern of `engine`.
    #[must_use]
    pub fn with_reachability(mut self, engine: DynReachabilityEngine) -> Self {
        self.state.reachability = Some(engine);
        self
    }

    /// Executes test generation from beginning to end, performing all the
    /// intermediate steps automatically and returning the report.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if any step in the process fails.
    pub fn generate(self) -> error::Result<Report> {
        let generator = self.prepare_strategy()?;
        let generator = generator.explore()?;
        let report = generator.report();

        Ok(report.clone())
    }

    /// Builds the exploration strategy named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the strategy fails during construction, which
    /// happens when the eager linear enumeration fails.
    pub fn prepare_strategy(self) -> error::Result<Generator<state::StrategyReady>> {
        let program = self.program.clone();
        self.transform_state(|old_state| {
            let max_tests = old_state.config.max_tests;
            let kind = old_state.config.strategy.clone();
            let mut explorer = Explorer::new(
                program,
                old_state.stepper,
                old_state.solver,
                old_state.config,
                old_state.watchdog,
            );
            if let Some(engine) = old_state.reachability {
                explorer = explorer.with_reachability(engine);
            }
            let strategy = strategy::build(&kind, explorer)?;
            Ok(state::StrategyReady {
                strategy,
                max_tests,
            })
        })
    }
}

/// Operations available on a generator with a strategy ready to run.
impl Generator<state::StrategyReady> {
    /// Runs the strategy, collecting a test for every accepted terminal state
    /// until the strategy is exhausted or `max_tests` tests exist.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if exploration fails fatally.
    pub fn explore(self) -> error::Result<Generator<state::ExplorationComplete>> {
        self.transform_state(|mut old_state| {
            let max_tests = old_state.max_tests;
            let mut tests = Vec::new();
            old_state.strategy.run(&mut |final_state| {
                tests.push(TestCase::new(tests.len(), final_state));
                max_tests != 0 && tests.len() >= max_tests
            })?;

            let explorer = old_state.strategy.explorer();
            let coverage = CoverageSummary::from(explorer.coverage());
            let statistics = explorer.statistics();
            let warnings = explorer
                .warnings()
                .payloads()
                .iter()
                .map(ToString::to_string)
                .collect();
            info!(
                "Generated {} tests covering {} of {} nodes",
                tests.len(),
                coverage.covered,
                coverage.coverable
            );

            let report = Report {
                tests,
                coverage,
                statistics,
                warnings,
            };
            Ok(state::ExplorationComplete { report })
        })
    }
}

/// Operations available on a generator that has finished exploring.
impl Generator<state::ExplorationComplete> {
    /// Gets the report of the run.
    #[must_use]
    pub fn report(&self) -> &Report {
        &self.state.report
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::{
        generator,
        solver::EnumerativeSolver,
        strategy::{Config, StrategyKind},
        target::simple::{Expr, SimpleProgram, SimpleStepper},
        watchdog::LazyWatchdog,
    };

    fn program() -> SimpleProgram {
        let mut program = SimpleProgram::new();
        let pipeline = vec![
            program.extract("x", 8),
            program.if_else(
                Expr::eq(Expr::field("x", 8), Expr::bits(0, 8)),
                vec![program.reject()],
                vec![program.emit(Expr::field("x", 8))],
            ),
        ];
        program.set_pipeline(pipeline);
        program
    }

    #[test]
    fn generates_a_report() -> anyhow::Result<()> {
        let config = Config::default().with_seed(2);
        let report = generator::new(
            Rc::new(program()),
            Box::new(SimpleStepper),
            Box::new(EnumerativeSolver::new()),
            config,
            LazyWatchdog.in_rc(),
        )
        .generate()?;

        assert_eq!(report.tests.len(), 2);
        assert_eq!(report.statistics.tests, 2);
        assert_eq!(report.coverage.covered, report.coverage.coverable);
        assert!(report.warnings.is_empty());
        for (index, test) in report.tests.iter().enumerate() {
            assert_eq!(test.index, index);
        }

        Ok(())
    }

    #[test]
    fn stops_at_the_test_bound() -> anyhow::Result<()> {
        let config = Config::default()
            .with_seed(2)
            .with_max_tests(1)
            .with_strategy(StrategyKind::LinearEnumeration);
        let report = generator::new(
            Rc::new(program()),
            Box::new(SimpleStepper),
            Box::new(EnumerativeSolver::new()),
            config,
            LazyWatchdog.in_rc(),
        )
        .generate()?;

        assert_eq!(report.tests.len(), 1);

        Ok(())
    }
}
