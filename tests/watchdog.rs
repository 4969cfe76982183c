//! Stopping exploration through a watchdog.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use packet_testgen::{
    error::{execution, Error},
    strategy::{Config, StrategyKind},
    watchdog::{FlagWatchdog, StepBudgetWatchdog},
};

mod common;

fn stopped() -> Error {
    Error::Execution(execution::Error::StoppedByWatchdog)
}

#[test]
fn a_raised_flag_stops_the_run() {
    let flag = Arc::new(AtomicBool::new(false));
    let watchdog = FlagWatchdog::new(flag.clone()).polling_every(1).in_rc();
    flag.store(true, Ordering::Relaxed);

    let Err(errors) = common::new_generator_with_watchdog(
        common::forwarding_program(),
        Config::default().with_seed(1),
        watchdog,
    )
    .generate() else {
        panic!("The run ignored its watchdog");
    };

    assert_eq!(errors.payloads()[0].payload, stopped());
    assert!(errors.payloads()[0].location.is_empty());
}

#[test]
fn an_exhausted_budget_stops_every_strategy() {
    for strategy in [
        StrategyKind::IncrementalStack,
        StrategyKind::RandomAccessStack,
        StrategyKind::GreedyPotential,
        StrategyKind::LinearEnumeration,
    ] {
        let watchdog = StepBudgetWatchdog::new(4).in_rc();
        let result = common::new_generator_with_watchdog(
            common::forwarding_program(),
            Config::default().with_seed(1).with_strategy(strategy.clone()),
            watchdog,
        )
        .generate();

        let Err(errors) = result else {
            panic!("{strategy:?} ran past its step budget");
        };
        assert_eq!(errors.payloads()[0].payload, stopped(), "{strategy:?}");
    }
}

#[test]
fn a_generous_budget_lets_the_run_finish() -> anyhow::Result<()> {
    let watchdog = StepBudgetWatchdog::new(10_000).polling_every(10).in_rc();
    let report = common::new_generator_with_watchdog(
        common::forwarding_program(),
        Config::default().with_seed(1),
        watchdog,
    )
    .generate()?;

    assert_eq!(report.tests.len(), 3);

    Ok(())
}
