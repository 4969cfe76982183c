//! Guards, and the ceiling on how many of them may be violated in one run.

use packet_testgen::{
    error::{execution, Error},
    strategy::Config,
    target::simple::{Expr, SimpleProgram},
};

mod common;

/// A program whose every path ends in a guard that cannot hold.
fn doomed_program() -> SimpleProgram {
    let mut program = SimpleProgram::new();
    let pipeline = vec![
        program.extract("x", 8),
        program.if_else(
            Expr::eq(Expr::field("x", 8), Expr::bits(0, 8)),
            vec![program.assert(Expr::boolean(false), "zero")],
            vec![program.assert(Expr::boolean(false), "nonzero")],
        ),
        program.trace("unreachable"),
    ];
    program.set_pipeline(pipeline);
    program
}

#[test]
fn violations_below_the_ceiling_prune_paths() -> anyhow::Result<()> {
    let config = Config::default()
        .with_seed(1)
        .with_guard_violation_ceiling(2);
    let report = common::generate(doomed_program(), config)?;

    assert!(report.tests.is_empty());
    assert_eq!(report.statistics.guard_evaluations, 2);
    assert_eq!(report.statistics.guard_violations, 2);

    Ok(())
}

#[test]
fn exceeding_the_ceiling_aborts_the_run() {
    let config = Config::default()
        .with_seed(1)
        .with_guard_violation_ceiling(1);
    let Err(errors) = common::new_generator(doomed_program(), config).generate() else {
        panic!("The run survived more violations than its ceiling");
    };

    assert_eq!(errors.len(), 1);
    let error = &errors.payloads()[0];
    assert_eq!(
        error.payload,
        Error::Execution(execution::Error::GuardCeilingExceeded {
            violations: 2,
            ceiling:    1,
        })
    );
    assert_eq!(error.location.len(), 1);
}

#[test]
fn satisfiable_guards_constrain_the_test() -> anyhow::Result<()> {
    let mut program = SimpleProgram::new();
    let pipeline = vec![
        program.extract("x", 8),
        program.assert(Expr::ult(Expr::bits(200, 8), Expr::field("x", 8)), "large"),
        program.assert(Expr::ult(Expr::field("x", 8), Expr::bits(202, 8)), "bounded"),
    ];
    program.set_pipeline(pipeline);

    let report = common::generate(program, Config::default().with_seed(2))?;

    assert_eq!(report.tests.len(), 1);
    assert_eq!(report.tests[0].input_packet, "c9");
    assert_eq!(report.statistics.guard_evaluations, 2);
    assert_eq!(report.statistics.guard_violations, 0);

    Ok(())
}

#[test]
fn tainted_guards_never_hold() -> anyhow::Result<()> {
    let mut program = SimpleProgram::new();
    let pipeline = vec![
        program.taint("noise", 8),
        program.assert(Expr::eq(Expr::field("noise", 8), Expr::bits(0, 8)), "quiet"),
        program.trace("unreachable"),
    ];
    program.set_pipeline(pipeline);

    let report = common::generate(program, Config::default().with_seed(3))?;

    assert!(report.tests.is_empty());
    assert_eq!(report.statistics.guard_violations, 1);
    assert_eq!(report.statistics.solver_calls, 0);

    Ok(())
}
