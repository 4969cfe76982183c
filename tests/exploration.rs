//! Exploration of small programs through the generator, under every
//! exploring strategy.

use std::{collections::BTreeSet, rc::Rc};

use packet_testgen as ptg;
use packet_testgen::{
    error::{execution, Error},
    program::NodeRef,
    solver::EnumerativeSolver,
    state::ExecutionState,
    stepper::{Branch, Stepper},
    strategy::{Config, StrategyKind},
    target::simple::{Expr, SimpleProgram, SimpleStepper, Statement, Stmt},
    watchdog::LazyWatchdog,
};

mod common;

fn decode(hex_string: &str) -> anyhow::Result<Vec<u8>> {
    Ok(hex::decode(hex_string)?)
}

#[test]
fn straight_line_program_yields_one_test() -> anyhow::Result<()> {
    let mut program = SimpleProgram::new();
    let pipeline = vec![
        program.extract("x", 8),
        program.emit(Expr::field("x", 8)),
    ];
    program.set_pipeline(pipeline);

    for strategy in [
        StrategyKind::IncrementalStack,
        StrategyKind::RandomAccessStack,
        StrategyKind::GreedyPotential,
        StrategyKind::LinearEnumeration,
    ] {
        let config = Config::default().with_seed(0).with_strategy(strategy.clone());
        let report = common::generate(program.clone(), config)?;

        assert_eq!(report.tests.len(), 1, "{strategy:?}");
        assert_eq!(report.statistics.guard_evaluations, 0, "{strategy:?}");
        assert_eq!(report.statistics.backtracks, 0, "{strategy:?}");
        assert_eq!(report.tests[0].input_packet, report.tests[0].output_packet);
        assert!(report.tests[0].trail.is_empty());
        assert_eq!(report.coverage.covered, report.coverage.coverable);
    }

    Ok(())
}

/// Steps like [`SimpleStepper`], except that a `dead` trace has no
/// successors.
#[derive(Debug)]
struct DeadEndStepper;

impl Stepper for DeadEndStepper {
    fn step_statement(
        &self,
        state: &ExecutionState,
        node: &NodeRef,
    ) -> execution::UnlocatedResult<Vec<Branch>> {
        let dead_end = node.downcast_ref::<Statement>().is_some_and(|statement| {
            matches!(statement.stmt(), Stmt::Trace { label, .. } if label == "dead")
        });
        if dead_end {
            return Ok(vec![]);
        }
        SimpleStepper.step_statement(state, node)
    }

    fn step_expression(
        &self,
        state: &ExecutionState,
        node: &NodeRef,
    ) -> execution::UnlocatedResult<Vec<Branch>> {
        SimpleStepper.step_expression(state, node)
    }
}

#[test]
fn steps_without_successors_backtrack() -> anyhow::Result<()> {
    let mut program = SimpleProgram::new();
    let pipeline = vec![
        program.extract("x", 8),
        program.if_else(
            Expr::eq(Expr::field("x", 8), Expr::bits(0, 8)),
            vec![program.trace("dead")],
            vec![program.trace("live")],
        ),
    ];
    program.set_pipeline(pipeline);

    for strategy in [
        StrategyKind::IncrementalStack,
        StrategyKind::RandomAccessStack,
        StrategyKind::GreedyPotential,
        StrategyKind::LinearEnumeration,
    ] {
        let report = ptg::new(
            Rc::new(program.clone()),
            Box::new(DeadEndStepper),
            Box::new(EnumerativeSolver::new()),
            Config::default().with_seed(2).with_strategy(strategy.clone()),
            LazyWatchdog.in_rc(),
        )
        .generate()?;

        assert_eq!(report.tests.len(), 1, "{strategy:?}");
        assert_eq!(report.tests[0].trace, vec!["live".to_string()], "{strategy:?}");
        assert!(report.warnings.is_empty(), "{strategy:?}");
    }

    Ok(())
}

#[test]
fn every_strategy_finds_every_path() -> anyhow::Result<()> {
    let strategies = [
        StrategyKind::IncrementalStack,
        StrategyKind::RandomAccessStack,
        StrategyKind::GreedyPotential,
        StrategyKind::LinearEnumeration,
    ];

    for strategy in strategies {
        let config = Config::default().with_seed(3).with_strategy(strategy.clone());
        let report = common::generate(common::forwarding_program(), config)?;

        let traces: BTreeSet<Vec<String>> =
            report.tests.iter().map(|test| test.trace.clone()).collect();
        let expected: BTreeSet<Vec<String>> = [
            vec!["expired".to_string(), "packet rejected".to_string()],
            vec!["tcp".to_string()],
            vec!["other".to_string()],
        ]
        .into_iter()
        .collect();

        assert_eq!(traces, expected, "{strategy:?}");
        assert_eq!(report.tests.len(), 3, "{strategy:?}");
        assert_eq!(report.coverage.covered, report.coverage.coverable, "{strategy:?}");
        assert!(report.warnings.is_empty(), "{strategy:?}");
    }

    Ok(())
}

#[test]
fn tests_satisfy_the_constraints_of_their_path() -> anyhow::Result<()> {
    let config = Config::default()
        .with_seed(4)
        .with_strategy(StrategyKind::LinearEnumeration);
    let report = common::generate(common::forwarding_program(), config)?;
    assert_eq!(report.tests.len(), 3);

    for test in &report.tests {
        let input = decode(&test.input_packet)?;
        let output = decode(&test.output_packet)?;
        assert_eq!(input.len(), 2);
        let (ttl, proto) = (input[0], input[1]);

        match test.trace.first().map(String::as_str) {
            Some("expired") => {
                assert_eq!(ttl, 0);
                assert!(output.is_empty());
            }
            Some("tcp") => {
                assert_ne!(ttl, 0);
                assert_eq!(proto, 6);
                assert_eq!(output, vec![ttl - 1, proto]);
            }
            Some("other") => {
                assert_ne!(ttl, 0);
                assert_ne!(proto, 6);
                assert_eq!(output, input);
            }
            other => panic!("Unexpected trace start {other:?}"),
        }
    }

    Ok(())
}

#[test]
fn models_assign_every_variable() -> anyhow::Result<()> {
    let report = common::generate(common::forwarding_program(), Config::default().with_seed(8))?;

    for test in &report.tests {
        assert!(test.model.contains_key("pkt_var_0"));
        assert!(test.model.contains_key("pkt_var_1"));
        assert!(test.state.contains_key("ttl"));
        assert!(test.state.contains_key("proto"));
    }

    Ok(())
}

#[test]
fn literally_false_branches_are_never_taken() -> anyhow::Result<()> {
    let mut program = SimpleProgram::new();
    let pipeline = vec![program.if_else(
        Expr::boolean(false),
        vec![program.trace("dead")],
        vec![program.trace("live")],
    )];
    program.set_pipeline(pipeline);

    let report = common::generate(program, Config::default().with_seed(5))?;

    assert_eq!(report.tests.len(), 1);
    assert_eq!(report.tests[0].trace, vec!["live".to_string()]);
    assert!(report.coverage.covered < report.coverage.coverable);

    Ok(())
}

#[test]
fn unsupported_constructs_abandon_the_path() -> anyhow::Result<()> {
    let build = || {
        let mut program = SimpleProgram::new();
        let pipeline = vec![
            program.extract("x", 8),
            program.if_else(
                Expr::eq(Expr::field("x", 8), Expr::bits(0, 8)),
                vec![program.unsupported("checksum_unit")],
                vec![program.trace("ok")],
            ),
        ];
        program.set_pipeline(pipeline);
        program
    };

    let report = common::generate(build(), Config::default().with_seed(6))?;
    assert_eq!(report.tests.len(), 1);
    assert_eq!(report.tests[0].trace, vec!["ok".to_string()]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("checksum_unit"));

    let strict = Config::default().with_seed(6).with_strict(true);
    let Err(errors) = common::new_generator(build(), strict).generate() else {
        panic!("Strict generation accepted an unsupported construct");
    };
    assert_eq!(
        errors.payloads()[0].payload,
        Error::Execution(execution::Error::Unimplemented {
            construct: "checksum_unit".to_string(),
        })
    );

    Ok(())
}

#[test]
fn subroutine_results_flow_into_the_packet() -> anyhow::Result<()> {
    let mut program = SimpleProgram::new();
    let body = vec![program.return_value(Expr::add(Expr::field("x", 8), Expr::bits(2, 8)))];
    program.add_subroutine("bump", body);
    let pipeline = vec![
        program.extract("x", 8),
        program.assert(Expr::eq(Expr::field("x", 8), Expr::bits(0x10, 8)), "x"),
        program.call_into("bump", "y"),
        program.emit(Expr::field("y", 8)),
    ];
    program.set_pipeline(pipeline);

    let report = common::generate(program, Config::default().with_seed(7))?;

    assert_eq!(report.tests.len(), 1);
    assert_eq!(report.tests[0].input_packet, "10");
    assert_eq!(report.tests[0].output_packet, "12");
    assert_eq!(report.statistics.guard_evaluations, 1);
    assert_eq!(report.statistics.guard_violations, 0);

    Ok(())
}
