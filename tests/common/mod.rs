//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]

use std::rc::Rc;

use packet_testgen as ptg;
use packet_testgen::{
    generator::InitialGenerator,
    solver::EnumerativeSolver,
    strategy::{Config, Explorer},
    target::simple::{Expr, SimpleProgram, SimpleStepper},
    watchdog::{DynWatchdog, LazyWatchdog},
    Report,
};

/// Constructs a new generator for `program` using the reference target and
/// solver, and the provided `config`.
#[allow(unused)] // It is actually
pub fn new_generator(program: SimpleProgram, config: Config) -> InitialGenerator {
    new_generator_with_watchdog(program, config, LazyWatchdog.in_rc())
}

/// Constructs a new generator for `program` that is governed by `watchdog`.
#[allow(unused)] // It is actually
pub fn new_generator_with_watchdog(
    program: SimpleProgram,
    config: Config,
    watchdog: DynWatchdog,
) -> InitialGenerator {
    ptg::new(
        Rc::new(program),
        Box::new(SimpleStepper),
        Box::new(EnumerativeSolver::new()),
        config,
        watchdog,
    )
}

/// Constructs an explorer for `program`, for driving a strategy by hand.
#[allow(unused)] // It is actually
pub fn new_explorer(program: SimpleProgram, config: Config) -> Explorer {
    Explorer::new(
        Rc::new(program),
        Box::new(SimpleStepper),
        Box::new(EnumerativeSolver::new()),
        config,
        LazyWatchdog.in_rc(),
    )
}

/// Generates the report for `program` under `config`.
#[allow(unused)] // It is actually
pub fn generate(program: SimpleProgram, config: Config) -> anyhow::Result<Report> {
    Ok(new_generator(program, config).generate()?)
}

/// A program that parses a two-byte header and forwards or drops the packet
/// depending on its fields.
///
/// It has three feasible paths:
///
/// - `ttl == 0`: the packet is rejected.
/// - `ttl != 0 && proto == 6`: the packet is emitted with its `ttl`
///   decremented.
/// - `ttl != 0 && proto != 6`: the packet is emitted unchanged.
#[allow(unused)] // It is actually
pub fn forwarding_program() -> SimpleProgram {
    let mut program = SimpleProgram::new();
    let ttl = || Expr::field("ttl", 8);
    let proto = || Expr::field("proto", 8);
    let pipeline = vec![
        program.extract("ttl", 8),
        program.extract("proto", 8),
        program.if_else(
            Expr::eq(ttl(), Expr::bits(0, 8)),
            vec![program.trace("expired"), program.reject()],
            vec![],
        ),
        program.if_else(
            Expr::eq(proto(), Expr::bits(6, 8)),
            vec![
                program.assign("ttl", Expr::sub(ttl(), Expr::bits(1, 8))),
                program.trace("tcp"),
            ],
            vec![program.trace("other")],
        ),
        program.emit(Expr::concat(ttl(), proto())),
    ];
    program.set_pipeline(pipeline);
    program
}
