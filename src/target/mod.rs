//! This module contains the targets that ship with the crate.
//!
//! A target supplies the [`crate::program::ProgramInfo`] of a program and the
//! [`crate::stepper::Stepper`] that gives its nodes meaning. The core is
//! agnostic to both, so production targets live outside the crate; the
//! [`simple`] target exists to exercise the core end to end.

pub mod simple;
