//! This module contains errors pertaining to the symbolic execution of a
//! program and the exploration of its paths.

use thiserror::Error;

use crate::error::container;

/// Errors that occur while stepping, exploring or concretizing execution
/// states.
///
/// With the exception of [`Error::Unimplemented`], all of these are fatal to
/// the run that encounters them.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("The construct `{construct}` is not supported by the target stepper")]
    Unimplemented { construct: String },

    #[error("Attempted to step a state that has no pending commands")]
    SteppedTerminalState,

    #[error("Branch {id} was requested for replay but only {available} branches exist")]
    NoSuchBranch { id: u64, available: usize },

    #[error("The replay trail ran out while the program still had a choice to make")]
    ReplayTrailExhausted,

    #[error("A branch set was taken from the reservoir but held no branches")]
    InvalidBranchSet,

    #[error("Property `{name}` holds a {found} but was read as a {expected}")]
    PropertyTypeMismatch {
        name:     String,
        expected: String,
        found:    String,
    },

    #[error("Property `{name}` has not been set on this state")]
    MissingProperty { name: String },

    #[error("No frame on the stack handles the `{exception}` exception")]
    UnhandledException { exception: String },

    #[error("State variable `{name}` is not bound in the symbolic environment")]
    UnboundStateVariable { name: String },

    #[error("Variable `{name}` has no value in the model")]
    VariableNotInModel { name: String },

    #[error("Expected an operand of width {expected} but found width {found}")]
    WidthMismatch { expected: usize, found: usize },

    #[error("Expected a {expected} operand but found a {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Arithmetic on {width}-bit values is not supported")]
    ArithmeticTooWide { width: usize },

    #[error("Slice [{high}:{low}] is invalid for a value of width {width}")]
    InvalidSlice { high: usize, low: usize, width: usize },

    #[error("The path constraint of a terminal state is {answer}, so it yields no test")]
    UnviableTerminal { answer: String },

    #[error("A model was requested from the solver without a preceding satisfiable check")]
    ModelUnavailable,

    #[error("{violations} guards were violated, exceeding the ceiling of {ceiling}")]
    GuardCeilingExceeded { violations: usize, ceiling: usize },

    #[error("Execution was stopped by the watchdog")]
    StoppedByWatchdog,

    #[error("Target error: {message}")]
    Target { message: String },
}

impl Error {
    /// Constructs an [`Error::Unimplemented`] for the named `construct`.
    pub fn unimplemented(construct: impl Into<String>) -> Self {
        Self::Unimplemented {
            construct: construct.into(),
        }
    }

    /// Constructs a target-specific error with the provided `message`.
    pub fn target(message: impl Into<String>) -> Self {
        Self::Target {
            message: message.into(),
        }
    }

    /// Checks if the error is the recoverable "unimplemented" condition.
    #[must_use]
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, Self::Unimplemented { .. })
    }
}

/// An execution error with the trail of the path that raised it.
pub type LocatedError = container::Located<Error>;

/// A container of execution errors used for aggregation of warnings during
/// exploration.
pub type Errors = container::Errors<LocatedError>;

/// The result type for methods that may have execution errors.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// The result type for operations that have no path to report, such as pure
/// expression evaluation. Callers attach a trail with
/// [`container::Locatable::locate`].
pub type UnlocatedResult<T> = std::result::Result<T, Error>;

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, trail: &crate::state::trail::Trail) -> Self::Located {
        container::Located {
            location: trail.clone(),
            payload:  self,
        }
    }
}
