//! This module contains the continuation model: the representation of the
//! program that a state still has to execute.
//!
//! A continuation is a [`Body`] of pending [`Command`]s for the current frame
//! plus a stack of suspended [`Frame`]s. Control state is saved and restored
//! explicitly through these structures rather than the host call stack, so
//! that backtracking to any earlier state is a matter of resuming a clone.

pub mod trace;

use std::{
    collections::{BTreeMap, VecDeque},
    fmt::{Display, Formatter},
    rc::Rc,
};

pub use trace::TraceEvent;

use crate::{expr::ExprRef, program::NodeRef, state::property::PropertyValue};

/// A single pending unit of work.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// A statement or expression node to be handed to the target stepper.
    Node(NodeRef),

    /// A return from the current frame.
    Return(ReturnValue),

    /// An exception to be dispatched to the nearest matching handler.
    Exception(ExceptionKind),

    /// An update to a state property.
    PropertyUpdate { name: String, value: PropertyValue },

    /// A condition that must hold for execution to continue on this path.
    Guard(Guard),

    /// An event to be recorded in the state's trace.
    Trace(TraceEvent),
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(node) => write!(f, "node {node}"),
            Self::Return(value) => write!(f, "return {value}"),
            Self::Exception(kind) => write!(f, "raise {kind}"),
            Self::PropertyUpdate { name, value } => write!(f, "set {name} = {value}"),
            Self::Guard(guard) => write!(f, "guard {}", guard.condition),
            Self::Trace(event) => write!(f, "trace {event}"),
        }
    }
}

/// The value carried by a [`Command::Return`].
#[derive(Clone, Debug, PartialEq)]
pub enum ReturnValue {
    /// A return without a value.
    None,

    /// An already evaluated symbolic value.
    Symbolic(ExprRef),

    /// An expression node that the expression stepper must evaluate first.
    ///
    /// The stepper replaces the pending return with a
    /// [`ReturnValue::Symbolic`] one in each successor.
    Node(NodeRef),
}

impl Display for ReturnValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "()"),
            Self::Symbolic(value) => write!(f, "{value}"),
            Self::Node(node) => write!(f, "{node}"),
        }
    }
}

/// The kinds of exception that can unwind the continuation.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ExceptionKind {
    /// Stops processing of the packet. Ends the path when unhandled.
    Exit,

    /// Rejects the packet during parsing.
    Reject,

    /// The packet was too short for an extraction.
    PacketTooShort,

    /// A header stack was indexed out of bounds.
    StackOutOfBounds,

    /// A target-specific exception.
    Custom(String),
}

impl Display for ExceptionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exit => write!(f, "exit"),
            Self::Reject => write!(f, "reject"),
            Self::PacketTooShort => write!(f, "packet_too_short"),
            Self::StackOutOfBounds => write!(f, "stack_out_of_bounds"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// A condition that must hold for the path to remain valid.
#[derive(Clone, Debug, PartialEq)]
pub struct Guard {
    /// The condition, possibly referring to state variables.
    pub condition: ExprRef,

    /// A description of where the guard came from, for diagnostics.
    pub reason: String,
}

impl Guard {
    /// Creates a new guard on `condition`.
    pub fn new(condition: ExprRef, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self { condition, reason }
    }
}

/// The pending commands of one frame. The front of the body is executed
/// next.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Body {
    commands: VecDeque<Command>,
}

impl Body {
    /// Creates an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the command that will execute next.
    #[must_use]
    pub fn next(&self) -> Option<&Command> {
        self.commands.front()
    }

    /// Removes and returns the command that would execute next.
    pub fn pop(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    /// Pushes `command` so that it executes next.
    pub fn push(&mut self, command: Command) {
        self.commands.push_front(command);
    }

    /// Pushes `commands` so that they execute next, in order.
    pub fn push_all(&mut self, commands: impl IntoIterator<Item = Command>) {
        let commands: Vec<Command> = commands.into_iter().collect();
        for command in commands.into_iter().rev() {
            self.commands.push_front(command);
        }
    }

    /// Replaces the next command with `commands`, in order.
    pub fn replace_top(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.commands.pop_front();
        self.push_all(commands);
    }

    /// Gets the number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Checks if there are no pending commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterates over the pending commands in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }
}

impl From<Vec<Command>> for Body {
    fn from(value: Vec<Command>) -> Self {
        let commands = value.into();
        Self { commands }
    }
}

impl FromIterator<Command> for Body {
    fn from_iter<T: IntoIterator<Item = Command>>(iter: T) -> Self {
        let commands = iter.into_iter().collect();
        Self { commands }
    }
}

/// The lexical declarations visible to the current frame.
///
/// Scopes are shared between the states that were cloned from one another,
/// so snapshotting a namespace into a frame is cheap.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Namespace {
    scopes: Vec<Rc<BTreeMap<String, NodeRef>>>,
}

impl Namespace {
    /// Creates an empty namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a namespace that adds the scope of `declarations` on top of
    /// `self`.
    #[must_use]
    pub fn with_scope(&self, declarations: impl IntoIterator<Item = (String, NodeRef)>) -> Self {
        let mut scopes = self.scopes.clone();
        scopes.push(Rc::new(declarations.into_iter().collect()));
        Self { scopes }
    }

    /// Finds the innermost declaration of `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&NodeRef> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Gets the number of nested scopes.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

/// A suspended caller, restored when the callee returns or when one of its
/// handlers catches an exception.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// The caller's remaining body, resumed on a normal return.
    pub normal: Body,

    /// The bodies that run in place of `normal` when the callee raises the
    /// corresponding exception.
    pub handlers: BTreeMap<ExceptionKind, Body>,

    /// The caller's namespace at the time of the call.
    pub namespace: Namespace,

    /// The state variable that receives the callee's return value, if any.
    pub result_binding: Option<String>,
}

impl Frame {
    /// Creates a frame that resumes `normal` in `namespace`.
    #[must_use]
    pub fn new(normal: Body, namespace: Namespace) -> Self {
        Self {
            normal,
            handlers: BTreeMap::new(),
            namespace,
            result_binding: None,
        }
    }

    /// Sets the state variable that receives the return value.
    #[must_use]
    pub fn binding_result_to(mut self, name: impl Into<String>) -> Self {
        self.result_binding = Some(name.into());
        self
    }

    /// Adds a handler for `kind`.
    #[must_use]
    pub fn handling(mut self, kind: ExceptionKind, body: Body) -> Self {
        self.handlers.insert(kind, body);
        self
    }
}

#[cfg(test)]
mod test {
    use crate::{
        continuation::{Body, Command, ExceptionKind},
        state::property::PropertyValue,
    };

    fn update(name: &str) -> Command {
        Command::PropertyUpdate {
            name:  name.into(),
            value: PropertyValue::Bool(true),
        }
    }

    #[test]
    fn pushes_commands_in_execution_order() {
        let mut body = Body::from(vec![update("c")]);
        body.push_all(vec![update("a"), update("b")]);

        let order: Vec<String> = body.iter().map(ToString::to_string).collect();
        assert_eq!(order, vec!["set a = true", "set b = true", "set c = true"]);
    }

    #[test]
    fn replaces_the_top_command() {
        let mut body = Body::from(vec![update("a"), update("b")]);
        body.replace_top(vec![Command::Exception(ExceptionKind::Exit)]);

        assert_eq!(body.len(), 2);
        assert_eq!(body.pop(), Some(Command::Exception(ExceptionKind::Exit)));
        assert_eq!(body.pop(), Some(update("b")));
        assert!(body.is_empty());
    }
}
