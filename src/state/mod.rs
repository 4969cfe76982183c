//! This module contains the [`ExecutionState`], one point in the explored
//! state space.
//!
//! States are never shared between live branches. A stepper produces each
//! successor by cloning its input state and mutating the clone, so the input
//! state is left untouched. Every part of a state is either owned or an
//! immutable shared structure, which makes cloning cheap without letting a
//! clone observe mutations of the original.

pub mod env;
pub mod packet;
pub mod property;
pub mod test_object;
pub mod trail;

use std::collections::BTreeSet;

use derivative::Derivative;

use crate::{
    continuation::{Body, Command, ExceptionKind, Frame, Namespace, TraceEvent},
    coverage::CoverageSet,
    error::execution::{Error, UnlocatedResult},
    expr::{fold, ExprRef, Variable},
    program::NodeId,
    reachability::DynCursor,
    state::{
        env::SymbolicEnv,
        packet::PacketBuffers,
        property::{Properties, PropertyValue},
        test_object::{TestObject, TestObjects},
        trail::Trail,
    },
};

/// The state of one path through the program.
///
/// # Terminal States
///
/// A state is terminal when its body and its frame stack are both empty. A
/// state whose body is empty while frames remain resumes the innermost frame
/// on its next step.
#[derive(Clone, Debug, Derivative)]
#[derivative(PartialEq)]
pub struct ExecutionState {
    /// The values of the state variables.
    env: SymbolicEnv,

    /// The conditions under which this state is reachable. Entries are only
    /// ever appended.
    path_constraint: Vec<ExprRef>,

    /// The branch decisions that led to this state.
    trail: Trail,

    /// The pending commands of the current frame.
    body: Body,

    /// The suspended frames, innermost last.
    stack: Vec<Frame>,

    /// The declarations visible to the current frame.
    namespace: Namespace,

    /// The input, working and output packets.
    packet: PacketBuffers,

    /// Cross-cutting execution flags.
    properties: Properties,

    /// Artifacts for the test backend.
    test_objects: TestObjects,

    /// The program nodes executed on this path.
    visited: CoverageSet,

    /// The recorded trace events, with state references resolved.
    trace: Vec<TraceEvent>,

    /// Variables introduced outside of the environment, such as packet
    /// variables, that model completion must still assign.
    symbolic_variables: BTreeSet<Variable>,

    /// Variables whose value is computed from the rest of the model after
    /// solving, in definition order.
    derived: Vec<(Variable, ExprRef)>,

    /// The position of this path in the reachability automaton, if one is in
    /// use.
    #[derivative(PartialEq = "ignore")]
    reachability: Option<DynCursor>,
}

impl ExecutionState {
    /// Creates a state that starts by executing `commands` in `namespace`.
    #[must_use]
    pub fn new(commands: Vec<Command>, namespace: Namespace) -> Self {
        Self {
            env: SymbolicEnv::new(),
            path_constraint: Vec::new(),
            trail: Trail::new(),
            body: commands.into(),
            stack: Vec::new(),
            namespace,
            packet: PacketBuffers::new(),
            properties: Properties::new(),
            test_objects: TestObjects::new(),
            visited: CoverageSet::new(),
            trace: Vec::new(),
            symbolic_variables: BTreeSet::new(),
            derived: Vec::new(),
            reachability: None,
        }
    }

    /// Checks if the state has nothing left to execute.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.body.is_empty() && self.stack.is_empty()
    }

    /// Gets the symbolic environment.
    #[must_use]
    pub fn env(&self) -> &SymbolicEnv {
        &self.env
    }

    /// Gets the value of the state variable `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `name` is not bound.
    pub fn get(&self, name: &str) -> UnlocatedResult<ExprRef> {
        self.env
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnboundStateVariable {
                name: name.to_string(),
            })
    }

    /// Binds the state variable `name` to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `value` refers to an unbound state variable.
    pub fn set(&mut self, name: impl Into<String>, value: ExprRef) -> UnlocatedResult<()> {
        self.env.set(name, value)
    }

    /// Resolves every state reference in `expr` against the environment.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `expr` refers to an unbound state variable.
    pub fn subst(&self, expr: &ExprRef) -> UnlocatedResult<ExprRef> {
        self.env.subst(expr)
    }

    /// Gets the path constraint.
    #[must_use]
    pub fn path_constraint(&self) -> &[ExprRef] {
        &self.path_constraint
    }

    /// Appends `constraint` to the path constraint. Literal `true` is not
    /// recorded.
    pub fn add_constraint(&mut self, constraint: ExprRef) {
        if constraint.as_bool() != Some(true) {
            self.path_constraint.push(constraint);
        }
    }

    /// Gets the branch decision trail.
    #[must_use]
    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    /// Records that branch `id` was taken to reach this state.
    pub fn push_decision(&mut self, id: u64) {
        self.trail.push(id);
    }

    /// Gets the pending commands of the current frame.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Gets the pending commands of the current frame for modification.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Gets the command that executes next, if the body has one.
    #[must_use]
    pub fn next_command(&self) -> Option<&Command> {
        self.body.next()
    }

    /// Removes the command that executes next.
    pub fn pop_body(&mut self) -> Option<Command> {
        self.body.pop()
    }

    /// Replaces the command that executes next with `commands`.
    pub fn replace_top(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.body.replace_top(commands);
    }

    /// Gets the suspended frames, innermost last.
    #[must_use]
    pub fn stack(&self) -> &[Frame] {
        &self.stack
    }

    /// Suspends the rest of the current body into `frame` and makes
    /// `callee` the current body, running in `namespace`.
    ///
    /// The command at the top of the body, normally the call itself, is
    /// dropped before the caller is suspended.
    pub fn push_frame(&mut self, mut frame: Frame, callee: Vec<Command>, namespace: Namespace) {
        let mut caller = std::mem::replace(&mut self.body, callee.into());
        caller.pop();
        frame.normal = caller;
        frame.namespace = std::mem::replace(&mut self.namespace, namespace);
        self.stack.push(frame);
    }

    /// Returns from the current frame with `value`.
    ///
    /// The innermost suspended frame becomes current, binding `value` to its
    /// result variable if it has one. Returning with no suspended frame ends
    /// the path.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if binding the value fails.
    pub fn pop_continuation(&mut self, value: Option<ExprRef>) -> UnlocatedResult<()> {
        let Some(frame) = self.stack.pop() else {
            self.body = Body::new();
            return Ok(());
        };

        self.body = frame.normal;
        self.namespace = frame.namespace;
        if let (Some(name), Some(value)) = (frame.result_binding, value) {
            self.env.set(name, value)?;
        }

        Ok(())
    }

    /// Unwinds to the nearest frame that handles `kind` and continues with
    /// its handler.
    ///
    /// An unhandled [`ExceptionKind::Exit`] ends the path.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no frame handles any other kind of exception.
    pub fn handle_exception(&mut self, kind: &ExceptionKind) -> UnlocatedResult<()> {
        while let Some(mut frame) = self.stack.pop() {
            if let Some(handler) = frame.handlers.remove(kind) {
                self.body = handler;
                self.namespace = frame.namespace;
                return Ok(());
            }
        }

        self.body = Body::new();
        if *kind == ExceptionKind::Exit {
            Ok(())
        } else {
            Err(Error::UnhandledException {
                exception: kind.to_string(),
            })
        }
    }

    /// Gets the namespace of the current frame.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Gets the packet buffers.
    #[must_use]
    pub fn packet(&self) -> &PacketBuffers {
        &self.packet
    }

    /// Extracts `width` bits from the packet, registering any packet variable
    /// that had to be allocated.
    pub fn extract(&mut self, width: usize) -> ExprRef {
        let (value, fresh) = self.packet.extract(width);
        if let Some(variable) = fresh {
            self.symbolic_variables.insert(variable);
        }
        value
    }

    /// Appends `value` to the output packet.
    pub fn emit(&mut self, value: ExprRef) {
        self.packet.emit(value);
    }

    /// Gets the state properties.
    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Sets the property `name` to `value`.
    pub fn set_property(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.properties.set(name, value);
    }

    /// Gets the test objects.
    #[must_use]
    pub fn test_objects(&self) -> &TestObjects {
        &self.test_objects
    }

    /// Adds `object` under `category` and `label`.
    pub fn add_test_object(
        &mut self,
        category: impl Into<String>,
        label: impl Into<String>,
        object: impl TestObject,
    ) {
        self.test_objects.add(category, label, object);
    }

    /// Gets the program nodes executed on this path.
    #[must_use]
    pub fn visited(&self) -> &CoverageSet {
        &self.visited
    }

    /// Records that `node` was executed.
    pub fn mark_visited(&mut self, node: NodeId) {
        self.visited.insert(node);
    }

    /// Gets the recorded trace.
    #[must_use]
    pub fn trace(&self) -> &[TraceEvent] {
        &self.trace
    }

    /// Appends `event` to the trace.
    pub fn add_trace(&mut self, event: TraceEvent) {
        self.trace.push(event);
    }

    /// Gets the variables introduced outside of the environment.
    #[must_use]
    pub fn symbolic_variables(&self) -> &BTreeSet<Variable> {
        &self.symbolic_variables
    }

    /// Creates a fresh variable that model completion must assign, returning
    /// it as an expression.
    pub fn fresh_variable(&mut self, variable: Variable) -> ExprRef {
        self.symbolic_variables.insert(variable.clone());
        fold::variable(variable)
    }

    /// Gets the derived variable definitions in definition order.
    #[must_use]
    pub fn derived(&self) -> &[(Variable, ExprRef)] {
        &self.derived
    }

    /// Defines `variable` as `definition`, to be computed after solving.
    pub fn add_derived(&mut self, variable: Variable, definition: ExprRef) {
        self.derived.push((variable, definition));
    }

    /// Gets the reachability cursor.
    #[must_use]
    pub fn reachability_cursor(&self) -> Option<&DynCursor> {
        self.reachability.as_ref()
    }

    /// Sets the reachability cursor.
    pub fn set_reachability_cursor(&mut self, cursor: DynCursor) {
        self.reachability = Some(cursor);
    }
}
