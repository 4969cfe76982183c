//! A small reference target: a structured packet-processing language with
//! header extraction, conditionals, subroutines, exceptions and guards.
//!
//! Programs are assembled through the builder methods of [`SimpleProgram`],
//! which allocate node identifiers, and stepped by [`SimpleStepper`]. The
//! pipeline is wrapped into a block that handles rejection, so a `reject`
//! anywhere in the pipeline ends the packet with a `packet rejected` trace.

use std::{
    cell::Cell,
    collections::{BTreeMap, BTreeSet},
    iter,
};

use crate::{
    continuation::{Body, Command, ExceptionKind, Frame, Guard, Namespace, ReturnValue, TraceEvent},
    coverage::CoverageSet,
    error::execution::{Error, UnlocatedResult},
    expr::{
        eval::{evaluate, Value},
        fold,
        ExprRef,
        Sort,
        Variable,
    },
    program::{NodeId, NodeKind, NodeRef, ProgramInfo, ProgramNode},
    solver::model::Model,
    state::{property::PropertyValue, test_object::TestObject, ExecutionState},
    stepper::{Branch, Stepper},
};

/// The test object category under which table entries are recorded.
pub const TABLE_ENTRY_CATEGORY: &str = "table_entries";

/// The binary operators of the simple target.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Ult,
    Ule,
    And,
    Or,
    Add,
    Sub,
    BitAnd,
    Concat,
}

/// An expression of the simple target. Fields are read from the state's
/// environment when the expression is stepped.
#[derive(Clone, Debug)]
pub enum Expr {
    Bool(bool),
    Bits { value: u128, width: usize },
    Field { name: String, sort: Sort },
    Tainted(Sort),
    Not(Box<Expr>),
    Binary {
        op:    BinaryOp,
        left:  Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::Bool(value)
    }

    #[must_use]
    pub fn bits(value: u128, width: usize) -> Self {
        Self::Bits { value, width }
    }

    /// A bit-vector field.
    #[must_use]
    pub fn field(name: impl Into<String>, width: usize) -> Self {
        let name = name.into();
        let sort = Sort::Bits(width);
        Self::Field { name, sort }
    }

    /// A boolean field.
    #[must_use]
    pub fn flag(name: impl Into<String>) -> Self {
        let name = name.into();
        let sort = Sort::Bool;
        Self::Field { name, sort }
    }

    #[must_use]
    pub fn tainted(width: usize) -> Self {
        Self::Tainted(Sort::Bits(width))
    }

    #[must_use]
    pub fn not(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    #[must_use]
    pub fn eq(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    #[must_use]
    pub fn ne(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Ne, left, right)
    }

    #[must_use]
    pub fn ult(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Ult, left, right)
    }

    #[must_use]
    pub fn ule(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Ule, left, right)
    }

    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    #[must_use]
    pub fn or(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Or, left, right)
    }

    #[must_use]
    pub fn add(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    #[must_use]
    pub fn sub(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Sub, left, right)
    }

    #[must_use]
    pub fn bit_and(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::BitAnd, left, right)
    }

    #[must_use]
    pub fn concat(high: Self, low: Self) -> Self {
        Self::binary(BinaryOp::Concat, high, low)
    }

    fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Translates the expression into a symbolic expression whose fields are
    /// still unresolved state references.
    #[must_use]
    pub fn lower(&self) -> ExprRef {
        match self {
            Self::Bool(value) => fold::bool_lit(*value),
            Self::Bits { value, width } => fold::bits(*value, *width),
            Self::Field { name, sort } => fold::state_ref(name.clone(), *sort),
            Self::Tainted(sort) => fold::tainted(*sort),
            Self::Not(inner) => fold::not(inner.lower()),
            Self::Binary { op, left, right } => {
                let left = left.lower();
                let right = right.lower();
                match op {
                    BinaryOp::Eq => fold::eq(left, right),
                    BinaryOp::Ne => fold::ne(left, right),
                    BinaryOp::Ult => fold::ult(left, right),
                    BinaryOp::Ule => fold::ule(left, right),
                    BinaryOp::And => fold::and(left, right),
                    BinaryOp::Or => fold::or(left, right),
                    BinaryOp::Add => fold::add(left, right),
                    BinaryOp::Sub => fold::sub(left, right),
                    BinaryOp::BitAnd => fold::bit_and(left, right),
                    BinaryOp::Concat => fold::concat(left, right),
                }
            }
        }
    }
}

/// A statement of the simple target.
#[derive(Clone, Debug)]
pub enum Stmt {
    Assign { target: String, value: Expr },

    /// Reads `width` bits from the front of the packet into `field`.
    Extract { field: String, width: usize },

    /// Appends a value to the output packet.
    Emit(Expr),

    If {
        condition: Expr,
        then:      Vec<NodeRef>,
        otherwise: Vec<NodeRef>,
    },

    /// Runs `body`, continuing with `on_reject` if it rejects the packet.
    Block {
        body:      Vec<NodeRef>,
        on_reject: Vec<NodeRef>,
    },

    /// Calls the subroutine `callee`, binding its return value to `result`.
    Call {
        callee: String,
        result: Option<String>,
    },

    /// Returns from the current subroutine, with the value of the
    /// [`ReturnExpr`] node if there is one.
    Return(Option<NodeRef>),

    Exit,
    Reject,

    /// Requires `condition` to hold for the path to produce a test.
    Assert { condition: Expr, reason: String },

    Trace { label: String, value: Option<Expr> },

    /// Binds `field` to a fresh symbolic input.
    Havoc { field: String, width: usize },

    /// Binds `field` to a value that tests cannot control.
    Taint { field: String, width: usize },

    SetProperty { name: String, value: PropertyValue },

    /// Records a control-plane entry of `table` that makes it run `action`
    /// for `key`.
    TableEntry {
        table:  String,
        action: String,
        key:    Expr,
    },

    /// Binds `target` to a variable whose value is computed from the model,
    /// like a checksum.
    Derive {
        target:     String,
        width:      usize,
        definition: Expr,
    },

    /// A construct the target does not model.
    Unsupported(String),
}

/// A statement node.
#[derive(Clone, Debug)]
pub struct Statement {
    id:   NodeId,
    stmt: Stmt,
}

impl Statement {
    #[must_use]
    pub fn stmt(&self) -> &Stmt {
        &self.stmt
    }
}

impl ProgramNode for Statement {
    fn id(&self) -> NodeId {
        self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Statement
    }

    fn call_site(&self) -> Option<&str> {
        match &self.stmt {
            Stmt::Call { callee, .. } => Some(callee),
            _ => None,
        }
    }
}

/// An expression node, evaluated for the value of a return.
#[derive(Clone, Debug)]
pub struct ReturnExpr {
    id:    NodeId,
    value: Expr,
}

impl ProgramNode for ReturnExpr {
    fn id(&self) -> NodeId {
        self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Expression
    }
}

/// The declaration of a subroutine, found through the namespace by calls.
#[derive(Clone, Debug)]
pub struct Subroutine {
    id:   NodeId,
    name: String,
    body: Vec<NodeRef>,
}

impl Subroutine {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ProgramNode for Subroutine {
    fn id(&self) -> NodeId {
        self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Statement
    }
}

/// A control-plane table entry, concretized as `action(key)`.
#[derive(Clone, Debug)]
pub struct TableEntry {
    pub action: String,
    pub key:    ExprRef,
}

impl TestObject for TableEntry {
    fn evaluate(&self, model: &Model) -> UnlocatedResult<String> {
        Ok(format!("{}({})", self.action, evaluate(&self.key, model)?))
    }

    fn variables(&self) -> BTreeSet<Variable> {
        self.key.variables()
    }
}

/// A program of the simple target.
#[derive(Clone, Debug, Default)]
pub struct SimpleProgram {
    last_id:     Cell<NodeId>,
    pipeline:    Option<NodeRef>,
    subroutines: Vec<(String, NodeRef)>,
    defaults:    BTreeMap<String, Value>,
}

impl SimpleProgram {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the statements every execution runs, wrapped into a block that
    /// handles rejection.
    pub fn set_pipeline(&mut self, body: Vec<NodeRef>) {
        let entry = self.block(body, vec![]);
        self.pipeline = Some(entry);
    }

    /// Declares the subroutine `name`.
    pub fn add_subroutine(&mut self, name: impl Into<String>, body: Vec<NodeRef>) {
        let name = name.into();
        let id = self.allocate();
        let declaration = NodeRef::new(Subroutine {
            id,
            name: name.clone(),
            body,
        });
        self.subroutines.push((name, declaration));
    }

    /// Makes `value` the value of the variable `name` whenever no constraint
    /// determines it.
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(name.into(), value);
        self
    }

    /// Creates a statement node with a fresh identifier.
    pub fn statement(&self, stmt: Stmt) -> NodeRef {
        let id = self.allocate();
        NodeRef::new(Statement { id, stmt })
    }

    pub fn assign(&self, target: impl Into<String>, value: Expr) -> NodeRef {
        let target = target.into();
        self.statement(Stmt::Assign { target, value })
    }

    pub fn extract(&self, field: impl Into<String>, width: usize) -> NodeRef {
        let field = field.into();
        self.statement(Stmt::Extract { field, width })
    }

    pub fn emit(&self, value: Expr) -> NodeRef {
        self.statement(Stmt::Emit(value))
    }

    pub fn if_else(&self, condition: Expr, then: Vec<NodeRef>, otherwise: Vec<NodeRef>) -> NodeRef {
        self.statement(Stmt::If {
            condition,
            then,
            otherwise,
        })
    }

    pub fn block(&self, body: Vec<NodeRef>, on_reject: Vec<NodeRef>) -> NodeRef {
        self.statement(Stmt::Block { body, on_reject })
    }

    pub fn call(&self, callee: impl Into<String>) -> NodeRef {
        let callee = callee.into();
        self.statement(Stmt::Call {
            callee,
            result: None,
        })
    }

    /// Calls `callee`, binding its return value to the field `result`.
    pub fn call_into(&self, callee: impl Into<String>, result: impl Into<String>) -> NodeRef {
        let callee = callee.into();
        let result = Some(result.into());
        self.statement(Stmt::Call { callee, result })
    }

    pub fn return_void(&self) -> NodeRef {
        self.statement(Stmt::Return(None))
    }

    pub fn return_value(&self, value: Expr) -> NodeRef {
        let id = self.allocate();
        let value = NodeRef::new(ReturnExpr { id, value });
        self.statement(Stmt::Return(Some(value)))
    }

    pub fn exit(&self) -> NodeRef {
        self.statement(Stmt::Exit)
    }

    pub fn reject(&self) -> NodeRef {
        self.statement(Stmt::Reject)
    }

    pub fn assert(&self, condition: Expr, reason: impl Into<String>) -> NodeRef {
        let reason = reason.into();
        self.statement(Stmt::Assert { condition, reason })
    }

    pub fn trace(&self, label: impl Into<String>) -> NodeRef {
        let label = label.into();
        self.statement(Stmt::Trace { label, value: None })
    }

    pub fn trace_value(&self, label: impl Into<String>, value: Expr) -> NodeRef {
        let label = label.into();
        let value = Some(value);
        self.statement(Stmt::Trace { label, value })
    }

    pub fn havoc(&self, field: impl Into<String>, width: usize) -> NodeRef {
        let field = field.into();
        self.statement(Stmt::Havoc { field, width })
    }

    pub fn taint(&self, field: impl Into<String>, width: usize) -> NodeRef {
        let field = field.into();
        self.statement(Stmt::Taint { field, width })
    }

    pub fn set_property(&self, name: impl Into<String>, value: PropertyValue) -> NodeRef {
        let name = name.into();
        self.statement(Stmt::SetProperty { name, value })
    }

    pub fn table_entry(
        &self,
        table: impl Into<String>,
        action: impl Into<String>,
        key: Expr,
    ) -> NodeRef {
        let table = table.into();
        let action = action.into();
        self.statement(Stmt::TableEntry { table, action, key })
    }

    pub fn derive(&self, target: impl Into<String>, width: usize, definition: Expr) -> NodeRef {
        let target = target.into();
        self.statement(Stmt::Derive {
            target,
            width,
            definition,
        })
    }

    pub fn unsupported(&self, construct: impl Into<String>) -> NodeRef {
        self.statement(Stmt::Unsupported(construct.into()))
    }

    fn allocate(&self) -> NodeId {
        let id = self.last_id.get() + 1;
        self.last_id.set(id);
        id
    }
}

impl ProgramInfo for SimpleProgram {
    fn pipeline_sequence(&self) -> Vec<Command> {
        self.pipeline.iter().cloned().map(Command::Node).collect()
    }

    fn coverable_nodes(&self) -> CoverageSet {
        let mut nodes = CoverageSet::new();
        collect_statements(self.pipeline.iter(), &mut nodes);
        for (_, declaration) in &self.subroutines {
            if let Some(subroutine) = declaration.downcast_ref::<Subroutine>() {
                collect_statements(subroutine.body.iter(), &mut nodes);
            }
        }
        nodes
    }

    fn initial_namespace(&self) -> Namespace {
        Namespace::new().with_scope(self.subroutines.iter().cloned())
    }

    fn default_value(&self, variable: &Variable) -> Value {
        self.defaults
            .get(variable.name())
            .cloned()
            .unwrap_or_else(|| Value::zero(variable.sort()))
    }
}

/// Collects the identifiers of `statements` and of every statement nested
/// within them.
fn collect_statements<'a>(statements: impl Iterator<Item = &'a NodeRef>, into: &mut CoverageSet) {
    for node in statements {
        into.insert(node.id());
        let Some(statement) = node.downcast_ref::<Statement>() else {
            continue;
        };
        match &statement.stmt {
            Stmt::If {
                then, otherwise, ..
            } => {
                collect_statements(then.iter(), into);
                collect_statements(otherwise.iter(), into);
            }
            Stmt::Block { body, on_reject } => {
                collect_statements(body.iter(), into);
                collect_statements(on_reject.iter(), into);
            }
            _ => (),
        }
    }
}

fn nodes_of(statements: &[NodeRef]) -> CoverageSet {
    let mut nodes = CoverageSet::new();
    collect_statements(statements.iter(), &mut nodes);
    nodes
}

fn commands(statements: &[NodeRef]) -> impl Iterator<Item = Command> + '_ {
    statements.iter().cloned().map(Command::Node)
}

/// The stepper of the simple target.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleStepper;

impl SimpleStepper {
    /// Steps `stmt`, the statement with identifier `id` at the top of the
    /// body of `state`.
    fn step_stmt(state: &ExecutionState, id: NodeId, stmt: &Stmt) -> UnlocatedResult<Vec<Branch>> {
        let mut next = state.clone();

        match stmt {
            Stmt::If {
                condition,
                then,
                otherwise,
            } => {
                let condition = state.subst(&condition.lower())?;
                let mut taken = next.clone();
                taken.replace_top(commands(then));
                next.replace_top(commands(otherwise));

                let (when_taken, when_skipped) = if condition.is_tainted() {
                    (fold::tru(), fold::tru())
                } else {
                    (condition.clone(), fold::not(condition))
                };

                return Ok(vec![
                    Branch::new(when_taken, taken).with_potential(nodes_of(then)),
                    Branch::new(when_skipped, next).with_potential(nodes_of(otherwise)),
                ]);
            }
            Stmt::Block { body, on_reject } => {
                let handler: Body = iter::once(Command::Trace(TraceEvent::generic("packet rejected")))
                    .chain(commands(on_reject))
                    .collect();
                let frame = Frame::new(Body::new(), state.namespace().clone())
                    .handling(ExceptionKind::Reject, handler);
                next.push_frame(frame, commands(body).collect(), state.namespace().clone());
            }
            Stmt::Call { callee, result } => {
                let subroutine = state
                    .namespace()
                    .lookup(callee)
                    .and_then(|node| node.downcast_ref::<Subroutine>())
                    .ok_or_else(|| Error::target(format!("`{callee}` is not a subroutine")))?;
                let mut frame = Frame::new(Body::new(), state.namespace().clone());
                if let Some(result) = result {
                    frame = frame.binding_result_to(result.clone());
                }
                next.push_frame(
                    frame,
                    commands(&subroutine.body).collect(),
                    state.namespace().clone(),
                );
            }
            Stmt::Return(None) => next.replace_top([Command::Return(ReturnValue::None)]),
            Stmt::Return(Some(value)) => {
                next.replace_top([Command::Return(ReturnValue::Node(value.clone()))]);
            }
            Stmt::Exit => next.replace_top([Command::Exception(ExceptionKind::Exit)]),
            Stmt::Reject => next.replace_top([Command::Exception(ExceptionKind::Reject)]),
            Stmt::Assert { condition, reason } => {
                let guard = Guard::new(condition.lower(), reason.clone());
                next.replace_top([Command::Guard(guard)]);
            }
            Stmt::Trace { label, value } => {
                let event = match value {
                    Some(value) => TraceEvent::expression(label.clone(), value.lower()),
                    None => TraceEvent::generic(label.clone()),
                };
                next.replace_top([Command::Trace(event)]);
            }
            Stmt::SetProperty { name, value } => {
                next.replace_top([Command::PropertyUpdate {
                    name:  name.clone(),
                    value: value.clone(),
                }]);
            }
            Stmt::Unsupported(construct) => return Err(Error::unimplemented(construct.clone())),
            _ => {
                next.pop_body();
                Self::apply(&mut next, id, stmt)?;
            }
        }

        Ok(vec![Branch::unconstrained(next)])
    }

    /// Applies the effect of a statement that simply falls through.
    fn apply(next: &mut ExecutionState, id: NodeId, stmt: &Stmt) -> UnlocatedResult<()> {
        match stmt {
            Stmt::Assign { target, value } => next.set(target.clone(), value.lower())?,
            Stmt::Extract { field, width } => {
                let value = next.extract(*width);
                next.set(field.clone(), value)?;
            }
            Stmt::Emit(value) => {
                let value = next.subst(&value.lower())?;
                next.emit(value);
            }
            Stmt::Havoc { field, width } => {
                let variable = Variable::new(format!("{field}_{id}"), Sort::Bits(*width));
                let value = next.fresh_variable(variable);
                next.set(field.clone(), value)?;
            }
            Stmt::Taint { field, width } => {
                next.set(field.clone(), fold::tainted(Sort::Bits(*width)))?;
            }
            Stmt::TableEntry { table, action, key } => {
                let key = next.subst(&key.lower())?;
                let entry = TableEntry {
                    action: action.clone(),
                    key,
                };
                next.add_test_object(TABLE_ENTRY_CATEGORY, table.clone(), entry);
            }
            Stmt::Derive {
                target,
                width,
                definition,
            } => {
                let variable = Variable::new(format!("{target}_{id}"), Sort::Bits(*width));
                let definition = next.subst(&definition.lower())?;
                next.add_derived(variable.clone(), definition);
                next.set(target.clone(), fold::variable(variable))?;
            }
            _ => return Err(Error::target(format!("statement {id} does not fall through"))),
        }

        Ok(())
    }
}

impl Stepper for SimpleStepper {
    fn step_statement(
        &self,
        state: &ExecutionState,
        node: &NodeRef,
    ) -> UnlocatedResult<Vec<Branch>> {
        let statement = node
            .downcast_ref::<Statement>()
            .ok_or_else(|| Error::target(format!("node {node} is not a statement")))?;
        Self::step_stmt(state, statement.id, &statement.stmt)
    }

    fn step_expression(
        &self,
        state: &ExecutionState,
        node: &NodeRef,
    ) -> UnlocatedResult<Vec<Branch>> {
        let expression = node
            .downcast_ref::<ReturnExpr>()
            .ok_or_else(|| Error::target(format!("node {node} is not an expression")))?;
        let value = state.subst(&expression.value.lower())?;

        let mut next = state.clone();
        match state.next_command() {
            Some(Command::Return(ReturnValue::Node(_))) => {
                next.replace_top([Command::Return(ReturnValue::Symbolic(value))]);
            }
            _ => {
                next.pop_body();
            }
        }

        Ok(vec![Branch::unconstrained(next)])
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::{
        error::execution::Error,
        expr::{eval::Value, known::KnownBits},
        final_state::FinalState,
        program::ProgramInfo,
        solver::EnumerativeSolver,
        state::property::PropertyValue,
        strategy::{Config, ExplorationStrategy, Explorer, IncrementalStack},
        target::simple::{Expr, SimpleProgram, SimpleStepper, TABLE_ENTRY_CATEGORY},
        watchdog::LazyWatchdog,
    };

    fn explore(program: SimpleProgram, config: Config) -> anyhow::Result<Vec<FinalState>> {
        let explorer = Explorer::new(
            Rc::new(program),
            Box::new(SimpleStepper),
            Box::new(EnumerativeSolver::new()),
            config.with_seed(11),
            LazyWatchdog.in_rc(),
        );
        let mut strategy = IncrementalStack::new(explorer);
        let mut tests = Vec::new();
        strategy.run(&mut |state| {
            tests.push(state.clone());
            false
        })?;
        Ok(tests)
    }

    #[test]
    fn binds_the_return_value_of_a_call() -> anyhow::Result<()> {
        let mut program = SimpleProgram::new();
        let body = vec![program.return_value(Expr::add(
            Expr::field("ttl", 8),
            Expr::bits(1, 8),
        ))];
        program.add_subroutine("increment", body);
        let pipeline = vec![
            program.assign("ttl", Expr::bits(63, 8)),
            program.call_into("increment", "ttl"),
            program.emit(Expr::field("ttl", 8)),
        ];
        program.set_pipeline(pipeline);

        let tests = explore(program, Config::default())?;
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].output_packet(), &KnownBits::from_u128(64, 8));
        assert!(tests[0].state().stack().is_empty());

        Ok(())
    }

    #[test]
    fn rejection_skips_the_rest_of_the_pipeline() -> anyhow::Result<()> {
        let mut program = SimpleProgram::new();
        let pipeline = vec![
            program.reject(),
            program.emit(Expr::bits(0xff, 8)),
        ];
        program.set_pipeline(pipeline);

        let tests = explore(program, Config::default())?;
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].trace(), &["packet rejected".to_string()]);
        assert_eq!(tests[0].output_packet().width(), 0);

        Ok(())
    }

    #[test]
    fn exit_ends_the_path_inside_a_subroutine() -> anyhow::Result<()> {
        let mut program = SimpleProgram::new();
        let body = vec![program.exit(), program.trace("unreachable")];
        program.add_subroutine("stop", body);
        let pipeline = vec![program.call("stop"), program.trace("after")];
        program.set_pipeline(pipeline);

        let tests = explore(program, Config::default())?;
        assert_eq!(tests.len(), 1);
        assert!(tests[0].trace().is_empty());

        Ok(())
    }

    #[test]
    fn records_table_entries_and_derived_values() -> anyhow::Result<()> {
        let mut program = SimpleProgram::new();
        let pipeline = vec![
            program.extract("dst", 8),
            program.assert(Expr::eq(Expr::field("dst", 8), Expr::bits(7, 8)), "dst"),
            program.table_entry("forward", "set_port", Expr::field("dst", 8)),
            program.derive(
                "checksum",
                8,
                Expr::add(Expr::field("dst", 8), Expr::bits(1, 8)),
            ),
            program.emit(Expr::field("checksum", 8)),
            program.set_property("forwarded", PropertyValue::Bool(true)),
        ];
        program.set_pipeline(pipeline);

        let tests = explore(program, Config::default())?;
        assert_eq!(tests.len(), 1);
        let test = &tests[0];
        assert_eq!(test.input_packet(), &KnownBits::from_u128(7, 8));
        assert_eq!(test.output_packet(), &KnownBits::from_u128(8, 8));
        assert_eq!(test.test_objects().len(), 1);
        assert_eq!(test.test_objects()[0].category, TABLE_ENTRY_CATEGORY);
        assert_eq!(test.test_objects()[0].label, "forward");
        assert_eq!(test.test_objects()[0].value, "set_port(8w0x07)");
        assert!(test.state().properties().get_bool("forwarded")?);

        Ok(())
    }

    #[test]
    fn unconstrained_inputs_take_program_defaults() -> anyhow::Result<()> {
        let mut program = SimpleProgram::new()
            .with_default("port_1", Value::Bits(KnownBits::from_u128(3, 9)));
        let pipeline = vec![program.havoc("port", 9), program.trace_value("port", Expr::field("port", 9))];
        program.set_pipeline(pipeline);

        let tests = explore(program, Config::default())?;
        assert_eq!(tests[0].trace(), &["port: 9w0x0003".to_string()]);

        Ok(())
    }

    #[test]
    fn unsupported_constructs_are_skipped_unless_strict() -> anyhow::Result<()> {
        let build = || {
            let mut program = SimpleProgram::new();
            let pipeline = vec![program.unsupported("register read")];
            program.set_pipeline(pipeline);
            program
        };

        assert!(explore(build(), Config::default())?.is_empty());

        let result = explore(build(), Config::default().with_strict(true));
        let error = result
            .err()
            .and_then(|e| e.downcast::<crate::error::execution::LocatedError>().ok())
            .map(|e| e.payload);
        assert!(matches!(error, Some(Error::Unimplemented { .. })));

        Ok(())
    }

    #[test]
    fn covers_nested_statements() {
        let mut program = SimpleProgram::new();
        let nested = program.if_else(Expr::boolean(true), vec![program.exit()], vec![]);
        program.set_pipeline(vec![nested]);

        assert_eq!(program.coverable_nodes().len(), 3);
    }
}
