//! This module contains the opaque handle through which the core refers to
//! nodes of the program under test, and the [`ProgramInfo`] contract through
//! which a target describes that program.
//!
//! The core never inspects a node beyond its [`ProgramNode`] interface. The
//! target's steppers downcast nodes back to their concrete types.

use std::{
    any::Any,
    fmt::{Debug, Display, Formatter},
    rc::Rc,
};

use downcast_rs::{impl_downcast, Downcast};

use crate::{
    continuation::{Command, Namespace},
    coverage::CoverageSet,
    expr::{eval::Value, Variable},
};

/// The identifier of a program node, unique within one program.
pub type NodeId = u64;

/// Whether a node is executed for its effect or evaluated for its value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NodeKind {
    Statement,
    Expression,
}

/// A node of the program under test.
///
/// # Self Bounds
///
/// [`Any`] and [`Downcast`] allow steppers to recover the concrete node type
/// from a [`NodeRef`], while [`Debug`] aids in diagnostics.
pub trait ProgramNode
where
    Self: Any + Debug + Downcast,
{
    /// Gets the identifier of the node.
    fn id(&self) -> NodeId;

    /// Gets whether the node is a statement or an expression.
    fn kind(&self) -> NodeKind;

    /// Gets the call-site label of the node, if it is a call site that a
    /// reachability engine may track.
    fn call_site(&self) -> Option<&str> {
        None
    }
}

impl_downcast!(ProgramNode);

/// A shared handle to a [`ProgramNode`].
///
/// Two handles are equal when their nodes have the same identifier.
#[derive(Clone, Debug)]
pub struct NodeRef {
    node: Rc<dyn ProgramNode>,
}

impl NodeRef {
    /// Wraps `node` into a shared handle.
    pub fn new(node: impl ProgramNode) -> Self {
        let node = Rc::new(node);
        Self { node }
    }

    /// Gets the identifier of the node.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Gets the kind of the node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    /// Gets the call-site label of the node, if any.
    #[must_use]
    pub fn call_site(&self) -> Option<&str> {
        self.node.call_site()
    }

    /// Gets the node as the concrete type `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: ProgramNode>(&self) -> Option<&T> {
        self.node.as_ref().as_any().downcast_ref::<T>()
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for NodeRef {}

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.id())
    }
}

/// The information a target supplies about the program under test.
pub trait ProgramInfo
where
    Self: Debug,
{
    /// Gets the commands with which every execution starts.
    fn pipeline_sequence(&self) -> Vec<Command>;

    /// Gets every node whose execution counts towards coverage.
    fn coverable_nodes(&self) -> CoverageSet;

    /// Gets the declarations visible when execution starts.
    fn initial_namespace(&self) -> Namespace {
        Namespace::new()
    }

    /// Gets the value given to `variable` when no constraint determines it.
    fn default_value(&self, variable: &Variable) -> Value {
        Value::zero(variable.sort())
    }
}

#[cfg(test)]
mod test {
    use crate::program::{NodeId, NodeKind, NodeRef, ProgramNode};

    #[derive(Debug)]
    struct Probe(NodeId);

    impl ProgramNode for Probe {
        fn id(&self) -> NodeId {
            self.0
        }

        fn kind(&self) -> NodeKind {
            NodeKind::Statement
        }
    }

    #[derive(Debug)]
    struct Other;

    impl ProgramNode for Other {
        fn id(&self) -> NodeId {
            0
        }

        fn kind(&self) -> NodeKind {
            NodeKind::Expression
        }
    }

    #[test]
    fn downcasts_to_the_concrete_node() {
        let node = NodeRef::new(Probe(4));

        assert_eq!(node.downcast_ref::<Probe>().map(|p| p.0), Some(4));
        assert!(node.downcast_ref::<Other>().is_none());
        assert_eq!(node.call_site(), None);
    }

    #[test]
    fn compares_by_identifier() {
        assert_eq!(NodeRef::new(Probe(1)), NodeRef::new(Probe(1)));
        assert_ne!(NodeRef::new(Probe(1)), NodeRef::new(Probe(2)));
    }
}
