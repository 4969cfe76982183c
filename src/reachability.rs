//! This module contains the optional reachability filter, which prunes paths
//! that cannot match a tracked pattern of call sites.
//!
//! An engine is an automaton over program nodes. Each state carries an
//! immutable cursor into the automaton, which the evaluator advances whenever
//! the state executes a node the engine tracks.

use std::{any::Any, collections::BTreeMap, fmt::Debug, rc::Rc};

use downcast_rs::{impl_downcast, Downcast};

use crate::{
    error::execution::{Error, UnlocatedResult},
    expr::ExprRef,
    program::NodeRef,
};

/// A position in a reachability automaton.
pub trait ReachabilityCursor
where
    Self: Any + Debug + Downcast,
{
}

impl_downcast!(ReachabilityCursor);

/// A shared, immutable cursor.
pub type DynCursor = Rc<dyn ReachabilityCursor>;

/// The outcome of advancing a cursor over a node.
#[derive(Clone, Debug)]
pub struct ReachabilityStep {
    /// Whether the path can still match the pattern.
    pub success: bool,

    /// A constraint the path must additionally satisfy, if any.
    pub constraint: Option<ExprRef>,

    /// The cursor after the node.
    pub cursor: DynCursor,
}

/// The interface to a reachability automaton.
pub trait ReachabilityEngine
where
    Self: Debug,
{
    /// Gets the cursor for the start of every execution.
    fn initial_cursor(&self) -> DynCursor;

    /// Checks whether `node` is one of the call sites the engine tracks.
    fn tracks(&self, node: &NodeRef) -> bool;

    /// Advances `cursor` over the tracked `node`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `cursor` does not belong to this engine.
    fn next(&self, cursor: &DynCursor, node: &NodeRef) -> UnlocatedResult<ReachabilityStep>;
}

/// A dynamically dispatched [`ReachabilityEngine`].
pub type DynReachabilityEngine = Rc<dyn ReachabilityEngine>;

/// An engine that requires the tracked call sites to be reached in the order
/// of a pattern.
///
/// Nodes whose call site is not in the pattern are not tracked. Once the
/// whole pattern has been matched, every further call site is accepted.
#[derive(Clone, Debug, Default)]
pub struct CallSequenceEngine {
    pattern:     Vec<String>,
    constraints: BTreeMap<usize, ExprRef>,
}

/// The number of pattern labels matched so far.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CallSequenceCursor {
    pub position: usize,
}

impl ReachabilityCursor for CallSequenceCursor {}

impl CallSequenceEngine {
    /// Creates an engine over the ordered `pattern` of call-site labels.
    pub fn new(pattern: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let pattern = pattern.into_iter().map(Into::into).collect();
        let constraints = BTreeMap::new();
        Self {
            pattern,
            constraints,
        }
    }

    /// Requires `constraint` to hold on every path that matches the pattern
    /// element at `position`.
    #[must_use]
    pub fn with_constraint(mut self, position: usize, constraint: ExprRef) -> Self {
        self.constraints.insert(position, constraint);
        self
    }

    /// Gets the pattern.
    #[must_use]
    pub fn pattern(&self) -> &[String] {
        &self.pattern
    }
}

impl ReachabilityEngine for CallSequenceEngine {
    fn initial_cursor(&self) -> DynCursor {
        Rc::new(CallSequenceCursor { position: 0 })
    }

    fn tracks(&self, node: &NodeRef) -> bool {
        node.call_site()
            .is_some_and(|site| self.pattern.iter().any(|label| label == site))
    }

    fn next(&self, cursor: &DynCursor, node: &NodeRef) -> UnlocatedResult<ReachabilityStep> {
        let position = cursor
            .as_ref()
            .as_any()
            .downcast_ref::<CallSequenceCursor>()
            .map(|c| c.position)
            .ok_or_else(|| Error::target("A foreign cursor was passed to the call sequence engine"))?;

        let step = match self.pattern.get(position) {
            None => ReachabilityStep {
                success:    true,
                constraint: None,
                cursor:     cursor.clone(),
            },
            Some(expected) if node.call_site() == Some(expected.as_str()) => ReachabilityStep {
                success:    true,
                constraint: self.constraints.get(&position).cloned(),
                cursor:     Rc::new(CallSequenceCursor {
                    position: position + 1,
                }),
            },
            Some(_) => ReachabilityStep {
                success:    false,
                constraint: None,
                cursor:     cursor.clone(),
            },
        };

        Ok(step)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        program::{NodeId, NodeKind, NodeRef, ProgramNode},
        reachability::{CallSequenceCursor, CallSequenceEngine, ReachabilityEngine},
    };

    #[derive(Debug)]
    struct Site(NodeId, &'static str);

    impl ProgramNode for Site {
        fn id(&self) -> NodeId {
            self.0
        }

        fn kind(&self) -> NodeKind {
            NodeKind::Statement
        }

        fn call_site(&self) -> Option<&str> {
            Some(self.1)
        }
    }

    #[test]
    fn advances_through_the_pattern_in_order() -> anyhow::Result<()> {
        let engine = CallSequenceEngine::new(["parse", "route"]);
        let parse = NodeRef::new(Site(1, "parse"));
        let route = NodeRef::new(Site(2, "route"));
        let log = NodeRef::new(Site(3, "log"));

        assert!(!engine.tracks(&log));
        assert!(engine.tracks(&parse));

        let first = engine.next(&engine.initial_cursor(), &parse)?;
        assert!(first.success);
        let second = engine.next(&first.cursor, &route)?;
        assert!(second.success);
        assert_eq!(
            second
                .cursor
                .as_ref()
                .as_any()
                .downcast_ref::<CallSequenceCursor>()
                .map(|c| c.position),
            Some(2)
        );

        Ok(())
    }

    #[test]
    fn fails_paths_that_skip_ahead() -> anyhow::Result<()> {
        let engine = CallSequenceEngine::new(["parse", "route"]);
        let route = NodeRef::new(Site(2, "route"));

        let step = engine.next(&engine.initial_cursor(), &route)?;
        assert!(!step.success);

        Ok(())
    }
}
