//! This module contains the symbolic expression language in which path
//! constraints, environment bindings, packet buffers and trace payloads are
//! written.
//!
//! Expressions are immutable and shared through [`ExprRef`], so cloning an
//! execution state never copies expression trees. New expressions should be
//! built with the smart constructors in [`fold`], which constant-fold
//! wherever the operands allow it.

pub mod eval;
pub mod fold;
pub mod known;

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    rc::Rc,
};

use crate::{error::execution::UnlocatedResult, expr::known::KnownBits};

/// A shared, immutable expression.
pub type ExprRef = Rc<Expr>;

/// The type of an expression.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Sort {
    /// A boolean.
    Bool,

    /// A bit-vector of the contained width.
    Bits(usize),
}

impl Sort {
    /// Gets the width of a bit-vector sort, treating booleans as one bit wide.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Self::Bool => 1,
            Self::Bits(width) => *width,
        }
    }
}

impl Display for Sort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Bits(width) => write!(f, "bit<{width}>"),
        }
    }
}

/// A free symbolic variable, to which the solver assigns a value.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Variable {
    name: String,
    sort: Sort,
}

impl Variable {
    /// Creates a new variable called `name` of the provided `sort`.
    #[must_use]
    pub fn new(name: impl Into<String>, sort: Sort) -> Self {
        let name = name.into();
        Self { name, sort }
    }

    /// Gets the name of the variable.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the sort of the variable.
    #[must_use]
    pub fn sort(&self) -> Sort {
        self.sort
    }
}

/// A symbolic expression.
///
/// Binary bit-vector operators require operands of equal width. Comparisons
/// are unsigned.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Expr {
    /// A boolean literal.
    Bool(bool),

    /// A bit-vector constant.
    Const(KnownBits),

    /// A free symbolic variable.
    Var(Variable),

    /// A reference to a state variable, resolved through the symbolic
    /// environment before it reaches the solver.
    StateRef { name: String, sort: Sort },

    /// A value that the target marks as unconstrainable, for example the
    /// contents of uninitialized memory.
    Tainted { sort: Sort },

    Not(ExprRef),
    And(ExprRef, ExprRef),
    Or(ExprRef, ExprRef),
    Eq(ExprRef, ExprRef),
    Ult(ExprRef, ExprRef),
    Ule(ExprRef, ExprRef),

    Add(ExprRef, ExprRef),
    Sub(ExprRef, ExprRef),
    Mul(ExprRef, ExprRef),
    BitAnd(ExprRef, ExprRef),
    BitOr(ExprRef, ExprRef),
    BitXor(ExprRef, ExprRef),
    BitNot(ExprRef),

    /// `high` concatenated above `low`.
    Concat { high: ExprRef, low: ExprRef },

    /// The bits from `high` down to `low` inclusive, counted from the least
    /// significant bit.
    Slice {
        value: ExprRef,
        high:  usize,
        low:   usize,
    },

    /// If-then-else.
    Ite {
        cond:      ExprRef,
        then:      ExprRef,
        otherwise: ExprRef,
    },
}

impl Expr {
    /// Gets the sort of the expression.
    #[must_use]
    pub fn sort(&self) -> Sort {
        match self {
            Self::Bool(_)
            | Self::Not(_)
            | Self::And(..)
            | Self::Or(..)
            | Self::Eq(..)
            | Self::Ult(..)
            | Self::Ule(..) => Sort::Bool,
            Self::Const(value) => Sort::Bits(value.width()),
            Self::Var(variable) => variable.sort(),
            Self::StateRef { sort, .. } | Self::Tainted { sort } => *sort,
            Self::Add(left, _)
            | Self::Sub(left, _)
            | Self::Mul(left, _)
            | Self::BitAnd(left, _)
            | Self::BitOr(left, _)
            | Self::BitXor(left, _)
            | Self::BitNot(left) => left.sort(),
            Self::Concat { high, low } => Sort::Bits(high.sort().width() + low.sort().width()),
            Self::Slice { high, low, .. } => Sort::Bits(high - low + 1),
            Self::Ite { then, .. } => then.sort(),
        }
    }

    /// Gets the literal value of the expression if it is a boolean literal.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Gets the constant value of the expression if it is a bit-vector
    /// constant.
    #[must_use]
    pub fn as_const(&self) -> Option<&KnownBits> {
        match self {
            Self::Const(value) => Some(value),
            _ => None,
        }
    }

    /// Checks if the expression contains no variables or state references.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        matches!(self, Self::Bool(_) | Self::Const(_))
    }

    /// Gets the direct children of this expression.
    #[must_use]
    pub fn children(&self) -> Vec<&ExprRef> {
        match self {
            Self::Bool(_)
            | Self::Const(_)
            | Self::Var(_)
            | Self::StateRef { .. }
            | Self::Tainted { .. } => vec![],
            Self::Not(inner) | Self::BitNot(inner) | Self::Slice { value: inner, .. } => {
                vec![inner]
            }
            Self::And(l, r)
            | Self::Or(l, r)
            | Self::Eq(l, r)
            | Self::Ult(l, r)
            | Self::Ule(l, r)
            | Self::Add(l, r)
            | Self::Sub(l, r)
            | Self::Mul(l, r)
            | Self::BitAnd(l, r)
            | Self::BitOr(l, r)
            | Self::BitXor(l, r)
            | Self::Concat { high: l, low: r } => vec![l, r],
            Self::Ite {
                cond,
                then,
                otherwise,
            } => vec![cond, then, otherwise],
        }
    }

    /// Checks if any part of the expression is tainted.
    #[must_use]
    pub fn is_tainted(&self) -> bool {
        match self {
            Self::Tainted { .. } => true,
            _ => self.children().into_iter().any(|child| child.is_tainted()),
        }
    }

    /// Collects every free variable that occurs in the expression.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut variables = BTreeSet::new();
        self.collect_variables(&mut variables);
        variables
    }

    /// Adds every free variable that occurs in the expression to `into`.
    pub fn collect_variables(&self, into: &mut BTreeSet<Variable>) {
        match self {
            Self::Var(variable) => {
                into.insert(variable.clone());
            }
            _ => self
                .children()
                .into_iter()
                .for_each(|child| child.collect_variables(into)),
        }
    }

    /// Collects every constant bit-vector that occurs in the expression.
    #[must_use]
    pub fn constants(&self) -> Vec<KnownBits> {
        match self {
            Self::Const(value) => vec![value.clone()],
            _ => self
                .children()
                .into_iter()
                .flat_map(|child| child.constants())
                .collect(),
        }
    }

    /// Rebuilds `expr` bottom-up, replacing every leaf for which `leaf`
    /// returns a replacement and re-folding every interior node.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `leaf` does.
    pub fn rebuild(
        expr: &ExprRef,
        leaf: &mut impl FnMut(&Expr) -> UnlocatedResult<Option<ExprRef>>,
    ) -> UnlocatedResult<ExprRef> {
        let rebuilt = match expr.as_ref() {
            Self::Bool(_)
            | Self::Const(_)
            | Self::Var(_)
            | Self::StateRef { .. }
            | Self::Tainted { .. } => return Ok(leaf(expr)?.unwrap_or_else(|| expr.clone())),
            Self::Not(inner) => fold::not(Self::rebuild(inner, leaf)?),
            Self::BitNot(inner) => fold::bit_not(Self::rebuild(inner, leaf)?),
            Self::And(l, r) => fold::and(Self::rebuild(l, leaf)?, Self::rebuild(r, leaf)?),
            Self::Or(l, r) => fold::or(Self::rebuild(l, leaf)?, Self::rebuild(r, leaf)?),
            Self::Eq(l, r) => fold::eq(Self::rebuild(l, leaf)?, Self::rebuild(r, leaf)?),
            Self::Ult(l, r) => fold::ult(Self::rebuild(l, leaf)?, Self::rebuild(r, leaf)?),
            Self::Ule(l, r) => fold::ule(Self::rebuild(l, leaf)?, Self::rebuild(r, leaf)?),
            Self::Add(l, r) => fold::add(Self::rebuild(l, leaf)?, Self::rebuild(r, leaf)?),
            Self::Sub(l, r) => fold::sub(Self::rebuild(l, leaf)?, Self::rebuild(r, leaf)?),
            Self::Mul(l, r) => fold::mul(Self::rebuild(l, leaf)?, Self::rebuild(r, leaf)?),
            Self::BitAnd(l, r) => fold::bit_and(Self::rebuild(l, leaf)?, Self::rebuild(r, leaf)?),
            Self::BitOr(l, r) => fold::bit_or(Self::rebuild(l, leaf)?, Self::rebuild(r, leaf)?),
            Self::BitXor(l, r) => fold::bit_xor(Self::rebuild(l, leaf)?, Self::rebuild(r, leaf)?),
            Self::Concat { high, low } => {
                fold::concat(Self::rebuild(high, leaf)?, Self::rebuild(low, leaf)?)
            }
            Self::Slice { value, high, low } => fold::slice(Self::rebuild(value, leaf)?, *high, *low),
            Self::Ite {
                cond,
                then,
                otherwise,
            } => fold::ite(
                Self::rebuild(cond, leaf)?,
                Self::rebuild(then, leaf)?,
                Self::rebuild(otherwise, leaf)?,
            ),
        };

        Ok(rebuilt)
    }

    /// Re-folds the whole of `expr`.
    #[must_use]
    pub fn simplify(expr: &ExprRef) -> ExprRef {
        // The leaf function never fails, so neither does the rebuild.
        Self::rebuild(expr, &mut |_| Ok(None)).unwrap_or_else(|_| expr.clone())
    }
}

/// Displays the expression in an infix notation intended for traces and
/// diagnostics.
impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Const(value) => write!(f, "{value}"),
            Self::Var(variable) => write!(f, "{}", variable.name()),
            Self::StateRef { name, .. } => write!(f, "{name}"),
            Self::Tainted { sort } => write!(f, "<tainted {sort}>"),
            Self::Not(inner) => write!(f, "!{inner}"),
            Self::BitNot(inner) => write!(f, "~{inner}"),
            Self::And(l, r) => write!(f, "({l} && {r})"),
            Self::Or(l, r) => write!(f, "({l} || {r})"),
            Self::Eq(l, r) => write!(f, "({l} == {r})"),
            Self::Ult(l, r) => write!(f, "({l} < {r})"),
            Self::Ule(l, r) => write!(f, "({l} <= {r})"),
            Self::Add(l, r) => write!(f, "({l} + {r})"),
            Self::Sub(l, r) => write!(f, "({l} - {r})"),
            Self::Mul(l, r) => write!(f, "({l} * {r})"),
            Self::BitAnd(l, r) => write!(f, "({l} & {r})"),
            Self::BitOr(l, r) => write!(f, "({l} | {r})"),
            Self::BitXor(l, r) => write!(f, "({l} ^ {r})"),
            Self::Concat { high, low } => write!(f, "({high} ++ {low})"),
            Self::Slice { value, high, low } => write!(f, "{value}[{high}:{low}]"),
            Self::Ite {
                cond,
                then,
                otherwise,
            } => write!(f, "({cond} ? {then} : {otherwise})"),
        }
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::expr::{fold, Expr, Sort, Variable};

    #[test]
    fn computes_sorts() {
        let x = fold::var("x", Sort::Bits(8));
        let y = fold::var("y", Sort::Bits(4));

        assert_eq!(fold::concat(x.clone(), y.clone()).sort(), Sort::Bits(12));
        assert_eq!(fold::slice(x.clone(), 6, 3).sort(), Sort::Bits(4));
        assert_eq!(fold::eq(x.clone(), x).sort(), Sort::Bool);
        assert_eq!(fold::bit_not(y).sort(), Sort::Bits(4));
    }

    #[test]
    fn collects_variables_and_taint() {
        let x = fold::var("x", Sort::Bits(8));
        let t = fold::tainted(Sort::Bits(8));
        let expr = fold::add(x, t);

        assert!(expr.is_tainted());
        assert_eq!(
            expr.variables().into_iter().collect::<Vec<_>>(),
            vec![Variable::new("x", Sort::Bits(8))]
        );
    }

    #[test]
    fn rebuild_substitutes_and_folds() -> anyhow::Result<()> {
        let state = Rc::new(Expr::StateRef {
            name: "meta.port".into(),
            sort: Sort::Bits(8),
        });
        let expr = fold::eq(state, fold::bits(3, 8));

        let rebuilt = Expr::rebuild(&expr, &mut |leaf| {
            Ok(match leaf {
                Expr::StateRef { .. } => Some(fold::bits(3, 8)),
                _ => None,
            })
        })?;

        assert_eq!(rebuilt.as_bool(), Some(true));

        Ok(())
    }

    #[test]
    fn displays_infix() {
        let x = fold::var("x", Sort::Bits(8));
        let expr = fold::ult(x, fold::bits(10, 8));
        assert_eq!(expr.to_string(), "(x < 8w0x0a)");
    }
}
