//! Smart constructors for [`Expr`] that fold constants as they build.
//!
//! None of these constructors fail. Operations on constants that cannot be
//! folded (mismatched widths, multiplication beyond the arithmetic width) are
//! left symbolic, and evaluation reports the problem instead.

use std::rc::Rc;

use crate::expr::{known::KnownBits, Expr, ExprRef, Sort, Variable};

/// A boolean literal.
#[must_use]
pub fn bool_lit(value: bool) -> ExprRef {
    Rc::new(Expr::Bool(value))
}

/// The literal `true`.
#[must_use]
pub fn tru() -> ExprRef {
    bool_lit(true)
}

/// The literal `false`.
#[must_use]
pub fn fals() -> ExprRef {
    bool_lit(false)
}

/// A bit-vector constant.
#[must_use]
pub fn constant(value: KnownBits) -> ExprRef {
    Rc::new(Expr::Const(value))
}

/// A `width`-bit constant holding `value`.
#[must_use]
pub fn bits(value: u128, width: usize) -> ExprRef {
    constant(KnownBits::from_u128(value, width))
}

/// The empty bit-vector.
#[must_use]
pub fn empty() -> ExprRef {
    constant(KnownBits::empty())
}

/// A free variable.
#[must_use]
pub fn var(name: impl Into<String>, sort: Sort) -> ExprRef {
    Rc::new(Expr::Var(Variable::new(name, sort)))
}

/// A free variable from an existing [`Variable`].
#[must_use]
pub fn variable(variable: Variable) -> ExprRef {
    Rc::new(Expr::Var(variable))
}

/// A reference to the state variable `name`.
#[must_use]
pub fn state_ref(name: impl Into<String>, sort: Sort) -> ExprRef {
    Rc::new(Expr::StateRef {
        name: name.into(),
        sort,
    })
}

/// An unconstrainable value.
#[must_use]
pub fn tainted(sort: Sort) -> ExprRef {
    Rc::new(Expr::Tainted { sort })
}

#[must_use]
pub fn not(inner: ExprRef) -> ExprRef {
    match inner.as_ref() {
        Expr::Bool(value) => bool_lit(!value),
        Expr::Not(nested) => nested.clone(),
        _ => Rc::new(Expr::Not(inner)),
    }
}

#[must_use]
pub fn and(left: ExprRef, right: ExprRef) -> ExprRef {
    match (left.as_bool(), right.as_bool()) {
        (Some(false), _) | (_, Some(false)) => fals(),
        (Some(true), _) => right,
        (_, Some(true)) => left,
        _ if left == right => left,
        _ => Rc::new(Expr::And(left, right)),
    }
}

#[must_use]
pub fn or(left: ExprRef, right: ExprRef) -> ExprRef {
    match (left.as_bool(), right.as_bool()) {
        (Some(true), _) | (_, Some(true)) => tru(),
        (Some(false), _) => right,
        (_, Some(false)) => left,
        _ if left == right => left,
        _ => Rc::new(Expr::Or(left, right)),
    }
}

/// Conjoins all of `terms`, yielding `true` when there are none.
#[must_use]
pub fn all(terms: impl IntoIterator<Item = ExprRef>) -> ExprRef {
    terms.into_iter().fold(tru(), and)
}

#[must_use]
pub fn eq(left: ExprRef, right: ExprRef) -> ExprRef {
    match (left.as_ref(), right.as_ref()) {
        (Expr::Bool(l), Expr::Bool(r)) => bool_lit(l == r),
        (Expr::Const(l), Expr::Const(r)) if l.width() == r.width() => bool_lit(l == r),
        _ if left == right && !left.is_tainted() => tru(),
        _ => Rc::new(Expr::Eq(left, right)),
    }
}

#[must_use]
pub fn ne(left: ExprRef, right: ExprRef) -> ExprRef {
    not(eq(left, right))
}

#[must_use]
pub fn ult(left: ExprRef, right: ExprRef) -> ExprRef {
    if let (Expr::Const(l), Expr::Const(r)) = (left.as_ref(), right.as_ref()) {
        if let Ok(result) = l.ult(r) {
            return bool_lit(result);
        }
    }
    Rc::new(Expr::Ult(left, right))
}

#[must_use]
pub fn ule(left: ExprRef, right: ExprRef) -> ExprRef {
    if let (Expr::Const(l), Expr::Const(r)) = (left.as_ref(), right.as_ref()) {
        if let Ok(result) = l.ule(r) {
            return bool_lit(result);
        }
    }
    Rc::new(Expr::Ule(left, right))
}

#[must_use]
pub fn add(left: ExprRef, right: ExprRef) -> ExprRef {
    if right.as_const().is_some_and(KnownBits::is_zero) {
        return left;
    }
    fold_binary(left, right, KnownBits::add, Expr::Add)
}

#[must_use]
pub fn sub(left: ExprRef, right: ExprRef) -> ExprRef {
    if right.as_const().is_some_and(KnownBits::is_zero) {
        return left;
    }
    fold_binary(left, right, KnownBits::sub, Expr::Sub)
}

#[must_use]
pub fn mul(left: ExprRef, right: ExprRef) -> ExprRef {
    fold_binary(left, right, KnownBits::mul, Expr::Mul)
}

#[must_use]
pub fn bit_and(left: ExprRef, right: ExprRef) -> ExprRef {
    fold_binary(left, right, KnownBits::bit_and, Expr::BitAnd)
}

#[must_use]
pub fn bit_or(left: ExprRef, right: ExprRef) -> ExprRef {
    fold_binary(left, right, KnownBits::bit_or, Expr::BitOr)
}

#[must_use]
pub fn bit_xor(left: ExprRef, right: ExprRef) -> ExprRef {
    fold_binary(left, right, KnownBits::bit_xor, Expr::BitXor)
}

#[must_use]
pub fn bit_not(inner: ExprRef) -> ExprRef {
    match inner.as_ref() {
        Expr::Const(value) => constant(value.bit_not()),
        Expr::BitNot(nested) => nested.clone(),
        _ => Rc::new(Expr::BitNot(inner)),
    }
}

/// Concatenates `low` below `high`. Zero-width operands disappear.
#[must_use]
pub fn concat(high: ExprRef, low: ExprRef) -> ExprRef {
    if high.sort() == Sort::Bits(0) {
        return low;
    }
    if low.sort() == Sort::Bits(0) {
        return high;
    }
    match (high.as_ref(), low.as_ref()) {
        (Expr::Const(h), Expr::Const(l)) => constant(h.concat(l)),
        _ => Rc::new(Expr::Concat { high, low }),
    }
}

/// Extracts bits `high` down to `low` of `value`.
///
/// Slices of concatenations are pushed into the operand they fall within, so
/// that fields extracted from a packet buffer come out as the variables that
/// were appended to it.
#[must_use]
pub fn slice(value: ExprRef, high: usize, low: usize) -> ExprRef {
    let width = value.sort().width();
    if low == 0 && high + 1 == width {
        return value;
    }

    match value.as_ref() {
        Expr::Const(known) => {
            if let Ok(sliced) = known.slice(high, low) {
                return constant(sliced);
            }
        }
        Expr::Concat {
            high: upper,
            low: lower,
        } => {
            let lower_width = lower.sort().width();
            if high < lower_width {
                return slice(lower.clone(), high, low);
            }
            if low >= lower_width {
                return slice(upper.clone(), high - lower_width, low - lower_width);
            }
        }
        Expr::Slice {
            value: inner,
            low: inner_low,
            ..
        } => return slice(inner.clone(), high + inner_low, low + inner_low),
        _ => (),
    }

    Rc::new(Expr::Slice { value, high, low })
}

#[must_use]
pub fn ite(cond: ExprRef, then: ExprRef, otherwise: ExprRef) -> ExprRef {
    match cond.as_bool() {
        Some(true) => then,
        Some(false) => otherwise,
        None if then == otherwise => then,
        None => Rc::new(Expr::Ite {
            cond,
            then,
            otherwise,
        }),
    }
}

fn fold_binary(
    left: ExprRef,
    right: ExprRef,
    op: impl Fn(&KnownBits, &KnownBits) -> Result<KnownBits, crate::error::execution::Error>,
    build: impl Fn(ExprRef, ExprRef) -> Expr,
) -> ExprRef {
    if let (Expr::Const(l), Expr::Const(r)) = (left.as_ref(), right.as_ref()) {
        if let Ok(result) = op(l, r) {
            return constant(result);
        }
    }
    Rc::new(build(left, right))
}
