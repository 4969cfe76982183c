//! This module contains the concrete evaluation of expressions under a
//! [`Model`].

use std::fmt::{Display, Formatter};

use crate::{
    error::execution::{Error, UnlocatedResult},
    expr::{known::KnownBits, Expr, Sort},
    solver::model::Model,
};

/// A concrete value of either sort.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Value {
    Bool(bool),
    Bits(KnownBits),
}

impl Value {
    /// The default value of `sort`: `false` or all-zero bits.
    #[must_use]
    pub fn zero(sort: Sort) -> Self {
        match sort {
            Sort::Bool => Self::Bool(false),
            Sort::Bits(width) => Self::Bits(KnownBits::zero(width)),
        }
    }

    /// Gets the sort of the value.
    #[must_use]
    pub fn sort(&self) -> Sort {
        match self {
            Self::Bool(_) => Sort::Bool,
            Self::Bits(bits) => Sort::Bits(bits.width()),
        }
    }

    /// Gets the value as a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is a bit-vector.
    pub fn as_bool(&self) -> UnlocatedResult<bool> {
        match self {
            Self::Bool(value) => Ok(*value),
            Self::Bits(bits) => Err(type_mismatch(Sort::Bool, Sort::Bits(bits.width()))),
        }
    }

    /// Gets the value as a bit-vector.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is a boolean.
    pub fn as_bits(&self) -> UnlocatedResult<&KnownBits> {
        match self {
            Self::Bits(bits) => Ok(bits),
            Self::Bool(_) => Err(Error::TypeMismatch {
                expected: "bit-vector".into(),
                found:    Sort::Bool.to_string(),
            }),
        }
    }

    /// Consumes the value into a bit-vector, converting booleans to one bit.
    #[must_use]
    pub fn into_bits(self) -> KnownBits {
        match self {
            Self::Bits(bits) => bits,
            Self::Bool(value) => KnownBits::from_bool(value),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Bits(bits) => write!(f, "{bits}"),
        }
    }
}

/// Evaluates `expr` under `model`.
///
/// Tainted subexpressions evaluate to the zero value of their sort, as their
/// concrete value is by definition not controlled by the test.
///
/// # Errors
///
/// Returns [`Err`] if a variable has no value in `model`, if a state
/// reference survived substitution, or if the expression is ill-sorted.
pub fn evaluate(expr: &Expr, model: &Model) -> UnlocatedResult<Value> {
    let value = match expr {
        Expr::Bool(value) => Value::Bool(*value),
        Expr::Const(value) => Value::Bits(value.clone()),
        Expr::Var(variable) => model
            .get(variable.name())
            .cloned()
            .ok_or_else(|| Error::VariableNotInModel {
                name: variable.name().to_string(),
            })?,
        Expr::StateRef { name, .. } => {
            return Err(Error::UnboundStateVariable { name: name.clone() })
        }
        Expr::Tainted { sort } => Value::zero(*sort),
        Expr::Not(inner) => Value::Bool(!evaluate(inner, model)?.as_bool()?),
        Expr::And(l, r) => {
            Value::Bool(evaluate(l, model)?.as_bool()? && evaluate(r, model)?.as_bool()?)
        }
        Expr::Or(l, r) => {
            Value::Bool(evaluate(l, model)?.as_bool()? || evaluate(r, model)?.as_bool()?)
        }
        Expr::Eq(l, r) => {
            let left = evaluate(l, model)?;
            let right = evaluate(r, model)?;
            if left.sort() != right.sort() {
                return Err(type_mismatch(left.sort(), right.sort()));
            }
            Value::Bool(left == right)
        }
        Expr::Ult(l, r) => Value::Bool(bits(l, model)?.ult(&bits(r, model)?)?),
        Expr::Ule(l, r) => Value::Bool(bits(l, model)?.ule(&bits(r, model)?)?),
        Expr::Add(l, r) => Value::Bits(bits(l, model)?.add(&bits(r, model)?)?),
        Expr::Sub(l, r) => Value::Bits(bits(l, model)?.sub(&bits(r, model)?)?),
        Expr::Mul(l, r) => Value::Bits(bits(l, model)?.mul(&bits(r, model)?)?),
        Expr::BitAnd(l, r) => Value::Bits(bits(l, model)?.bit_and(&bits(r, model)?)?),
        Expr::BitOr(l, r) => Value::Bits(bits(l, model)?.bit_or(&bits(r, model)?)?),
        Expr::BitXor(l, r) => Value::Bits(bits(l, model)?.bit_xor(&bits(r, model)?)?),
        Expr::BitNot(inner) => Value::Bits(bits(inner, model)?.bit_not()),
        Expr::Concat { high, low } => Value::Bits(bits(high, model)?.concat(&bits(low, model)?)),
        Expr::Slice { value, high, low } => Value::Bits(bits(value, model)?.slice(*high, *low)?),
        Expr::Ite {
            cond,
            then,
            otherwise,
        } => {
            if evaluate(cond, model)?.as_bool()? {
                evaluate(then, model)?
            } else {
                evaluate(otherwise, model)?
            }
        }
    };

    Ok(value)
}

/// Evaluates `expr` as a bit-vector, widening booleans to a single bit.
fn bits(expr: &Expr, model: &Model) -> UnlocatedResult<KnownBits> {
    Ok(evaluate(expr, model)?.into_bits())
}

fn type_mismatch(expected: Sort, found: Sort) -> Error {
    Error::TypeMismatch {
        expected: expected.to_string(),
        found:    found.to_string(),
    }
}
