//! Trace events recorded while stepping, and their concretization under a
//! completed model.

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    error::execution::UnlocatedResult,
    expr::{eval::evaluate, ExprRef, Variable},
    solver::model::Model,
    state::env::SymbolicEnv,
};

/// The direction of a packet recorded in the trace.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PacketDirection {
    Input,
    Output,
}

impl Display for PacketDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// An event in the execution trace of a path.
#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    /// A plain message.
    Generic { label: String },

    /// A labelled value.
    Expression { label: String, value: ExprRef },

    /// A labelled list of values.
    ListExpression { label: String, values: Vec<ExprRef> },

    /// The contents of a packet at some point of the pipeline.
    Packet {
        direction: PacketDirection,
        packet:    ExprRef,
    },
}

impl TraceEvent {
    /// Creates a plain message event.
    pub fn generic(label: impl Into<String>) -> Self {
        Self::Generic {
            label: label.into(),
        }
    }

    /// Creates a labelled value event.
    pub fn expression(label: impl Into<String>, value: ExprRef) -> Self {
        Self::Expression {
            label: label.into(),
            value,
        }
    }

    /// Replaces every state reference in the event by its binding in `env`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the event refers to an unbound state variable.
    pub fn subst(&self, env: &SymbolicEnv) -> UnlocatedResult<Self> {
        let event = match self {
            Self::Generic { .. } => self.clone(),
            Self::Expression { label, value } => Self::Expression {
                label: label.clone(),
                value: env.subst(value)?,
            },
            Self::ListExpression { label, values } => Self::ListExpression {
                label:  label.clone(),
                values: values
                    .iter()
                    .map(|value| env.subst(value))
                    .collect::<UnlocatedResult<_>>()?,
            },
            Self::Packet { direction, packet } => Self::Packet {
                direction: *direction,
                packet:    env.subst(packet)?,
            },
        };

        Ok(event)
    }

    /// Collects the free variables the event mentions.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut variables = BTreeSet::new();
        match self {
            Self::Generic { .. } => (),
            Self::Expression { value, .. } => value.collect_variables(&mut variables),
            Self::ListExpression { values, .. } => values
                .iter()
                .for_each(|value| value.collect_variables(&mut variables)),
            Self::Packet { packet, .. } => packet.collect_variables(&mut variables),
        }
        variables
    }

    /// Renders the event with every value evaluated under `model`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `model` does not assign a variable of the event.
    pub fn evaluate(&self, model: &Model) -> UnlocatedResult<String> {
        let line = match self {
            Self::Generic { label } => label.clone(),
            Self::Expression { label, value } => {
                format!("{label}: {}", evaluate(value, model)?)
            }
            Self::ListExpression { label, values } => {
                let rendered: Vec<String> = values
                    .iter()
                    .map(|value| evaluate(value, model).map(|v| v.to_string()))
                    .collect::<UnlocatedResult<_>>()?;
                format!("{label}: [{}]", rendered.iter().join(", "))
            }
            Self::Packet { direction, packet } => {
                let bits = evaluate(packet, model)?.into_bits();
                format!("{direction} packet: 0x{}", bits.to_hex())
            }
        };

        Ok(line)
    }
}

impl Display for TraceEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generic { label } => write!(f, "{label}"),
            Self::Expression { label, value } => write!(f, "{label}: {value}"),
            Self::ListExpression { label, values } => {
                write!(f, "{label}: [{}]", values.iter().join(", "))
            }
            Self::Packet { direction, packet } => write!(f, "{direction} packet: {packet}"),
        }
    }
}
