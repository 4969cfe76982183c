//! This module contains the [`FinalState`], a terminal state together with a
//! complete concrete model of its path.
//!
//! # Model Completion
//!
//! A solver only assigns the variables that appear in the query it answered.
//! Completion extends that assignment in the following order:
//!
//! 1. Every variable mentioned by the environment, the path constraint, the
//!    packet buffers, the trace and the test objects, along with every
//!    variable the state introduced on its own (such as packet variables),
//!    receives the target's default value if the solver left it unassigned.
//! 2. Derived variables are recomputed from the completed model in the order
//!    in which they were defined, so that later definitions can depend on
//!    earlier ones.
//!
//! The trace, the state variables, the packets and the test objects are then
//! evaluated under the completed model.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    error::execution::UnlocatedResult,
    expr::{
        eval::{evaluate, Value},
        known::KnownBits,
        Variable,
    },
    program::ProgramInfo,
    solver::{model::Model, Solver},
    state::{trail::Trail, ExecutionState},
};

/// A concretized test object, identified by category and label.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConcreteTestObject {
    pub category: String,
    pub label:    String,
    pub value:    String,
}

/// A terminal state with a complete model. Immutable once built.
#[derive(Clone, Debug)]
pub struct FinalState {
    state:         ExecutionState,
    model:         Model,
    state_values:  BTreeMap<String, Value>,
    trace:         Vec<String>,
    input_packet:  KnownBits,
    output_packet: KnownBits,
    test_objects:  Vec<ConcreteTestObject>,
}

impl FinalState {
    /// Builds the final state of the terminal `state` from the model of the
    /// solver's most recent satisfiable check.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the solver has no model or if evaluating a part of
    /// the state fails.
    pub fn new(
        solver: &dyn Solver,
        state: ExecutionState,
        program: &dyn ProgramInfo,
    ) -> UnlocatedResult<Self> {
        let model = complete(solver.model()?, &state, program)?;

        let state_values = state
            .env()
            .iter()
            .map(|(name, value)| Ok((name.clone(), evaluate(value, &model)?)))
            .collect::<UnlocatedResult<_>>()?;
        let trace = state
            .trace()
            .iter()
            .map(|event| event.evaluate(&model))
            .collect::<UnlocatedResult<_>>()?;
        let input_packet = evaluate(state.packet().input(), &model)?.into_bits();
        let output_packet = evaluate(state.packet().output(), &model)?.into_bits();
        let test_objects = state
            .test_objects()
            .iter()
            .map(|(category, label, object)| {
                Ok(ConcreteTestObject {
                    category: category.to_string(),
                    label:    label.to_string(),
                    value:    object.evaluate(&model)?,
                })
            })
            .collect::<UnlocatedResult<_>>()?;

        Ok(Self {
            state,
            model,
            state_values,
            trace,
            input_packet,
            output_packet,
            test_objects,
        })
    }

    /// Gets the terminal execution state.
    #[must_use]
    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Gets the branch decisions that led to this state.
    #[must_use]
    pub fn trail(&self) -> &Trail {
        self.state.trail()
    }

    /// Gets the completed model.
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Gets the concrete value of every state variable.
    #[must_use]
    pub fn state_values(&self) -> &BTreeMap<String, Value> {
        &self.state_values
    }

    /// Gets the concrete trace, one line per event.
    #[must_use]
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Gets the packet the test feeds into the program.
    #[must_use]
    pub fn input_packet(&self) -> &KnownBits {
        &self.input_packet
    }

    /// Gets the packet the program is expected to emit.
    #[must_use]
    pub fn output_packet(&self) -> &KnownBits {
        &self.output_packet
    }

    /// Gets the concretized test objects.
    #[must_use]
    pub fn test_objects(&self) -> &[ConcreteTestObject] {
        &self.test_objects
    }
}

/// Completes `model` over every variable of `state`.
fn complete(
    mut model: Model,
    state: &ExecutionState,
    program: &dyn ProgramInfo,
) -> UnlocatedResult<Model> {
    let mut variables: BTreeSet<Variable> = state.symbolic_variables().clone();
    state
        .env()
        .iter()
        .for_each(|(_, value)| value.collect_variables(&mut variables));
    state
        .path_constraint()
        .iter()
        .for_each(|constraint| constraint.collect_variables(&mut variables));
    state.packet().input().collect_variables(&mut variables);
    state.packet().output().collect_variables(&mut variables);
    state
        .trace()
        .iter()
        .for_each(|event| variables.extend(event.variables()));
    state
        .test_objects()
        .iter()
        .for_each(|(_, _, object)| variables.extend(object.variables()));
    for (variable, definition) in state.derived() {
        variables.insert(variable.clone());
        definition.collect_variables(&mut variables);
    }

    for variable in &variables {
        if !model.contains(variable.name()) {
            model.insert(variable.name(), program.default_value(variable));
        }
    }

    for (variable, definition) in state.derived() {
        let value = evaluate(definition, &model)?;
        model.insert(variable.name(), value);
    }

    Ok(model)
}

#[cfg(test)]
mod test {
    use crate::{
        continuation::{Namespace, TraceEvent},
        coverage::CoverageSet,
        expr::{eval::Value, fold, known::KnownBits, Sort, Variable},
        final_state::FinalState,
        program::ProgramInfo,
        solver::{EnumerativeSolver, SatResult, Solver},
        state::ExecutionState,
    };

    #[derive(Debug)]
    struct Empty;

    impl ProgramInfo for Empty {
        fn pipeline_sequence(&self) -> Vec<crate::continuation::Command> {
            vec![]
        }

        fn coverable_nodes(&self) -> CoverageSet {
            CoverageSet::new()
        }
    }

    #[test]
    fn completes_unconstrained_variables() -> anyhow::Result<()> {
        let mut state = ExecutionState::new(vec![], Namespace::new());
        let field = state.extract(8);
        state.set("hdr.ttl", field)?;
        let free = fold::var("meta", Sort::Bits(4));
        state.add_trace(TraceEvent::expression("meta", free));

        let mut solver = EnumerativeSolver::new();
        assert_eq!(solver.check_sat(state.path_constraint()), SatResult::Sat);
        let final_state = FinalState::new(&solver, state, &Empty)?;

        assert_eq!(
            final_state.model().get("pkt_var_0"),
            Some(&Value::Bits(KnownBits::zero(8)))
        );
        assert_eq!(final_state.trace(), &["meta: 4w0x00".to_string()]);
        assert_eq!(final_state.input_packet(), &KnownBits::zero(8));

        Ok(())
    }

    #[test]
    fn recomputes_derived_variables() -> anyhow::Result<()> {
        let mut state = ExecutionState::new(vec![], Namespace::new());
        let x = fold::var("x", Sort::Bits(8));
        state.add_constraint(fold::eq(x.clone(), fold::bits(5, 8)));
        let checksum = Variable::new("checksum", Sort::Bits(8));
        state.add_derived(checksum.clone(), fold::add(x, fold::bits(1, 8)));
        state.set("hdr.checksum", fold::variable(checksum))?;

        let mut solver = EnumerativeSolver::new();
        assert_eq!(solver.check_sat(state.path_constraint()), SatResult::Sat);
        let final_state = FinalState::new(&solver, state, &Empty)?;

        assert_eq!(
            final_state.state_values().get("hdr.checksum"),
            Some(&Value::Bits(KnownBits::from_u128(6, 8)))
        );

        Ok(())
    }

    #[test]
    fn requires_a_satisfiable_check() {
        let solver = EnumerativeSolver::new();
        let state = ExecutionState::new(vec![], Namespace::new());
        assert!(FinalState::new(&solver, state, &Empty).is_err());
    }
}
