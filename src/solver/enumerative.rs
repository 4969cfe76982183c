//! This module contains a reference [`Solver`] that searches for models by
//! enumerating candidate values for each variable.
//!
//! # Search
//!
//! The variables of a query are ordered by name, and each constraint is
//! attached to the latest variable it mentions. The search assigns the
//! variables in order, backtracking as soon as a constraint attached to the
//! variable just assigned evaluates to `false`.
//!
//! Candidates for a bit-vector variable are mined from the constants in the
//! query (each constant and its neighbours, along with zero-extended and
//! top-aligned forms of narrower constants), followed by `0`, `1` and the
//! all-ones value. Variables no wider than
//! [`ENUMERATIVE_SOLVER_FULL_DOMAIN_WIDTH_BITS`] additionally enumerate their
//! whole domain, and a search over only such variables is complete, so its
//! exhaustion proves the query unsatisfiable. Otherwise exhaustion yields
//! [`SatResult::Unknown`].

use std::collections::BTreeSet;

use itertools::Itertools;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{
    constant::{
        DEFAULT_SOLVER_TIMEOUT_MS,
        ENUMERATIVE_SOLVER_ASSIGNMENTS_PER_MS,
        ENUMERATIVE_SOLVER_FULL_DOMAIN_WIDTH_BITS,
    },
    error::execution::{Error, UnlocatedResult},
    expr::{
        eval::{evaluate, Value},
        known::KnownBits,
        Expr,
        ExprRef,
        Sort,
        Variable,
    },
    solver::{model::Model, SatResult, Solver},
};

/// A solver that enumerates candidate assignments within a budget derived
/// from its timeout.
#[derive(Debug)]
pub struct EnumerativeSolver {
    timeout_ms: u64,
    seed:       Option<u64>,
    last_model: Option<Model>,
    queries:    usize,
}

impl EnumerativeSolver {
    /// Creates a new solver with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout_ms: DEFAULT_SOLVER_TIMEOUT_MS,
            seed:       None,
            last_model: None,
            queries:    0,
        }
    }

    /// Gets the number of satisfiability queries answered so far.
    #[must_use]
    pub fn queries(&self) -> usize {
        self.queries
    }

    /// Gets the number of candidate assignments a single query may examine.
    #[must_use]
    pub fn budget(&self) -> u64 {
        self.timeout_ms
            .saturating_mul(ENUMERATIVE_SOLVER_ASSIGNMENTS_PER_MS)
            .max(1)
    }

    /// Computes the candidate values for `variable`, returning them along
    /// with whether they cover its whole domain.
    fn candidates(&self, variable: &Variable, constants: &[KnownBits]) -> (Vec<Value>, bool) {
        let width = match variable.sort() {
            Sort::Bool => return (vec![Value::Bool(false), Value::Bool(true)], true),
            Sort::Bits(width) => width,
        };

        let mut mined = Vec::new();
        for constant in constants {
            let found = constant.width();
            if found == width {
                mined.push(constant.clone());
                if let Ok(next) = constant.add(&KnownBits::from_u128(1, width)) {
                    mined.push(next);
                }
                if let Ok(previous) = constant.sub(&KnownBits::from_u128(1, width)) {
                    mined.push(previous);
                }
            } else if found < width {
                mined.push(KnownBits::zero(width - found).concat(constant));
                mined.push(constant.concat(&KnownBits::zero(width - found)));
            }
        }
        mined.push(KnownBits::zero(width));
        mined.push(KnownBits::from_u128(1, width));
        mined.push(KnownBits::ones(width));

        let complete = width <= ENUMERATIVE_SOLVER_FULL_DOMAIN_WIDTH_BITS;
        if complete {
            let domain = 1u128 << width;
            mined.extend((0..domain).map(|value| KnownBits::from_u128(value, width)));
        }

        let mut candidates: Vec<Value> = mined.into_iter().unique().map(Value::Bits).collect();
        if let Some(seed) = self.seed {
            let mut rng = StdRng::seed_from_u64(seed);
            candidates.shuffle(&mut rng);
        }

        (candidates, complete)
    }

    /// Runs the search over the constraints that are not literals.
    fn search(&mut self, constraints: &[ExprRef]) -> SatResult {
        let variables: Vec<Variable> = constraints
            .iter()
            .fold(BTreeSet::new(), |mut acc, c| {
                c.collect_variables(&mut acc);
                acc
            })
            .into_iter()
            .collect();
        let constants: Vec<KnownBits> = constraints
            .iter()
            .flat_map(|c| c.constants())
            .unique()
            .collect();

        // Attach each constraint to the last variable it mentions.
        let mut checks: Vec<Vec<&ExprRef>> = vec![Vec::new(); variables.len()];
        let mut ground = Vec::new();
        for constraint in constraints {
            let mentioned = constraint.variables();
            match mentioned
                .iter()
                .filter_map(|v| variables.binary_search(v).ok())
                .max()
            {
                Some(index) => checks[index].push(constraint),
                None => ground.push(constraint),
            }
        }

        let mut model = Model::new();
        if !ground.iter().all(|c| holds(c, &model)) {
            return SatResult::Unsat;
        }

        let mut complete = true;
        let domains: Vec<Vec<Value>> = variables
            .iter()
            .map(|variable| {
                let (values, full) = self.candidates(variable, &constants);
                complete &= full;
                values
            })
            .collect();

        let budget = self.budget();
        let mut tried: u64 = 0;
        let mut choice = vec![0usize; variables.len()];
        let mut depth = 0;

        loop {
            if depth == variables.len() {
                self.last_model = Some(model);
                return SatResult::Sat;
            }

            if choice[depth] >= domains[depth].len() {
                choice[depth] = 0;
                model.remove(variables[depth].name());
                if depth == 0 {
                    return if complete {
                        SatResult::Unsat
                    } else {
                        SatResult::Unknown
                    };
                }
                depth -= 1;
                choice[depth] += 1;
                continue;
            }

            tried += 1;
            if tried > budget {
                return SatResult::Unknown;
            }

            let value = domains[depth][choice[depth]].clone();
            model.insert(variables[depth].name(), value);
            if checks[depth].iter().all(|c| holds(c, &model)) {
                depth += 1;
            } else {
                choice[depth] += 1;
            }
        }
    }
}

impl Default for EnumerativeSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for EnumerativeSolver {
    fn check_sat(&mut self, constraints: &[ExprRef]) -> SatResult {
        self.queries += 1;
        self.last_model = None;

        let simplified: Vec<ExprRef> = constraints.iter().map(Expr::simplify).collect();
        if simplified.iter().any(|c| c.as_bool() == Some(false)) {
            return SatResult::Unsat;
        }
        let open: Vec<ExprRef> = simplified
            .into_iter()
            .filter(|c| c.as_bool() != Some(true))
            .collect();

        let result = self.search(&open);
        log::trace!(
            "Enumerative solver answered {result} for {} constraints",
            open.len()
        );
        result
    }

    fn model(&self) -> UnlocatedResult<Model> {
        self.last_model.clone().ok_or(Error::ModelUnavailable)
    }

    fn seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    fn set_timeout(&mut self, timeout_ms: u64) {
        self.timeout_ms = timeout_ms;
    }
}

/// Checks whether `constraint` evaluates to `true` under `model`. Evaluation
/// failures count as violations.
fn holds(constraint: &ExprRef, model: &Model) -> bool {
    matches!(evaluate(constraint, model), Ok(Value::Bool(true)))
}

#[cfg(test)]
mod test {
    use crate::{
        error::execution::Error,
        expr::{eval::Value, fold, known::KnownBits, Sort},
        solver::{enumerative::EnumerativeSolver, SatResult, Solver},
    };

    #[test]
    fn finds_models_for_equalities() -> anyhow::Result<()> {
        let mut solver = EnumerativeSolver::new();
        let x = fold::var("x", Sort::Bits(16));
        let constraints = vec![fold::eq(x, fold::bits(0x0800, 16))];

        assert_eq!(solver.check_sat(&constraints), SatResult::Sat);
        let model = solver.model()?;
        assert_eq!(
            model.get("x"),
            Some(&Value::Bits(KnownBits::from_u128(0x0800, 16)))
        );

        Ok(())
    }

    #[test]
    fn proves_small_domains_unsatisfiable() {
        let mut solver = EnumerativeSolver::new();
        let x = fold::var("x", Sort::Bits(8));
        let constraints = vec![
            fold::eq(x.clone(), fold::bits(1, 8)),
            fold::eq(x, fold::bits(2, 8)),
        ];

        assert_eq!(solver.check_sat(&constraints), SatResult::Unsat);
        assert_eq!(solver.model(), Err(Error::ModelUnavailable));
    }

    #[test]
    fn reports_unknown_for_incomplete_searches() {
        let mut solver = EnumerativeSolver::new();
        let x = fold::var("x", Sort::Bits(32));
        let constraints = vec![
            fold::eq(x.clone(), fold::bits(1, 32)),
            fold::eq(x, fold::bits(2, 32)),
        ];

        assert_eq!(solver.check_sat(&constraints), SatResult::Unknown);
    }

    #[test]
    fn gives_up_when_the_budget_runs_out() {
        let mut solver = EnumerativeSolver::new();
        solver.set_timeout(0);
        let x = fold::var("x", Sort::Bits(8));
        let y = fold::var("y", Sort::Bits(8));
        let constraints = vec![fold::eq(fold::add(x, y), fold::bits(77, 8))];

        assert_eq!(solver.check_sat(&constraints), SatResult::Unknown);
    }

    #[test]
    fn literal_constraints_need_no_search() {
        let mut solver = EnumerativeSolver::new();

        assert_eq!(solver.check_sat(&[]), SatResult::Sat);
        assert_eq!(solver.check_sat(&[fold::fals()]), SatResult::Unsat);
        assert_eq!(solver.queries(), 2);
    }

    #[test]
    fn seeded_search_still_respects_constraints() -> anyhow::Result<()> {
        let mut solver = EnumerativeSolver::new();
        solver.seed(7);
        let x = fold::var("x", Sort::Bits(8));
        let constraints = vec![fold::ult(x, fold::bits(3, 8))];

        assert_eq!(solver.check_sat(&constraints), SatResult::Sat);
        let value = solver.model()?.get("x").cloned();
        let Some(Value::Bits(bits)) = value else {
            anyhow::bail!("x was not assigned a bit-vector");
        };
        assert!(bits.to_u128().is_some_and(|v| v < 3));

        Ok(())
    }
}
