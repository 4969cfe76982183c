//! The symbolic environment, mapping state-variable names to the symbolic
//! values they currently hold.

use std::collections::{btree_map, BTreeMap};

use crate::{
    error::execution::{Error, UnlocatedResult},
    expr::{Expr, ExprRef},
};

/// The bindings of state variables on one path.
///
/// Values are stored with every state reference already resolved, so a
/// binding never depends on the later value of another variable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolicEnv {
    bindings: BTreeMap<String, ExprRef>,
}

impl SymbolicEnv {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ExprRef> {
        self.bindings.get(name)
    }

    /// Checks if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Binds `name` to `value`, resolving and folding the value first.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `value` refers to an unbound state variable.
    pub fn set(&mut self, name: impl Into<String>, value: ExprRef) -> UnlocatedResult<()> {
        let value = self.subst(&value)?;
        self.bindings.insert(name.into(), value);
        Ok(())
    }

    /// Replaces every state reference in `expr` by its binding and folds the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `expr` refers to an unbound state variable.
    pub fn subst(&self, expr: &ExprRef) -> UnlocatedResult<ExprRef> {
        Expr::rebuild(expr, &mut |leaf| match leaf {
            Expr::StateRef { name, .. } => self
                .bindings
                .get(name)
                .cloned()
                .map(Some)
                .ok_or_else(|| Error::UnboundStateVariable { name: name.clone() }),
            _ => Ok(None),
        })
    }

    /// Gets the number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Checks if no variable is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates over the bindings in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ExprRef> {
        self.bindings.iter()
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::execution::Error,
        expr::{fold, Sort},
        state::env::SymbolicEnv,
    };

    #[test]
    fn resolves_references_on_write() -> anyhow::Result<()> {
        let mut env = SymbolicEnv::new();
        env.set("a", fold::bits(2, 8))?;
        env.set(
            "b",
            fold::add(fold::state_ref("a", Sort::Bits(8)), fold::bits(3, 8)),
        )?;
        env.set("a", fold::bits(9, 8))?;

        assert_eq!(env.get("b"), Some(&fold::bits(5, 8)));
        assert_eq!(env.len(), 2);

        Ok(())
    }

    #[test]
    fn rejects_unbound_references() {
        let env = SymbolicEnv::new();
        let result = env.subst(&fold::state_ref("missing", Sort::Bool));

        assert_eq!(
            result,
            Err(Error::UnboundStateVariable {
                name: "missing".into(),
            })
        );
    }
}
