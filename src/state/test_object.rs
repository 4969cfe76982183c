//! Opaque artifacts that steppers attach to a state for the test backend to
//! concretize, such as control-plane table entries.

use std::{
    any::Any,
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
    rc::Rc,
};

use downcast_rs::{impl_downcast, Downcast};

use crate::{error::execution::UnlocatedResult, expr::Variable, solver::model::Model};

/// An artifact whose symbolic contents are concretized once a model exists.
pub trait TestObject
where
    Self: Any + Debug + Downcast,
{
    /// Renders the object with every value evaluated under `model`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `model` does not assign a variable of the object.
    fn evaluate(&self, model: &Model) -> UnlocatedResult<String>;

    /// Collects the free variables that the object mentions.
    fn variables(&self) -> BTreeSet<Variable> {
        BTreeSet::new()
    }
}

impl_downcast!(TestObject);

/// A shared, immutable test object.
pub type DynTestObject = Rc<dyn TestObject>;

/// The test objects of a state, keyed by category and then by label.
#[derive(Clone, Debug, Default)]
pub struct TestObjects {
    categories: BTreeMap<String, BTreeMap<String, DynTestObject>>,
}

impl TestObjects {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `object` under `category` and `label`, replacing any object
    /// already there.
    pub fn add(
        &mut self,
        category: impl Into<String>,
        label: impl Into<String>,
        object: impl TestObject,
    ) {
        self.categories
            .entry(category.into())
            .or_default()
            .insert(label.into(), Rc::new(object));
    }

    /// Gets the object under `category` and `label`.
    #[must_use]
    pub fn get(&self, category: &str, label: &str) -> Option<&DynTestObject> {
        self.categories.get(category)?.get(label)
    }

    /// Gets the object under `category` and `label` as the concrete type
    /// `T`, if it is one.
    #[must_use]
    pub fn get_as<T: TestObject>(&self, category: &str, label: &str) -> Option<&T> {
        self.get(category, label)?.as_ref().as_any().downcast_ref::<T>()
    }

    /// Iterates over every object with its category and label.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &DynTestObject)> {
        self.categories.iter().flat_map(|(category, objects)| {
            objects
                .iter()
                .map(move |(label, object)| (category.as_str(), label.as_str(), object))
        })
    }

    /// Gets the total number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// Checks if there are no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Objects are compared by category, label and rendering, as they have no
/// structural equality of their own.
impl PartialEq for TestObjects {
    fn eq(&self, other: &Self) -> bool {
        let render = |objects: &Self| -> Vec<(String, String, String)> {
            objects
                .iter()
                .map(|(c, l, o)| (c.to_string(), l.to_string(), format!("{o:?}")))
                .collect()
        };
        render(self) == render(other)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::execution::UnlocatedResult,
        solver::model::Model,
        state::test_object::{TestObject, TestObjects},
    };

    #[derive(Debug)]
    struct Entry(u8);

    impl TestObject for Entry {
        fn evaluate(&self, _model: &Model) -> UnlocatedResult<String> {
            Ok(format!("entry {}", self.0))
        }
    }

    #[test]
    fn stores_by_category_and_label() -> anyhow::Result<()> {
        let mut objects = TestObjects::new();
        objects.add("tables", "ipv4_lpm", Entry(1));
        objects.add("tables", "acl", Entry(2));
        objects.add("tables", "acl", Entry(3));

        assert_eq!(objects.len(), 2);
        assert_eq!(objects.get_as::<Entry>("tables", "acl").map(|e| e.0), Some(3));
        let rendered = objects
            .get("tables", "ipv4_lpm")
            .map(|o| o.evaluate(&Model::new()))
            .transpose()?;
        assert_eq!(rendered.as_deref(), Some("entry 1"));

        Ok(())
    }
}
