//! Typed state properties, used by targets to carry cross-cutting execution
//! modes such as "the packet has been dropped".

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use crate::error::execution::{Error, UnlocatedResult};

/// The value of a state property.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl PropertyValue {
    /// Gets the name of the type of the value, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "string",
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value:?}"),
        }
    }
}

/// The properties of one state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Properties {
    values: BTreeMap<String, PropertyValue>,
}

impl Properties {
    /// Creates an empty property map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the property `name` to `value`.
    pub fn set(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.values.insert(name.into(), value);
    }

    /// Gets the raw value of the property `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// Gets the property `name` as a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the property is unset or is not a boolean.
    pub fn get_bool(&self, name: &str) -> UnlocatedResult<bool> {
        match self.lookup(name)? {
            PropertyValue::Bool(value) => Ok(*value),
            other => Err(mismatch(name, "bool", other)),
        }
    }

    /// Gets the property `name` as an integer.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the property is unset or is not an integer.
    pub fn get_int(&self, name: &str) -> UnlocatedResult<i64> {
        match self.lookup(name)? {
            PropertyValue::Int(value) => Ok(*value),
            other => Err(mismatch(name, "int", other)),
        }
    }

    /// Gets the property `name` as a string.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the property is unset or is not a string.
    pub fn get_str(&self, name: &str) -> UnlocatedResult<&str> {
        match self.lookup(name)? {
            PropertyValue::Str(value) => Ok(value),
            other => Err(mismatch(name, "string", other)),
        }
    }

    fn lookup(&self, name: &str) -> UnlocatedResult<&PropertyValue> {
        self.values.get(name).ok_or_else(|| Error::MissingProperty {
            name: name.to_string(),
        })
    }
}

fn mismatch(name: &str, expected: &str, found: &PropertyValue) -> Error {
    Error::PropertyTypeMismatch {
        name:     name.to_string(),
        expected: expected.to_string(),
        found:    found.type_name().to_string(),
    }
}
