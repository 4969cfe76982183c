use std::fmt::Formatter;

use thiserror::Error;

use crate::state::trail::Trail;

/// An error that is localised to the execution path that raised it.
///
/// The location is the branch-decision trail of the offending state, which
/// can be handed to the selected branches strategy to reproduce the failure.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The trail of the state where the error occurred.
    pub location: Trail,

    /// The error data
    pub payload: E,
}

/// Displays the error associated with the trail that led to it.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[trail {}]: {}", self.location, self.payload)
    }
}

/// A trait for types that can have an execution trail attached to them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached trail.
    type Located;

    /// Attach the location described by `trail` to the error.
    fn locate(self, trail: &Trail) -> Self::Located;
}

/// A blanket implementation that allows for attaching a location to any result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, trail: &Trail) -> Self::Located {
        self.map_err(|e| Located {
            location: trail.clone(),
            payload:  e,
        })
    }
}

/// An error that is a collection of errors.
///
/// The errors are kept in the order in which they were added to the
/// container, which for a single-threaded exploration is the order in which
/// they were encountered.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Errors<E> {
    payloads: Vec<E>,
}

impl<E> Errors<E> {
    /// Creates a new container for errors.
    #[must_use]
    pub fn new() -> Self {
        let payloads = vec![];
        Self { payloads }
    }

    /// Gets the errors contained within this error.
    #[must_use]
    pub fn payloads(&self) -> &[E] {
        self.payloads.as_slice()
    }

    /// Gets the length of the errors container.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Checks if the errors container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Errors<E>
where
    E: std::error::Error,
{
    /// Adds the provided `error` to the container.
    pub fn add(&mut self, error: E) {
        self.payloads.push(error);
    }

    /// Adds the multiple provided errors to the container.
    pub fn add_many(&mut self, errors: impl Into<Vec<E>>) {
        self.payloads.extend(errors.into());
    }
}

impl<E> Errors<Located<E>>
where
    E: std::error::Error + Clone,
{
    /// Adds an error `payload` that was raised on the path described by
    /// `trail`.
    pub fn add_located(&mut self, trail: &Trail, payload: E) {
        let error = Located {
            location: trail.clone(),
            payload,
        };
        self.payloads.push(error);
    }
}

/// The default errors container is one containing no errors.
impl<E> Default for Errors<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Allow conversion from any error type to a container of errors.
impl<E> From<E> for Errors<E>
where
    E: std::error::Error,
{
    fn from(value: E) -> Self {
        let mut errors = Self::default();
        errors.add(value);
        errors
    }
}

/// Allow conversion from the errors container to a vector of errors.
impl<E> From<Errors<E>> for Vec<E>
where
    E: std::error::Error,
{
    fn from(value: Errors<E>) -> Self {
        value.payloads
    }
}

/// Allow conversion from a vector of errors to the errors container.
impl<E> From<Vec<E>> for Errors<E>
where
    E: std::error::Error,
{
    fn from(value: Vec<E>) -> Self {
        Self { payloads: value }
    }
}

/// Displays the errors in the sequence in which they occur in the container.
///
/// It has a header specifying how many errors occurred, and then prints one
/// error per line after that.
impl<E> std::fmt::Display for Errors<E>
where
    E: std::fmt::Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.payloads.is_empty() {
            write!(f, "Encountered no errors")?;
        } else {
            writeln!(f, "Encountered {} errors:", self.payloads.len())?;
            for error in &self.payloads {
                writeln!(f, "{error}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::{
            container::{Errors, Locatable},
            execution::Error,
        },
        state::trail::Trail,
    };

    #[test]
    fn located_errors_display_their_trail() {
        let trail = Trail::from(vec![1, 3]);
        let error = Error::SteppedTerminalState.locate(&trail);

        assert_eq!(
            error.to_string(),
            "[trail 1.3]: Attempted to step a state that has no pending commands"
        );
    }

    #[test]
    fn errors_keep_insertion_order() {
        let mut errors = Errors::new();
        errors.add_located(&Trail::from(vec![2]), Error::ReplayTrailExhausted);
        errors.add_located(&Trail::from(vec![1]), Error::SteppedTerminalState);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.payloads()[0].location, Trail::from(vec![2]));
        assert_eq!(errors.payloads()[1].payload, Error::SteppedTerminalState);
    }
}
