//! Guards deciding whether a transition fires for an observed value.
//!
//! A guard is either an equality trigger against a specific event, tested
//! with the type's resolved [`Comparator`], or a pure predicate over the
//! observation.

use super::identity::{Comparator, Event};
use std::fmt;
use std::sync::Arc;

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Condition attached to a transition.
///
/// # Example
///
/// ```rust
/// use durable_fsm::core::{resolve, Event, Guard, Identity};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Health {
///     service_up: bool,
/// }
///
/// impl Event for Health {
///     fn identity() -> Identity<Self> {
///         Identity::structural()
///     }
/// }
///
/// let down = Guard::when(|h: &Health| !h.service_up);
/// let cmp = resolve::<Health>();
///
/// assert!(down.check(&Health { service_up: false }, &cmp));
/// assert!(!down.check(&Health { service_up: true }, &cmp));
/// ```
pub enum Guard<E> {
    /// Fires when the observation equals this event.
    On(E),
    /// Fires when the predicate holds for the observation.
    When(Predicate<E>),
}

impl<E: Event> Guard<E> {
    /// Equality trigger against `event`.
    pub fn on(event: E) -> Self {
        Guard::On(event)
    }

    /// Predicate guard. The predicate must be deterministic.
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Guard::When(Arc::new(predicate))
    }

    /// Check whether the guard matches `observed`.
    pub fn check(&self, observed: &E, comparator: &Comparator<E>) -> bool {
        match self {
            Guard::On(event) => comparator.equals(event, observed),
            Guard::When(predicate) => predicate(observed),
        }
    }

    /// The trigger event, if this is an equality guard.
    pub fn event(&self) -> Option<&E> {
        match self {
            Guard::On(event) => Some(event),
            Guard::When(_) => None,
        }
    }
}

impl<E: Clone> Clone for Guard<E> {
    fn clone(&self) -> Self {
        match self {
            Guard::On(event) => Guard::On(event.clone()),
            Guard::When(predicate) => Guard::When(Arc::clone(predicate)),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for Guard<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::On(event) => f.debug_tuple("On").field(event).finish(),
            Guard::When(_) => f.write_str("When(<predicate>)"),
        }
    }
}
