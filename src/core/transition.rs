//! Transition table entries and first-match selection.

use super::guard::Guard;
use super::identity::{Comparator, Event};
use super::state::State;

/// One row of a transition table.
#[derive(Clone, Debug)]
pub struct Transition<S, E> {
    pub from: S,
    pub to: S,
    pub guard: Guard<E>,
}

impl<S: State, E: Event> Transition<S, E> {
    /// Transition fired by an observation equal to `event`.
    pub fn on(from: S, to: S, event: E) -> Self {
        Self {
            from,
            to,
            guard: Guard::on(event),
        }
    }

    /// Transition fired when `predicate` holds for the observation.
    pub fn when<F>(from: S, to: S, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            from,
            to,
            guard: Guard::when(predicate),
        }
    }

    /// Check if this transition fires from `current` for `observed` (pure).
    pub fn can_fire(&self, current: &S, observed: &E, comparator: &Comparator<E>) -> bool {
        *current == self.from && self.guard.check(observed, comparator)
    }
}

/// Pick the transition that fires for `observed` in `current`.
///
/// The table is scanned in declaration order and the first match wins.
/// `None` means the tick performs no state change.
pub fn select<'a, S: State, E: Event>(
    transitions: &'a [Transition<S, E>],
    current: &S,
    observed: &E,
    comparator: &Comparator<E>,
) -> Option<(usize, &'a Transition<S, E>)> {
    transitions
        .iter()
        .enumerate()
        .find(|(_, t)| t.can_fire(current, observed, comparator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::{resolve, Identity};
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        Running,
        Waiting,
        Done,
        Failed,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Running => "Running",
                Self::Waiting => "Waiting",
                Self::Done => "Done",
                Self::Failed => "Failed",
            }
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Observation {
        wanted: &'static str,
        service_up: bool,
    }

    impl Event for Observation {
        fn identity() -> Identity<Self> {
            Identity::structural()
        }
    }

    fn table() -> Vec<Transition<TestState, Observation>> {
        vec![
            Transition::when(TestState::Running, TestState::Waiting, |o: &Observation| {
                o.wanted == "wait"
            }),
            Transition::when(TestState::Waiting, TestState::Done, |o: &Observation| {
                o.wanted == "done"
            }),
            Transition::when(TestState::Waiting, TestState::Failed, |o: &Observation| {
                !o.service_up
            }),
            Transition::when(TestState::Running, TestState::Failed, |o: &Observation| {
                !o.service_up
            }),
        ]
    }

    #[test]
    fn can_fire_matches_from_state() {
        let cmp = resolve::<Observation>();
        let transition = &table()[0];
        let wait = Observation {
            wanted: "wait",
            service_up: true,
        };

        assert!(transition.can_fire(&TestState::Running, &wait, &cmp));
        assert!(!transition.can_fire(&TestState::Waiting, &wait, &cmp));
    }

    #[test]
    fn first_declared_match_wins() {
        let cmp = resolve::<Observation>();
        let both = Observation {
            wanted: "done",
            service_up: false,
        };

        let binding = table();
        let (index, picked) = select(&binding, &TestState::Waiting, &both, &cmp).unwrap();
        assert_eq!(index, 1);
        assert_eq!(picked.to, TestState::Done);
    }

    #[test]
    fn no_match_selects_nothing() {
        let cmp = resolve::<Observation>();
        let idle = Observation {
            wanted: "",
            service_up: true,
        };

        assert!(select(&table(), &TestState::Running, &idle, &cmp).is_none());
        assert!(select(&table(), &TestState::Done, &idle, &cmp).is_none());
    }

    #[test]
    fn service_down_skips_waiting() {
        let cmp = resolve::<Observation>();
        let down = Observation {
            wanted: "",
            service_up: false,
        };

        let binding = table();
        let (_, picked) = select(&binding, &TestState::Running, &down, &cmp).unwrap();
        assert_eq!(picked.to, TestState::Failed);
    }
}
