//! Audit trail of committed transitions.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single committed transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state being transitioned from
    pub from: S,
    /// The state being transitioned to
    pub to: S,
    /// When the transition was committed
    pub timestamp: DateTime<Utc>,
    /// Tick number (1-based) that produced the transition
    pub tick: u64,
}

/// Ordered history of committed transitions.
///
/// # Example
///
/// ```rust
/// use durable_fsm::core::{State, StateHistory, StateTransition};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Phase { Running, Waiting, Done }
///
/// impl State for Phase {
///     fn name(&self) -> &str {
///         match self {
///             Self::Running => "Running",
///             Self::Waiting => "Waiting",
///             Self::Done => "Done",
///         }
///     }
/// }
///
/// let history = StateHistory::new()
///     .record(StateTransition {
///         from: Phase::Running,
///         to: Phase::Waiting,
///         timestamp: Utc::now(),
///         tick: 1,
///     })
///     .record(StateTransition {
///         from: Phase::Waiting,
///         to: Phase::Done,
///         timestamp: Utc::now(),
///         tick: 2,
///     });
///
/// assert_eq!(history.get_path(), vec![&Phase::Running, &Phase::Waiting, &Phase::Done]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: Vec<StateTransition<S>>,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    ///
    /// The existing history is left untouched.
    pub fn record(&self, transition: StateTransition<S>) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Append a transition in place.
    pub fn push(&mut self, transition: StateTransition<S>) {
        self.transitions.push(transition);
    }

    /// Get the path of states traversed: the first `from` state followed by
    /// the `to` state of each transition.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time between the first and last transition, `None` when empty.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Get all transitions.
    pub fn transitions(&self) -> &[StateTransition<S>] {
        &self.transitions
    }

    /// Number of recorded transitions.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
