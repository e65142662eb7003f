//! Engine errors and tick outcomes.

use crate::builder::DefinitionError;
use crate::checkpoint::CheckpointError;
use thiserror::Error;

/// Result of one observe/transition/act round.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome<S> {
    /// A transition fired; `index` is its position in the table.
    Transitioned { from: S, to: S, index: usize },

    /// No transition matched; the state is unchanged.
    Stayed(S),
}

impl<S> TickOutcome<S> {
    /// State after the tick.
    pub fn state(&self) -> &S {
        match self {
            TickOutcome::Transitioned { to, .. } => to,
            TickOutcome::Stayed(state) => state,
        }
    }

    pub fn transitioned(&self) -> bool {
        matches!(self, TickOutcome::Transitioned { .. })
    }
}

/// Errors surfaced by [`Engine`](super::Engine).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Observation failed; nothing was changed.
    #[error("observe failed: {0}")]
    Observe(#[source] anyhow::Error),

    /// The before-transition hook rejected the transition; state unchanged.
    #[error("transition {from} -> {to} failed: {source}")]
    Transition {
        from: String,
        to: String,
        source: anyhow::Error,
    },

    /// The action failed. Any transition of the same tick stays committed.
    #[error("action in state {state} failed: {source}")]
    Action {
        state: String,
        source: anyhow::Error,
    },

    /// An explicitly sent event matched no transition.
    #[error("event {event} cannot fire from state {state}")]
    NoTransition { state: String, event: String },
}
