//! In-process engine driving one FSM run.

use crate::builder::validate;
use crate::checkpoint::{Checkpoint, RunMetadata};
use crate::core::{resolve, select, Comparator, State, StateHistory, StateTransition, Transition};
use crate::definition::{ActionPolicy, Definition, Helper, Instance};
use crate::engine::error::{EngineError, TickOutcome};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

type S<D> = <D as Definition>::State;
type E<D> = <D as Definition>::Event;

/// Owns the current state and the instance of one run.
///
/// `tick` is meant to be called serially by a single driver. The engine
/// never stops on its own: check [`Engine::is_done`] after each tick.
pub struct Engine<D: Definition> {
    definition: Arc<D>,
    transitions: Vec<Transition<S<D>, E<D>>>,
    comparator: Comparator<E<D>>,
    policy: ActionPolicy,
    initial: S<D>,
    current: S<D>,
    instance: D::Instance,
    history: StateHistory<S<D>>,
    metadata: RunMetadata,
}

impl<D: Definition> Engine<D> {
    /// Start a new run in the definition's initial state.
    pub fn new(definition: Arc<D>) -> Result<Self, EngineError> {
        let initial = validate::initial_state(definition.as_ref())?;
        let instance = definition.new_instance();

        Ok(Self::assemble(
            definition,
            initial.clone(),
            initial,
            instance,
            StateHistory::new(),
            RunMetadata::default(),
        ))
    }

    /// Resume a run from a checkpoint.
    pub fn restore(
        definition: Arc<D>,
        checkpoint: Checkpoint<S<D>, D::Instance>,
    ) -> Result<Self, EngineError> {
        validate::check(definition.as_ref())?;
        checkpoint.validate_against(definition.as_ref())?;

        Ok(Self::assemble(
            definition,
            checkpoint.initial_state,
            checkpoint.current_state,
            checkpoint.instance,
            checkpoint.history,
            checkpoint.metadata,
        ))
    }

    fn assemble(
        definition: Arc<D>,
        initial: S<D>,
        current: S<D>,
        instance: D::Instance,
        history: StateHistory<S<D>>,
        metadata: RunMetadata,
    ) -> Self {
        Self {
            transitions: definition.transitions(),
            comparator: resolve::<E<D>>(),
            policy: definition.action_policy(),
            definition,
            initial,
            current,
            instance,
            history,
            metadata,
        }
    }

    /// Current state (pure).
    pub fn current(&self) -> &S<D> {
        &self.current
    }

    pub fn is_done(&self) -> bool {
        self.current.is_done()
    }

    pub fn is_failed(&self) -> bool {
        self.current.is_done() && self.current.is_failed()
    }

    pub fn history(&self) -> &StateHistory<S<D>> {
        &self.history
    }

    pub fn instance(&self) -> &D::Instance {
        &self.instance
    }

    pub fn definition(&self) -> &Arc<D> {
        &self.definition
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.metadata.ticks
    }

    /// Events of equality-guarded transitions leaving the current state.
    pub fn available_events(&self) -> Vec<&E<D>> {
        self.transitions
            .iter()
            .filter(|t| t.from == self.current)
            .filter_map(|t| t.guard.event())
            .collect()
    }

    /// Whether `event` would fire a transition from the current state.
    pub fn can(&self, event: &E<D>) -> bool {
        select(&self.transitions, &self.current, event, &self.comparator).is_some()
    }

    /// Run one observe, transition, act round.
    ///
    /// A failed observation or a rejected transition leaves the state
    /// unchanged. No matching transition is not an error.
    pub async fn tick(&mut self) -> Result<TickOutcome<S<D>>, EngineError> {
        let helper = Helper::new(self.current.clone());
        let event = self
            .instance
            .observe(&helper)
            .await
            .map_err(EngineError::Observe)?;

        self.apply(event, false).await
    }

    /// Feed `event` directly, skipping observation.
    ///
    /// Unlike [`Engine::tick`], an event that matches no transition is an
    /// error.
    pub async fn send(&mut self, event: E<D>) -> Result<TickOutcome<S<D>>, EngineError> {
        self.apply(event, true).await
    }

    async fn apply(
        &mut self,
        event: E<D>,
        require_match: bool,
    ) -> Result<TickOutcome<S<D>>, EngineError> {
        let tick = self.metadata.ticks + 1;
        let from = self.current.clone();
        let selected = select(&self.transitions, &from, &event, &self.comparator).map(|(i, _)| i);

        let outcome = match selected {
            Some(index) => {
                let transition = &self.transitions[index];
                let helper = Helper::new(from.clone());
                self.instance
                    .before_transition(&helper, transition, &event)
                    .await
                    .map_err(|source| EngineError::Transition {
                        from: from.name().to_string(),
                        to: transition.to.name().to_string(),
                        source,
                    })?;

                let to = transition.to.clone();
                debug!(from = from.name(), to = to.name(), index, tick, "transition committed");
                self.current = to.clone();
                self.history.push(StateTransition {
                    from: from.clone(),
                    to: to.clone(),
                    timestamp: Utc::now(),
                    tick,
                });
                TickOutcome::Transitioned { from, to, index }
            }
            None if require_match => {
                return Err(EngineError::NoTransition {
                    state: from.name().to_string(),
                    event: format!("{:?}", event),
                });
            }
            None => {
                debug!(state = from.name(), tick, "no transition matched");
                TickOutcome::Stayed(from)
            }
        };

        self.metadata.ticks = tick;
        self.metadata.updated_at = Utc::now();

        if outcome.transitioned() || self.policy == ActionPolicy::EveryTick {
            let helper = Helper::new(self.current.clone());
            self.instance
                .action(&helper, &event)
                .await
                .map_err(|source| EngineError::Action {
                    state: self.current.name().to_string(),
                    source,
                })?;
        }

        Ok(outcome)
    }
}

impl<D> Engine<D>
where
    D: Definition,
    D::Instance: Clone,
{
    /// Snapshot the run.
    pub fn checkpoint(&self) -> Checkpoint<S<D>, D::Instance> {
        Checkpoint::new(
            self.definition.name(),
            self.initial.clone(),
            self.current.clone(),
            self.instance.clone(),
            self.history.clone(),
            self.metadata.clone(),
        )
    }
}
