//! Contracts between the engine and the business logic it drives.
//!
//! A [`Definition`] describes one FSM type: its states (the first one is the
//! initial state), the informational event list, the ordered transition
//! table and a factory for fresh [`Instance`]s. An instance carries the
//! private data of one run and implements the observe / transition / act
//! hooks.

use crate::core::{Event, State, Transition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Read-only view of the current state handed to instance hooks.
pub trait StateReader<S>: Send + Sync {
    fn current(&self) -> &S;
}

/// Plain state snapshot implementing [`StateReader`].
///
/// The engine and the durable tasks both hand hooks a `Helper`, so an
/// instance sees the same view whichever layer drives it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Helper<S: State> {
    pub state: S,
}

impl<S: State> Helper<S> {
    pub fn new(state: S) -> Self {
        Self { state }
    }
}

impl<S: State> StateReader<S> for Helper<S> {
    fn current(&self) -> &S {
        &self.state
    }
}

/// Whether the action hook runs on ticks that did not transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPolicy {
    /// Run the current state's action after every tick.
    #[default]
    EveryTick,
    /// Run the action only after a transition committed.
    OnTransition,
}

/// Business logic of one FSM run.
///
/// Instances must hold plain data only: the durable adapter serializes them
/// between tasks, so any connection or handle has to be re-acquired inside
/// the hooks.
#[async_trait]
pub trait Instance<S: State, E: Event>: Send + Sync + 'static {
    /// Observe the outside world and report what happened.
    async fn observe(&mut self, reader: &dyn StateReader<S>) -> anyhow::Result<E>;

    /// Called with the selected transition before it commits. Returning an
    /// error leaves the state unchanged.
    async fn before_transition(
        &mut self,
        _reader: &dyn StateReader<S>,
        _transition: &Transition<S, E>,
        _event: &E,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Action for the state visible through `reader`.
    async fn action(&mut self, _reader: &dyn StateReader<S>, _event: &E) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Static description of an FSM type, shared read-only by all its runs.
pub trait Definition: Send + Sync + 'static {
    type State: State;
    type Event: Event;
    type Instance: Instance<Self::State, Self::Event>;

    /// Name of the FSM type. Durable jobs and task names derive from it.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// All states; the first one is the initial state.
    fn states(&self) -> Vec<Self::State>;

    /// Informational list of the events this FSM reacts to.
    fn events(&self) -> Vec<Self::Event> {
        Vec::new()
    }

    /// Transition table, tried in order.
    fn transitions(&self) -> Vec<Transition<Self::State, Self::Event>>;

    /// Fresh business-logic instance for a new run.
    fn new_instance(&self) -> Self::Instance;

    fn action_policy(&self) -> ActionPolicy {
        ActionPolicy::EveryTick
    }
}

/// Render the states, events and transitions of a definition as text.
pub fn describe<D: Definition>(definition: &D) -> String {
    let states = definition
        .states()
        .iter()
        .map(|state| format!("-  {}", state.name()))
        .collect();
    let events = definition
        .events()
        .iter()
        .map(|event| format!("-  {event:?}"))
        .collect();
    let transitions = definition
        .transitions()
        .iter()
        .enumerate()
        .map(|(index, t)| {
            format!("-  [{index}] {} -> {} {:?}", t.from.name(), t.to.name(), t.guard)
        })
        .collect();

    [
        section("STATES:", states),
        section("EVENTS:", events),
        section("TRANSITIONS:", transitions),
    ]
    .join("\n")
}

fn section(title: &str, lines: Vec<String>) -> String {
    let mut text = format!("{title}\n");
    for line in lines {
        text.push_str(&line);
        text.push('\n');
    }
    text
}
