//! Table-driven definitions built with a fluent API.

use crate::builder::error::DefinitionError;
use crate::builder::validate;
use crate::core::{Event, State, Transition};
use crate::definition::{ActionPolicy, Definition, Instance};
use std::sync::Arc;

type Factory<I> = Arc<dyn Fn() -> I + Send + Sync>;

/// A [`Definition`] assembled from data instead of a hand-written impl.
pub struct TableDefinition<S: State, E: Event, I> {
    name: String,
    states: Vec<S>,
    events: Vec<E>,
    transitions: Vec<Transition<S, E>>,
    factory: Factory<I>,
    action_policy: ActionPolicy,
}

impl<S, E, I> Definition for TableDefinition<S, E, I>
where
    S: State,
    E: Event,
    I: Instance<S, E>,
{
    type State = S;
    type Event = E;
    type Instance = I;

    fn name(&self) -> &str {
        &self.name
    }

    fn states(&self) -> Vec<S> {
        self.states.clone()
    }

    fn events(&self) -> Vec<E> {
        self.events.clone()
    }

    fn transitions(&self) -> Vec<Transition<S, E>> {
        self.transitions.clone()
    }

    fn new_instance(&self) -> I {
        (self.factory)()
    }

    fn action_policy(&self) -> ActionPolicy {
        self.action_policy
    }
}

/// Builder for [`TableDefinition`].
///
/// # Example
///
/// ```rust
/// use durable_fsm::builder::DefinitionBuilder;
/// use durable_fsm::core::{Event, Identity};
/// use durable_fsm::definition::{Definition, Instance, StateReader};
/// use durable_fsm::state_enum;
///
/// state_enum! {
///     pub enum Door {
///         Closed,
///         Open,
///     }
/// }
///
/// #[derive(Clone, Debug)]
/// enum Push {
///     Once,
/// }
///
/// impl Event for Push {
///     fn identity() -> Identity<Self> {
///         Identity::Variant
///     }
/// }
///
/// struct Hinge;
///
/// #[async_trait::async_trait]
/// impl Instance<Door, Push> for Hinge {
///     async fn observe(&mut self, _reader: &dyn StateReader<Door>) -> anyhow::Result<Push> {
///         Ok(Push::Once)
///     }
/// }
///
/// let door = DefinitionBuilder::new("door")
///     .states([Door::Closed, Door::Open])
///     .on(Door::Closed, Door::Open, Push::Once)
///     .on(Door::Open, Door::Closed, Push::Once)
///     .factory(|| Hinge)
///     .build()
///     .unwrap();
///
/// assert_eq!(door.states()[0], Door::Closed);
/// ```
pub struct DefinitionBuilder<S: State, E: Event, I> {
    name: String,
    states: Vec<S>,
    events: Vec<E>,
    transitions: Vec<Transition<S, E>>,
    factory: Option<Factory<I>>,
    action_policy: ActionPolicy,
}

impl<S, E, I> DefinitionBuilder<S, E, I>
where
    S: State,
    E: Event,
    I: Instance<S, E>,
{
    /// Create a new builder for a definition called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            events: Vec::new(),
            transitions: Vec::new(),
            factory: None,
            action_policy: ActionPolicy::default(),
        }
    }

    /// Declare a state. The first declared state is the initial state.
    pub fn state(mut self, state: S) -> Self {
        self.states.push(state);
        self
    }

    /// Declare several states in order.
    pub fn states(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.states.extend(states);
        self
    }

    /// Declare an event for documentation and rendering.
    pub fn event(mut self, event: E) -> Self {
        self.events.push(event);
        self
    }

    /// Append a pre-built transition.
    pub fn transition(mut self, transition: Transition<S, E>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Append an equality-triggered transition.
    pub fn on(self, from: S, to: S, event: E) -> Self {
        self.transition(Transition::on(from, to, event))
    }

    /// Append a predicate-guarded transition.
    pub fn when<F>(self, from: S, to: S, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.transition(Transition::when(from, to, predicate))
    }

    pub fn action_policy(mut self, policy: ActionPolicy) -> Self {
        self.action_policy = policy;
        self
    }

    /// Set the instance factory (required).
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Build and validate the definition.
    pub fn build(self) -> Result<TableDefinition<S, E, I>, DefinitionError> {
        let factory = self.factory.ok_or(DefinitionError::MissingFactory)?;

        let definition = TableDefinition {
            name: self.name,
            states: self.states,
            events: self.events,
            transitions: self.transitions,
            factory,
            action_policy: self.action_policy,
        };
        validate::check(&definition)?;

        Ok(definition)
    }
}
