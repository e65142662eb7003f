//! The named tasks a durable FSM job is made of.
//!
//! Every FSM type registers one observe task, one transition task and one
//! action task per state. Each task receives the instance, a [`Helper`] with
//! the state and (for transition and action) the observation, and returns
//! the possibly updated instance. Tasks hold no state of their own, so a
//! retried task given the same input produces the same output.

use crate::core::{resolve, select, Comparator, State, Transition};
use crate::definition::{Definition, Helper, Instance};
use crate::durable::runtime::{Substrate, TaskFuture, TaskHandler};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Task names of one FSM type, namespaced by the definition name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskNames {
    prefix: String,
}

impl TaskNames {
    pub fn new(definition: &str) -> Self {
        Self {
            prefix: definition.to_string(),
        }
    }

    pub fn observe(&self) -> String {
        format!("{}::observe", self.prefix)
    }

    pub fn transition(&self) -> String {
        format!("{}::transition", self.prefix)
    }

    pub fn action<S: State>(&self, state: &S) -> String {
        format!("{}::{}::action", self.prefix, state.name())
    }
}

/// Task input as sent by the job. Borrows so the job keeps its record.
#[derive(Serialize)]
#[serde(bound(serialize = "S: State, E: Serialize, I: Serialize"))]
pub struct TaskRequest<'a, S: State, E, I> {
    pub instance: &'a I,
    pub helper: &'a Helper<S>,
    pub observation: Option<&'a E>,
}

/// Task input as received by a task.
#[derive(Deserialize)]
#[serde(bound(deserialize = "S: State, E: DeserializeOwned, I: DeserializeOwned"))]
pub struct TaskInput<S: State, E, I> {
    pub instance: I,
    pub helper: Helper<S>,
    pub observation: Option<E>,
}

/// What a task hands back to the job.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: State, E: Serialize, I: Serialize",
    deserialize = "S: State, E: DeserializeOwned, I: DeserializeOwned"
))]
pub struct TaskOutput<S: State, E, I> {
    pub instance: I,
    /// State after the transition task; `None` for other tasks.
    pub state: Option<S>,
    /// Index of the transition that fired, if any.
    pub transition: Option<usize>,
    /// Observation produced by the observe task.
    pub observation: Option<E>,
}

impl<S: State, E, I> TaskOutput<S, E, I> {
    fn instance(instance: I) -> Self {
        Self {
            instance,
            state: None,
            transition: None,
            observation: None,
        }
    }
}

type Table<D> = Arc<Vec<Transition<<D as Definition>::State, <D as Definition>::Event>>>;

/// Register the observe, transition and per-state action tasks of
/// `definition` on `substrate`.
pub fn register<D>(definition: &D, names: &TaskNames, substrate: &dyn Substrate)
where
    D: Definition,
    D::Event: Serialize + DeserializeOwned,
    D::Instance: Serialize + DeserializeOwned,
{
    let observe: TaskHandler = Arc::new(observe_task::<D>);
    substrate.register_task(&names.observe(), observe);

    let table: Table<D> = Arc::new(definition.transitions());
    let comparator = resolve::<D::Event>();
    let transition: TaskHandler =
        Arc::new(move |input| transition_task::<D>(Arc::clone(&table), comparator, input));
    substrate.register_task(&names.transition(), transition);

    for state in definition.states() {
        let action: TaskHandler = Arc::new(action_task::<D>);
        substrate.register_task(&names.action(&state), action);
    }
}

fn observe_task<D>(input: Value) -> TaskFuture
where
    D: Definition,
    D::Event: Serialize + DeserializeOwned,
    D::Instance: Serialize + DeserializeOwned,
{
    Box::pin(async move {
        let input: TaskInput<D::State, D::Event, D::Instance> = serde_json::from_value(input)?;
        let mut instance = input.instance;
        let observation = instance.observe(&input.helper).await?;

        let output = TaskOutput {
            observation: Some(observation),
            ..TaskOutput::<D::State, D::Event, D::Instance>::instance(instance)
        };
        Ok(serde_json::to_value(output)?)
    })
}

fn transition_task<D>(
    table: Table<D>,
    comparator: Comparator<D::Event>,
    input: Value,
) -> TaskFuture
where
    D: Definition,
    D::Event: Serialize + DeserializeOwned,
    D::Instance: Serialize + DeserializeOwned,
{
    Box::pin(async move {
        let input: TaskInput<D::State, D::Event, D::Instance> = serde_json::from_value(input)?;
        let observation = input
            .observation
            .ok_or_else(|| anyhow::anyhow!("transition task called without an observation"))?;
        let mut instance = input.instance;
        let current = input.helper.state.clone();

        let (state, fired) = match select(&table, &current, &observation, &comparator) {
            Some((index, transition)) => {
                instance
                    .before_transition(&input.helper, transition, &observation)
                    .await?;
                (transition.to.clone(), Some(index))
            }
            None => (current, None),
        };

        let output = TaskOutput {
            state: Some(state),
            transition: fired,
            ..TaskOutput::<D::State, D::Event, D::Instance>::instance(instance)
        };
        Ok(serde_json::to_value(output)?)
    })
}

fn action_task<D>(input: Value) -> TaskFuture
where
    D: Definition,
    D::Event: Serialize + DeserializeOwned,
    D::Instance: Serialize + DeserializeOwned,
{
    Box::pin(async move {
        let input: TaskInput<D::State, D::Event, D::Instance> = serde_json::from_value(input)?;
        let observation = input
            .observation
            .ok_or_else(|| anyhow::anyhow!("action task called without an observation"))?;
        let mut instance = input.instance;
        instance.action(&input.helper, &observation).await?;

        let output = TaskOutput::<D::State, D::Event, D::Instance>::instance(instance);
        Ok(serde_json::to_value(output)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DefinitionBuilder, TableDefinition};
    use crate::core::{Event, Identity};
    use crate::definition::StateReader;
    use crate::durable::{DurableOptions, LocalRuntime};
    use async_trait::async_trait;

    crate::state_enum! {
        enum Light {
            Red,
            Green,
        }
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    enum Timer {
        Elapsed,
        Hold,
    }

    impl Event for Timer {
        fn identity() -> Identity<Self> {
            Identity::Variant
        }
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        observed: u32,
        actions: Vec<String>,
    }

    #[async_trait]
    impl Instance<Light, Timer> for Counter {
        async fn observe(&mut self, _reader: &dyn StateReader<Light>) -> anyhow::Result<Timer> {
            self.observed += 1;
            Ok(Timer::Elapsed)
        }

        async fn action(
            &mut self,
            reader: &dyn StateReader<Light>,
            _event: &Timer,
        ) -> anyhow::Result<()> {
            self.actions.push(reader.current().name().to_string());
            Ok(())
        }
    }

    fn definition() -> TableDefinition<Light, Timer, Counter> {
        DefinitionBuilder::new("light")
            .states([Light::Red, Light::Green])
            .on(Light::Red, Light::Green, Timer::Elapsed)
            .factory(Counter::default)
            .build()
            .unwrap()
    }

    fn setup() -> (LocalRuntime, TaskNames) {
        let runtime = LocalRuntime::new();
        let names = TaskNames::new("light");
        register(&definition(), &names, &runtime);
        (runtime, names)
    }

    fn request(state: Light, observation: Option<Timer>) -> Value {
        let helper = Helper::new(state);
        let instance = Counter::default();
        serde_json::to_value(TaskRequest {
            instance: &instance,
            helper: &helper,
            observation: observation.as_ref(),
        })
        .unwrap()
    }

    type Output = TaskOutput<Light, Timer, Counter>;

    #[test]
    fn names_are_namespaced() {
        let names = TaskNames::new("light");
        assert_eq!(names.observe(), "light::observe");
        assert_eq!(names.transition(), "light::transition");
        assert_eq!(names.action(&Light::Green), "light::Green::action");
    }

    #[test]
    fn registers_one_action_per_state() {
        let (runtime, _) = setup();
        assert_eq!(
            runtime.task_names(),
            vec![
                "light::Green::action",
                "light::Red::action",
                "light::observe",
                "light::transition",
            ]
        );
    }

    #[tokio::test]
    async fn observe_returns_observation_and_instance() {
        let (runtime, names) = setup();
        let output = runtime
            .execute_task(&names.observe(), request(Light::Red, None), &DurableOptions::default())
            .await
            .unwrap();
        let output: Output = serde_json::from_value(output).unwrap();

        assert!(matches!(output.observation, Some(Timer::Elapsed)));
        assert_eq!(output.instance.observed, 1);
        assert_eq!(output.state, None);
    }

    #[tokio::test]
    async fn transition_selects_first_match() {
        let (runtime, names) = setup();
        let output = runtime
            .execute_task(
                &names.transition(),
                request(Light::Red, Some(Timer::Elapsed)),
                &DurableOptions::default(),
            )
            .await
            .unwrap();
        let output: Output = serde_json::from_value(output).unwrap();

        assert_eq!(output.state, Some(Light::Green));
        assert_eq!(output.transition, Some(0));
    }

    #[tokio::test]
    async fn transition_without_match_keeps_state() {
        let (runtime, names) = setup();
        let output = runtime
            .execute_task(
                &names.transition(),
                request(Light::Red, Some(Timer::Hold)),
                &DurableOptions::default(),
            )
            .await
            .unwrap();
        let output: Output = serde_json::from_value(output).unwrap();

        assert_eq!(output.state, Some(Light::Red));
        assert_eq!(output.transition, None);
    }

    #[tokio::test]
    async fn repeated_task_gives_same_output() {
        let (runtime, names) = setup();
        let input = request(Light::Green, Some(Timer::Elapsed));
        let options = DurableOptions::default();

        let first = runtime
            .execute_task(&names.action(&Light::Green), input.clone(), &options)
            .await
            .unwrap();
        let second = runtime
            .execute_task(&names.action(&Light::Green), input, &options)
            .await
            .unwrap();

        assert_eq!(first, second);
        let output: Output = serde_json::from_value(first).unwrap();
        assert_eq!(output.instance.actions, vec!["Green".to_string()]);
    }

    #[tokio::test]
    async fn missing_observation_fails_transition() {
        let (runtime, names) = setup();
        let options = DurableOptions::builder().max_attempts(1).build();
        let result = runtime
            .execute_task(&names.transition(), request(Light::Red, None), &options)
            .await;
        assert!(result.is_err());
    }
}
