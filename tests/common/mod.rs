//! Shared fixtures for the scenario tests.

#![allow(dead_code)]

use async_trait::async_trait;
use durable_fsm::core::{Event, Identity, State, Transition};
use durable_fsm::definition::{Definition, Instance, StateReader};
use serde::{Deserialize, Serialize};

durable_fsm::state_enum! {
    pub enum FooState {
        Running,
        Waiting,
        Done,
        Failed,
    }
    done: [Done, Failed]
    failed: [Failed]
}

/// What the Foo instance sees of the outside world.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FooObservation {
    pub something: String,
    pub service_up: bool,
}

impl Event for FooObservation {
    fn identity() -> Identity<Self> {
        Identity::structural()
    }
}

/// Instance that advances only on the second tick spent in a state; the
/// first tick in a new state just runs its action.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FooInstance {
    pub last_state: Option<FooState>,
    pub service_up: bool,
    pub actions: Vec<String>,
    pub transitions: Vec<String>,
}

#[async_trait]
impl Instance<FooState, FooObservation> for FooInstance {
    async fn observe(&mut self, reader: &dyn StateReader<FooState>) -> anyhow::Result<FooObservation> {
        let current = reader.current().clone();
        let previous = self.last_state.replace(current.clone());

        if previous.as_ref() != Some(&current) {
            return Ok(FooObservation {
                something: String::new(),
                service_up: self.service_up,
            });
        }

        let something = match current {
            FooState::Running => "wait",
            FooState::Waiting => "done",
            _ => "",
        };
        Ok(FooObservation {
            something: something.to_string(),
            service_up: self.service_up,
        })
    }

    async fn before_transition(
        &mut self,
        _reader: &dyn StateReader<FooState>,
        transition: &Transition<FooState, FooObservation>,
        _event: &FooObservation,
    ) -> anyhow::Result<()> {
        self.transitions
            .push(format!("{} -> {}", transition.from, transition.to));
        Ok(())
    }

    async fn action(
        &mut self,
        reader: &dyn StateReader<FooState>,
        _event: &FooObservation,
    ) -> anyhow::Result<()> {
        self.actions.push(reader.current().name().to_string());
        Ok(())
    }
}

/// Hand-written definition of the Foo machine.
pub struct FooFsm {
    pub service_up: bool,
}

impl FooFsm {
    pub fn healthy() -> Self {
        Self { service_up: true }
    }

    pub fn service_down() -> Self {
        Self { service_up: false }
    }
}

impl Definition for FooFsm {
    type State = FooState;
    type Event = FooObservation;
    type Instance = FooInstance;

    fn name(&self) -> &str {
        "foo"
    }

    fn states(&self) -> Vec<FooState> {
        vec![
            FooState::Running,
            FooState::Waiting,
            FooState::Done,
            FooState::Failed,
        ]
    }

    fn transitions(&self) -> Vec<Transition<FooState, FooObservation>> {
        vec![
            Transition::when(FooState::Running, FooState::Waiting, |o: &FooObservation| {
                o.something == "wait"
            }),
            Transition::when(FooState::Waiting, FooState::Done, |o: &FooObservation| {
                o.something == "done"
            }),
            Transition::when(FooState::Waiting, FooState::Failed, |o: &FooObservation| {
                !o.service_up
            }),
            Transition::when(FooState::Running, FooState::Failed, |o: &FooObservation| {
                !o.service_up
            }),
            Transition::when(FooState::Done, FooState::Failed, |o: &FooObservation| {
                !o.service_up
            }),
        ]
    }

    fn new_instance(&self) -> FooInstance {
        FooInstance {
            service_up: self.service_up,
            ..FooInstance::default()
        }
    }
}
