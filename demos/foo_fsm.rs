//! Foo FSM
//!
//! This example runs the same state machine twice: once in-process with the
//! engine, once as a durable job on the local runtime.
//!
//! Key concepts:
//! - Observation-driven transitions with predicate guards
//! - First-match transition selection
//! - Terminal and failed states
//! - Durable jobs: tick signal, state query, persisted record
//!
//! Run with: cargo run --example foo_fsm

use async_trait::async_trait;
use durable_fsm::core::{Event, Identity, Transition};
use durable_fsm::definition::{describe, Definition, Instance, StateReader};
use durable_fsm::durable::{DurableFsm, DurableOptions, LocalRuntime, MemoryJobStore};
use durable_fsm::{state_enum, Engine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

state_enum! {
    enum FooState {
        Running,
        Waiting,
        Done,
        Failed,
    }
    done: [Done, Failed]
    failed: [Failed]
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct FooObservation {
    something: String,
    service_up: bool,
}

impl Event for FooObservation {
    fn identity() -> Identity<Self> {
        Identity::structural()
    }
}

// Remembers the state it last observed. A state is acted on once before the
// machine tries to leave it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct FooInstance {
    last_state: Option<FooState>,
}

#[async_trait]
impl Instance<FooState, FooObservation> for FooInstance {
    async fn observe(
        &mut self,
        reader: &dyn StateReader<FooState>,
    ) -> anyhow::Result<FooObservation> {
        let current = reader.current().clone();
        let previous = self.last_state.replace(current.clone());

        if previous.as_ref() != Some(&current) {
            println!("new state {current}, just running its action");
            return Ok(FooObservation {
                service_up: true,
                ..FooObservation::default()
            });
        }

        println!("still in {current}, looking for a transition");
        let observation = match current {
            FooState::Running => FooObservation {
                something: "wait".to_string(),
                service_up: true,
            },
            FooState::Waiting => FooObservation {
                something: "done".to_string(),
                service_up: true,
            },
            _ => FooObservation::default(),
        };
        Ok(observation)
    }

    async fn before_transition(
        &mut self,
        reader: &dyn StateReader<FooState>,
        transition: &Transition<FooState, FooObservation>,
        event: &FooObservation,
    ) -> anyhow::Result<()> {
        println!("  before: {} -> {} on {:?}", reader.current(), transition.to, event);
        Ok(())
    }

    async fn action(
        &mut self,
        reader: &dyn StateReader<FooState>,
        _event: &FooObservation,
    ) -> anyhow::Result<()> {
        println!("  action: in {}", reader.current());
        Ok(())
    }
}

struct FooFsm;

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

    // Ranked by priority: when two rows match, the first one wins.
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
        FooInstance::default()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Foo FSM ===\n");
    println!("{}", describe(&FooFsm));

    println!("--- in-process engine ---");
    let mut engine = Engine::new(Arc::new(FooFsm))?;
    while !engine.is_done() {
        let outcome = engine.tick().await?;
        println!("tick {}: {}", engine.ticks(), outcome.state());
    }
    let path: Vec<String> = engine.history().get_path().iter().map(|s| s.to_string()).collect();
    println!("path: {}\n", path.join(" -> "));

    println!("--- durable job ---");
    let store = MemoryJobStore::new();
    let fsm = DurableFsm::register(
        Arc::new(FooFsm),
        Arc::new(LocalRuntime::new()),
        Arc::new(store.clone()),
        DurableOptions::builder()
            .tick_wait(Duration::from_millis(50))
            .build(),
    )?;

    let job = fsm.start("foo-demo").await?;
    job.tick().await?;
    job.wait().await?;
    println!("job {} finished in {}", job.job_id(), job.current().await?);
    println!("records stored: {}", store.len());

    Ok(())
}
