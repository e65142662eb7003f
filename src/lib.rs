//! durable-fsm: a generic finite-state-machine engine with a durable runner.
//!
//! An FSM type is described by a [`Definition`]: an ordered list of states
//! (the first is the initial state), an ordered transition table and a
//! factory for [`Instance`]s carrying the business logic. Driving a run is
//! a repeated three-phase cycle:
//!
//! 1. **Observe**: the instance reports an event
//! 2. **Transition**: the first transition leaving the current state whose
//!    guard matches the event fires
//! 3. **Act**: the instance's action runs with the new state visible
//!
//! Two drivers share this cycle. The [`Engine`] runs it in-process, one
//! `tick` at a time. [`DurableFsm`](durable::DurableFsm) runs each phase as
//! an independently retried task on a [`Substrate`](durable::Substrate),
//! persists the committed state after every round and resumes from it
//! after a restart.
//!
//! Guards compare events through a per-type comparator chosen by
//! [`Event::identity`] and cached on first use, see [`core::resolve`].
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use durable_fsm::builder::DefinitionBuilder;
//! use durable_fsm::definition::{Instance, StateReader};
//! use durable_fsm::{state_enum, Engine, Event, Identity};
//! use std::sync::Arc;
//!
//! state_enum! {
//!     pub enum Door {
//!         Closed,
//!         Open,
//!         Locked,
//!     }
//!     done: [Locked]
//! }
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum Knock {
//!     Push,
//!     Key,
//! }
//!
//! impl Event for Knock {
//!     fn identity() -> Identity<Self> {
//!         Identity::Variant
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Visitor {
//!     step: usize,
//! }
//!
//! #[async_trait]
//! impl Instance<Door, Knock> for Visitor {
//!     async fn observe(&mut self, _reader: &dyn StateReader<Door>) -> anyhow::Result<Knock> {
//!         self.step += 1;
//!         Ok(if self.step == 1 { Knock::Push } else { Knock::Key })
//!     }
//! }
//!
//! # tokio_test(async {
//! let definition = DefinitionBuilder::new("door")
//!     .states([Door::Closed, Door::Open, Door::Locked])
//!     .on(Door::Closed, Door::Open, Knock::Push)
//!     .on(Door::Open, Door::Locked, Knock::Key)
//!     .factory(Visitor::default)
//!     .build()
//!     .unwrap();
//!
//! let mut engine = Engine::new(Arc::new(definition)).unwrap();
//! while !engine.is_done() {
//!     engine.tick().await.unwrap();
//! }
//! assert_eq!(engine.current(), &Door::Locked);
//! # });
//! # fn tokio_test<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod builder;
pub mod checkpoint;
pub mod core;
pub mod definition;
pub mod durable;
pub mod engine;

// Re-export commonly used types
pub use crate::builder::{DefinitionBuilder, DefinitionError};
pub use crate::checkpoint::Checkpoint;
pub use crate::core::{Event, Guard, Identity, State, StateHistory, StateTransition, Transition};
pub use crate::definition::{ActionPolicy, Definition, Helper, Instance, StateReader};
pub use crate::engine::{Engine, EngineError, TickOutcome};
