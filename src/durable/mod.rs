//! Durable execution of FSM runs.
//!
//! [`DurableFsm`] turns the observe / transition / act cycle of a
//! [`Definition`](crate::definition::Definition) into a long-running job on
//! a [`Substrate`]. Each phase is an independently retried task, the
//! committed state and instance are persisted after every round, and a job
//! started again under the same id resumes from its last commit.
//!
//! External callers talk to a job through an [`FsmClient`]: the `"state"`
//! query returns the last committed state and the `"tick"` signal starts
//! the next round without waiting for the tick interval.

pub mod adapter;
pub mod client;
pub mod context;
pub mod error;
pub mod options;
pub mod runtime;
pub mod store;
pub mod tasks;

pub use adapter::{DurableFsm, STATE_QUERY, TICK_SIGNAL};
pub use client::FsmClient;
pub use context::{JobContext, SignalChannel};
pub use error::{JobError, StoreError, TaskError};
pub use options::{DurableOptions, DurableOptionsBuilder, RetryPolicy};
pub use runtime::{JobFuture, JobHandler, LocalRuntime, Substrate, TaskFuture, TaskHandler};
pub use store::{JobStore, MemoryJobStore};
pub use tasks::TaskNames;
