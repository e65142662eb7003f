//! The in-process transition engine.
//!
//! One [`Engine`] ties a definition, an instance and the current state
//! together and advances them one tick at a time:
//!
//! 1. `Instance::observe` produces an event
//! 2. the first transition from the current state whose guard matches fires;
//!    `before_transition` may veto it, otherwise the new state commits
//! 3. `Instance::action` runs with the new state visible
//!
//! The same selection rule is used by the durable adapter, so both layers
//! pick the same transition for the same observation.

mod error;
mod machine;

pub use error::{EngineError, TickOutcome};
pub use machine::Engine;
