//! Core state machine types.
//!
//! This module contains the pure part of the engine:
//! - State definitions via the `State` trait
//! - Event identity resolution shared across engines
//! - Guards and the first-match transition selection
//! - Immutable history tracking
//!
//! Nothing in here performs IO; observation and actions live in the
//! user-supplied `Instance`.

mod guard;
mod history;
mod identity;
mod state;
mod transition;

pub use guard::Guard;
pub use history::{StateHistory, StateTransition};
pub use identity::{is_resolved, resolve, Comparator, Event, Identity, IdentityKind};
pub use state::State;
pub use transition::{select, Transition};
