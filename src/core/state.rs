//! The `State` trait implemented by every FSM state type.
//!
//! States are small, comparable values. Terminal detection lives on the
//! state type itself so both the in-process engine and the durable adapter
//! can decide when a run is over without consulting the definition.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for state machine states.
///
/// # Required Traits
///
/// - `Clone`: states are copied into history records and task payloads
/// - `PartialEq`: transitions are matched on their `from` state
/// - `Debug`: states appear in diagnostics
/// - `Serialize` + `Deserialize`: states cross durable task boundaries and
///   are persisted in checkpoints
///
/// # Example
///
/// ```rust
/// use durable_fsm::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum DeployState {
///     Running,
///     Waiting,
///     Done,
///     Failed,
/// }
///
/// impl State for DeployState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Running => "Running",
///             Self::Waiting => "Waiting",
///             Self::Done => "Done",
///             Self::Failed => "Failed",
///         }
///     }
///
///     fn is_done(&self) -> bool {
///         matches!(self, Self::Done | Self::Failed)
///     }
///
///     fn is_failed(&self) -> bool {
///         matches!(self, Self::Failed)
///     }
/// }
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Name of the state, used for logging and to derive durable task names.
    ///
    /// Names must be unique within a definition.
    fn name(&self) -> &str;

    /// Check if this is a terminal state.
    ///
    /// The engine keeps ticking regardless; drivers such as the durable
    /// adapter stop once they observe a terminal state.
    ///
    /// Default implementation returns `false`.
    fn is_done(&self) -> bool {
        false
    }

    /// Check if this terminal state represents a failed run.
    ///
    /// Only meaningful when `is_done` is also true.
    ///
    /// Default implementation returns `false`.
    fn is_failed(&self) -> bool {
        false
    }
}
