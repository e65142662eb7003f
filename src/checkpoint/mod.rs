//! Checkpoints of a running FSM.
//!
//! A checkpoint is the durable job record: the last committed state, the
//! instance snapshot that goes with it and the transition history. The
//! in-process engine can export and restore one, and the durable adapter
//! persists one after every completed tick so a job survives restarts.

use crate::core::{State, StateHistory};
use crate::definition::Definition;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::CheckpointError;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Bookkeeping about a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// When the run was created
    pub created_at: DateTime<Utc>,

    /// When the last tick committed
    pub updated_at: DateTime<Utc>,

    /// Completed ticks
    pub ticks: u64,
}

impl Default for RunMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            ticks: 0,
        }
    }
}

/// Serializable snapshot of an FSM run.
///
/// Does not include the transition table; guards are code and live in the
/// definition the checkpoint is restored into.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "I: Serialize", deserialize = "I: DeserializeOwned"))]
pub struct Checkpoint<S: State, I> {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: String,

    /// When checkpoint was created
    pub timestamp: DateTime<Utc>,

    /// Name of the definition the run belongs to
    pub definition: String,

    /// Initial state of the run
    pub initial_state: S,

    /// Last committed state
    pub current_state: S,

    /// Instance snapshot matching `current_state`
    pub instance: I,

    /// Committed transitions
    pub history: StateHistory<S>,

    pub metadata: RunMetadata,
}

impl<S: State, I> Checkpoint<S, I> {
    /// Create a checkpoint with a fresh id and timestamp.
    pub fn new(
        definition: impl Into<String>,
        initial_state: S,
        current_state: S,
        instance: I,
        history: StateHistory<S>,
        metadata: RunMetadata,
    ) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            definition: definition.into(),
            initial_state,
            current_state,
            instance,
            history,
            metadata,
        }
    }

    /// Check that this checkpoint can be resumed under `definition`.
    pub fn validate_against<D>(&self, definition: &D) -> Result<(), CheckpointError>
    where
        D: Definition<State = S>,
    {
        if self.definition != definition.name() {
            return Err(CheckpointError::WrongDefinition {
                found: self.definition.clone(),
                expected: definition.name().to_string(),
            });
        }

        let states = definition.states();
        if !states.contains(&self.current_state) {
            return Err(CheckpointError::UndeclaredState(
                self.current_state.name().to_string(),
            ));
        }
        if states.first() != Some(&self.initial_state) {
            return Err(CheckpointError::InitialStateMismatch(
                self.initial_state.name().to_string(),
            ));
        }

        Ok(())
    }

    fn check_version(self) -> Result<Self, CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        Ok(self)
    }
}

impl<S: State, I: Serialize> Checkpoint<S, I> {
    /// Encode as pretty JSON.
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self).map_err(|e| CheckpointError::Encode(e.to_string()))
    }

    /// Encode with bincode.
    pub fn to_binary(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::Encode(e.to_string()))
    }
}

impl<S: State, I: DeserializeOwned> Checkpoint<S, I> {
    /// Decode from JSON, rejecting unknown format versions.
    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Self =
            serde_json::from_str(json).map_err(|e| CheckpointError::Decode(e.to_string()))?;
        checkpoint.check_version()
    }

    /// Decode from bincode, rejecting unknown format versions.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: Self =
            bincode::deserialize(bytes).map_err(|e| CheckpointError::Decode(e.to_string()))?;
        checkpoint.check_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Event, Identity, StateTransition, Transition};
    use crate::definition::{Instance, StateReader};
    use async_trait::async_trait;

    crate::state_enum! {
        enum Phase {
            Running,
            Waiting,
            Done,
        }
        done: [Done]
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        seen: u32,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Tick;

    impl Event for Tick {
        fn identity() -> Identity<Self> {
            Identity::structural()
        }
    }

    #[async_trait]
    impl Instance<Phase, Tick> for Counter {
        async fn observe(&mut self, _reader: &dyn StateReader<Phase>) -> anyhow::Result<Tick> {
            Ok(Tick)
        }
    }

    struct Pipeline;

    impl Definition for Pipeline {
        type State = Phase;
        type Event = Tick;
        type Instance = Counter;

        fn name(&self) -> &str {
            "pipeline"
        }

        fn states(&self) -> Vec<Phase> {
            vec![Phase::Running, Phase::Waiting, Phase::Done]
        }

        fn transitions(&self) -> Vec<Transition<Phase, Tick>> {
            vec![Transition::on(Phase::Running, Phase::Waiting, Tick)]
        }

        fn new_instance(&self) -> Counter {
            Counter { seen: 0 }
        }
    }

    fn sample() -> Checkpoint<Phase, Counter> {
        let history = StateHistory::new().record(StateTransition {
            from: Phase::Running,
            to: Phase::Waiting,
            timestamp: Utc::now(),
            tick: 1,
        });
        Checkpoint::new(
            "pipeline",
            Phase::Running,
            Phase::Waiting,
            Counter { seen: 3 },
            history,
            RunMetadata::default(),
        )
    }

    #[test]
    fn json_round_trip_preserves_run() {
        let checkpoint = sample();
        let json = checkpoint.to_json().unwrap();
        let restored: Checkpoint<Phase, Counter> = Checkpoint::from_json(&json).unwrap();

        assert_eq!(restored.id, checkpoint.id);
        assert_eq!(restored.current_state, Phase::Waiting);
        assert_eq!(restored.instance, Counter { seen: 3 });
        assert_eq!(restored.history.len(), 1);
    }

    #[test]
    fn binary_round_trip_preserves_run() {
        let checkpoint = sample();
        let bytes = checkpoint.to_binary().unwrap();
        let restored: Checkpoint<Phase, Counter> = Checkpoint::from_binary(&bytes).unwrap();

        assert_eq!(restored.current_state, Phase::Waiting);
        assert_eq!(restored.metadata, checkpoint.metadata);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut checkpoint = sample();
        checkpoint.version = CHECKPOINT_VERSION + 1;
        let json = checkpoint.to_json().unwrap();

        let result: Result<Checkpoint<Phase, Counter>, _> = Checkpoint::from_json(&json);
        assert!(matches!(
            result,
            Err(CheckpointError::UnsupportedVersion { found: 2, supported: 1 })
        ));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let result: Result<Checkpoint<Phase, Counter>, _> = Checkpoint::from_json("{");
        assert!(matches!(result, Err(CheckpointError::Decode(_))));
    }

    #[test]
    fn validate_against_checks_definition() {
        let checkpoint = sample();
        assert!(checkpoint.validate_against(&Pipeline).is_ok());

        let mut foreign = sample();
        foreign.definition = "other".to_string();
        assert_eq!(
            foreign.validate_against(&Pipeline),
            Err(CheckpointError::WrongDefinition {
                found: "other".to_string(),
                expected: Pipeline.name().to_string(),
            })
        );

        let mut shifted = sample();
        shifted.initial_state = Phase::Waiting;
        assert_eq!(
            shifted.validate_against(&Pipeline),
            Err(CheckpointError::InitialStateMismatch("Waiting".to_string()))
        );
    }
}
