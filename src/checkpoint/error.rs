//! Errors raised while encoding, decoding or resuming a run record.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckpointError {
    #[error("cannot encode run record: {0}")]
    Encode(String),

    #[error("cannot decode run record: {0}")]
    Decode(String),

    /// Record written by a newer or older format.
    #[error("run record format v{found} is not readable, expected v{supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("run record belongs to '{found}', not '{expected}'")]
    WrongDefinition { found: String, expected: String },

    /// The record's current state is missing from the definition.
    #[error("run record is in state '{0}', which the definition does not declare")]
    UndeclaredState(String),

    #[error("run record started in '{0}', but the definition starts elsewhere")]
    InitialStateMismatch(String),
}
