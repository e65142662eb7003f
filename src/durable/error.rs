//! Errors of the durable layer.
//!
//! These cross task and job boundaries, so they carry rendered messages
//! instead of source errors and are `Clone`.

use crate::checkpoint::CheckpointError;
use thiserror::Error;

/// Failure of a named task after the runtime gave up on it.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("no task registered as '{0}'")]
    NotRegistered(String),

    #[error("task '{task}' failed after {attempts} attempt(s): {last_error}")]
    Exhausted {
        task: String,
        attempts: u32,
        last_error: String,
    },
}

/// Failure of the job record store.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("store backend failed: {0}")]
    Backend(String),
}

/// Terminal or request-level failure of a durable job.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum JobError {
    #[error("no job type registered as '{0}'")]
    UnknownJobType(String),

    #[error("job '{0}' not found")]
    NotFound(String),

    #[error("job '{0}' is already running")]
    AlreadyRunning(String),

    #[error("job '{0}' is not running")]
    NotRunning(String),

    #[error("job '{job_id}' has no query handler '{query}'")]
    UnknownQuery { job_id: String, query: String },

    #[error("query '{query}' failed: {message}")]
    QueryFailed { query: String, message: String },

    #[error("signal channel '{0}' is already in use")]
    ChannelTaken(String),

    /// A task of the given phase failed terminally.
    #[error("{phase} failed: {source}")]
    Task { phase: String, source: TaskError },

    /// The FSM reached a state flagged as failed.
    #[error("workflow failed with status {state:?}")]
    FailedState { state: String },

    #[error("job '{0}' was cancelled")]
    Cancelled(String),

    #[error("job aborted: {0}")]
    Aborted(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("checkpoint: {0}")]
    Checkpoint(String),

    #[error("payload encoding failed: {0}")]
    Codec(String),
}

impl JobError {
    pub(crate) fn task(phase: &str, source: TaskError) -> Self {
        JobError::Task {
            phase: phase.to_string(),
            source,
        }
    }
}

impl From<CheckpointError> for JobError {
    fn from(err: CheckpointError) -> Self {
        JobError::Checkpoint(err.to_string())
    }
}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        JobError::Codec(err.to_string())
    }
}
