//! Remote handle to a durable FSM job.

use crate::core::State;
use crate::durable::adapter::{STATE_QUERY, TICK_SIGNAL};
use crate::durable::error::JobError;
use crate::durable::runtime::Substrate;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Talks to one job through its substrate.
///
/// Mirrors the in-process engine's surface: `current` reads the last
/// committed state and `tick` asks for an early round.
pub struct FsmClient<S> {
    job_id: String,
    substrate: Arc<dyn Substrate>,
    _state: PhantomData<fn() -> S>,
}

impl<S> Clone for FsmClient<S> {
    fn clone(&self) -> Self {
        Self {
            job_id: self.job_id.clone(),
            substrate: Arc::clone(&self.substrate),
            _state: PhantomData,
        }
    }
}

impl<S> fmt::Debug for FsmClient<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsmClient")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}

impl<S: State> FsmClient<S> {
    pub fn new(job_id: impl Into<String>, substrate: Arc<dyn Substrate>) -> Self {
        Self {
            job_id: job_id.into(),
            substrate,
            _state: PhantomData,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Last state the job committed.
    pub async fn current(&self) -> Result<S, JobError> {
        let value = self.substrate.query(&self.job_id, STATE_QUERY).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Wake the job so its next round starts without waiting out the tick
    /// interval.
    pub async fn tick(&self) -> Result<(), JobError> {
        self.substrate
            .signal(&self.job_id, TICK_SIGNAL, Value::Null)
            .await
    }

    pub async fn cancel(&self) -> Result<(), JobError> {
        self.substrate.cancel(&self.job_id).await
    }

    /// Wait until the job ends.
    pub async fn wait(&self) -> Result<(), JobError> {
        self.substrate.wait(&self.job_id).await
    }
}
