//! The execution substrate behind durable jobs.
//!
//! [`Substrate`] is the whole contract the FSM adapter needs: run a named
//! task with retries and a timeout, host long-lived jobs, and route signals,
//! queries and cancellation to them. [`LocalRuntime`] implements it
//! in-process on tokio; a remote workflow service can implement the same
//! trait.

use crate::durable::context::{JobContext, Mailboxes, QueryHandler};
use crate::durable::error::{JobError, TaskError};
use crate::durable::options::DurableOptions;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

pub type TaskFuture = BoxFuture<'static, anyhow::Result<Value>>;
pub type TaskHandler = Arc<dyn Fn(Value) -> TaskFuture + Send + Sync>;
pub type JobFuture = BoxFuture<'static, Result<(), JobError>>;
pub type JobHandler = Arc<dyn Fn(JobContext) -> JobFuture + Send + Sync>;

/// Durable execution backend.
///
/// Tasks are delivered at least once and must be idempotent given their
/// input. Registration replaces any earlier handler with the same name.
#[async_trait]
pub trait Substrate: Send + Sync + 'static {
    fn register_task(&self, name: &str, handler: TaskHandler);

    fn register_job_type(&self, job_type: &str, handler: JobHandler);

    /// Run task `name`, retrying per `options.retry`, each attempt bounded
    /// by `options.task_timeout`.
    async fn execute_task(
        &self,
        name: &str,
        input: Value,
        options: &DurableOptions,
    ) -> Result<Value, TaskError>;

    /// Start job `job_id`. Returns once the job body reports ready, so its
    /// queries answer right away.
    async fn start_job(&self, job_type: &str, job_id: &str) -> Result<(), JobError>;

    async fn signal(&self, job_id: &str, signal: &str, payload: Value) -> Result<(), JobError>;

    async fn query(&self, job_id: &str, query: &str) -> Result<Value, JobError>;

    /// Request cancellation; the job observes it at its next wait or phase.
    async fn cancel(&self, job_id: &str) -> Result<(), JobError>;

    /// Wait for the job to finish and return its outcome.
    async fn wait(&self, job_id: &str) -> Result<(), JobError>;
}

type Outcome = Option<Result<(), JobError>>;

struct JobEntry {
    mailboxes: Arc<Mailboxes>,
    queries: Arc<DashMap<String, QueryHandler>>,
    cancel: watch::Sender<bool>,
    outcome: watch::Receiver<Outcome>,
}

impl JobEntry {
    fn is_running(&self) -> bool {
        self.outcome.borrow().is_none()
    }
}

#[derive(Default)]
struct Registry {
    tasks: DashMap<String, TaskHandler>,
    job_types: DashMap<String, JobHandler>,
    jobs: DashMap<String, JobEntry>,
}

/// In-process [`Substrate`] on the tokio runtime.
///
/// Cheap to clone; clones share registries and jobs. Jobs run as spawned
/// tokio tasks, so a tokio runtime must be active when they start.
#[derive(Clone, Default)]
pub struct LocalRuntime {
    registry: Arc<Registry>,
}

impl LocalRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.registry.tasks.contains_key(name)
    }

    /// Registered task names, sorted.
    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry
            .tasks
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.registry
            .jobs
            .get(job_id)
            .map(|job| job.is_running())
            .unwrap_or(false)
    }

    fn task(&self, name: &str) -> Result<TaskHandler, TaskError> {
        self.registry
            .tasks
            .get(name)
            .map(|handler| Arc::clone(handler.value()))
            .ok_or_else(|| TaskError::NotRegistered(name.to_string()))
    }
}

#[async_trait]
impl Substrate for LocalRuntime {
    fn register_task(&self, name: &str, handler: TaskHandler) {
        debug!(task = name, "task registered");
        self.registry.tasks.insert(name.to_string(), handler);
    }

    fn register_job_type(&self, job_type: &str, handler: JobHandler) {
        debug!(job_type, "job type registered");
        self.registry.job_types.insert(job_type.to_string(), handler);
    }

    async fn execute_task(
        &self,
        name: &str,
        input: Value,
        options: &DurableOptions,
    ) -> Result<Value, TaskError> {
        let handler = self.task(name)?;
        let policy = &options.retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let running = tokio::spawn(handler(input.clone()));
            let abort = running.abort_handle();

            let failure = match tokio::time::timeout(options.task_timeout, running).await {
                Ok(Ok(Ok(output))) => return Ok(output),
                Ok(Ok(Err(e))) => format!("{e:#}"),
                Ok(Err(join)) => format!("task panicked: {join}"),
                Err(_) => {
                    abort.abort();
                    format!("timed out after {:?}", options.task_timeout)
                }
            };

            if attempt >= max_attempts {
                return Err(TaskError::Exhausted {
                    task: name.to_string(),
                    attempts: attempt,
                    last_error: failure,
                });
            }

            let delay = policy.delay_for(attempt);
            warn!(task = name, attempt, error = %failure, ?delay, "task attempt failed, retrying");
            tokio::time::sleep(delay).await;
        }
    }

    async fn start_job(&self, job_type: &str, job_id: &str) -> Result<(), JobError> {
        let handler = self
            .registry
            .job_types
            .get(job_type)
            .map(|handler| Arc::clone(handler.value()))
            .ok_or_else(|| JobError::UnknownJobType(job_type.to_string()))?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (outcome_tx, outcome_rx) = watch::channel::<Outcome>(None);
        let (ready_tx, mut ready_rx) = watch::channel(false);
        let mailboxes = Arc::new(Mailboxes::default());
        let queries = Arc::new(DashMap::new());

        let entry = JobEntry {
            mailboxes: Arc::clone(&mailboxes),
            queries: Arc::clone(&queries),
            cancel: cancel_tx,
            outcome: outcome_rx,
        };

        match self.registry.jobs.entry(job_id.to_string()) {
            Entry::Occupied(existing) if existing.get().is_running() => {
                return Err(JobError::AlreadyRunning(job_id.to_string()));
            }
            Entry::Occupied(mut finished) => {
                finished.insert(entry);
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }

        let substrate: Arc<dyn Substrate> = Arc::new(self.clone());
        let ctx = JobContext::new(job_id, substrate, mailboxes, queries, cancel_rx, ready_tx);
        let body = tokio::spawn(handler(ctx));

        tokio::spawn(async move {
            let result = match body.await {
                Ok(result) => result,
                Err(join) => Err(JobError::Aborted(join.to_string())),
            };
            outcome_tx.send_replace(Some(result));
        });

        // the sender drops with the context if the body ends before ready
        let ready = ready_rx.wait_for(|ready| *ready).await.is_ok();
        debug!(job_type, job_id, ready, "job started");
        Ok(())
    }

    async fn signal(&self, job_id: &str, signal: &str, payload: Value) -> Result<(), JobError> {
        let sender = {
            let job = self
                .registry
                .jobs
                .get(job_id)
                .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
            if !job.is_running() {
                return Err(JobError::NotRunning(job_id.to_string()));
            }
            job.mailboxes.sender(signal)
        };

        sender
            .and_then(|tx| tx.send(payload).ok())
            .ok_or_else(|| JobError::NotRunning(job_id.to_string()))
    }

    async fn query(&self, job_id: &str, query: &str) -> Result<Value, JobError> {
        let handler = {
            let job = self
                .registry
                .jobs
                .get(job_id)
                .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
            job.queries.get(query).map(|h| Arc::clone(h.value()))
        };

        let handler = handler.ok_or_else(|| JobError::UnknownQuery {
            job_id: job_id.to_string(),
            query: query.to_string(),
        })?;

        handler().map_err(|e| JobError::QueryFailed {
            query: query.to_string(),
            message: format!("{e:#}"),
        })
    }

    async fn cancel(&self, job_id: &str) -> Result<(), JobError> {
        let job = self
            .registry
            .jobs
            .get(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        job.cancel.send_replace(true);
        Ok(())
    }

    async fn wait(&self, job_id: &str) -> Result<(), JobError> {
        let mut outcome = self
            .registry
            .jobs
            .get(job_id)
            .map(|job| job.outcome.clone())
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        let result = match outcome.wait_for(|o| o.is_some()).await {
            Ok(done) => (*done).clone(),
            Err(_) => None,
        };
        result.unwrap_or_else(|| Err(JobError::Aborted(format!("job '{job_id}' vanished"))))
    }
}
