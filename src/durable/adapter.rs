//! Runs an FSM definition as a durable job.
//!
//! Each round executes three tasks in order (observe, transition, action)
//! and commits the resulting state and instance only once all three have
//! returned. The committed record is persisted to the [`JobStore`] and
//! published to the "state" query; between rounds the job waits for a
//! "tick" signal or for the tick interval to elapse.

use crate::builder::{validate, DefinitionError};
use crate::checkpoint::{Checkpoint, RunMetadata};
use crate::core::{State, StateHistory, StateTransition};
use crate::definition::{ActionPolicy, Definition, Helper};
use crate::durable::client::FsmClient;
use crate::durable::context::JobContext;
use crate::durable::error::JobError;
use crate::durable::options::DurableOptions;
use crate::durable::runtime::{JobFuture, JobHandler, Substrate};
use crate::durable::store::JobStore;
use crate::durable::tasks::{self, TaskNames, TaskOutput, TaskRequest};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Query answered by every FSM job with its last committed state.
pub const STATE_QUERY: &str = "state";

/// Signal that starts the next round early.
pub const TICK_SIGNAL: &str = "tick";

type Record<D> = Checkpoint<<D as Definition>::State, <D as Definition>::Instance>;
type Output<D> =
    TaskOutput<<D as Definition>::State, <D as Definition>::Event, <D as Definition>::Instance>;

/// An FSM definition registered on a [`Substrate`].
///
/// # Example
///
/// ```rust,no_run
/// # use durable_fsm::durable::{DurableFsm, DurableOptions, LocalRuntime, MemoryJobStore};
/// # use std::sync::Arc;
/// # async fn demo<D>(definition: D) -> Result<(), Box<dyn std::error::Error>>
/// # where
/// #     D: durable_fsm::definition::Definition,
/// #     D::Event: serde::Serialize + serde::de::DeserializeOwned,
/// #     D::Instance: serde::Serialize + serde::de::DeserializeOwned,
/// # {
/// let fsm = DurableFsm::register(
///     Arc::new(definition),
///     Arc::new(LocalRuntime::new()),
///     Arc::new(MemoryJobStore::new()),
///     DurableOptions::default(),
/// )?;
///
/// let job = fsm.start("order-42").await?;
/// job.tick().await?;
/// job.wait().await?;
/// # Ok(())
/// # }
/// ```
pub struct DurableFsm<D: Definition> {
    job: Arc<FsmJob<D>>,
    substrate: Arc<dyn Substrate>,
}

struct FsmJob<D: Definition> {
    definition: Arc<D>,
    initial: D::State,
    names: TaskNames,
    options: DurableOptions,
    store: Arc<dyn JobStore>,
}

impl<D> DurableFsm<D>
where
    D: Definition,
    D::Event: Serialize + DeserializeOwned,
    D::Instance: Serialize + DeserializeOwned,
{
    /// Validate `definition`, then register its tasks and job type.
    pub fn register(
        definition: Arc<D>,
        substrate: Arc<dyn Substrate>,
        store: Arc<dyn JobStore>,
        options: DurableOptions,
    ) -> Result<Self, DefinitionError> {
        let initial = validate::initial_state(definition.as_ref())?;
        let names = TaskNames::new(definition.name());
        tasks::register(definition.as_ref(), &names, substrate.as_ref());

        let job = Arc::new(FsmJob {
            definition,
            initial,
            names,
            options,
            store,
        });

        let body = Arc::clone(&job);
        let handler: JobHandler = Arc::new(move |ctx: JobContext| -> JobFuture {
            let job = Arc::clone(&body);
            Box::pin(async move { job.run(ctx).await })
        });
        substrate.register_job_type(job.definition.name(), handler);

        info!(definition = job.definition.name(), "FSM registered");
        Ok(Self { job, substrate })
    }

    /// Job type name; the definition name.
    pub fn job_type(&self) -> &str {
        self.job.definition.name()
    }

    pub fn options(&self) -> &DurableOptions {
        &self.job.options
    }

    /// Start job `job_id`, resuming its stored record if there is one.
    ///
    /// Returns once the job answers the "state" query.
    pub async fn start(&self, job_id: &str) -> Result<FsmClient<D::State>, JobError> {
        self.substrate.start_job(self.job_type(), job_id).await?;
        Ok(self.client(job_id))
    }

    /// Start a job under a fresh random id.
    pub async fn start_new(&self) -> Result<FsmClient<D::State>, JobError> {
        let job_id = uuid::Uuid::new_v4().to_string();
        self.start(&job_id).await
    }

    /// Handle to an existing job.
    pub fn client(&self, job_id: &str) -> FsmClient<D::State> {
        FsmClient::new(job_id, Arc::clone(&self.substrate))
    }
}

impl<D> FsmJob<D>
where
    D: Definition,
    D::Event: Serialize + DeserializeOwned,
    D::Instance: Serialize + DeserializeOwned,
{
    async fn run(&self, ctx: JobContext) -> Result<(), JobError> {
        let job_id = ctx.job_id().to_string();
        let (mut record, resumed) = self.seed(&job_id).await?;
        info!(
            job_id = %job_id,
            definition = self.definition.name(),
            state = record.current_state.name(),
            resumed,
            "FSM job started"
        );

        let (committed, watcher) = watch::channel(record.current_state.clone());
        ctx.set_query_handler(STATE_QUERY, move || {
            Ok(serde_json::to_value(&*watcher.borrow())?)
        });
        let mut tick = ctx.signal_channel(TICK_SIGNAL)?;
        ctx.ready();

        while !record.current_state.is_done() {
            self.round(&ctx, &mut record).await?;

            self.store.save(&job_id, record.to_binary()?).await?;
            committed.send_replace(record.current_state.clone());

            if record.current_state.is_done() {
                break;
            }

            tokio::select! {
                _ = tick.receive_with_timeout(self.options.tick_wait) => {}
                _ = ctx.cancelled() => {
                    warn!(job_id = %job_id, state = record.current_state.name(), "FSM job cancelled");
                    return Err(JobError::Cancelled(job_id));
                }
            }
        }

        self.finish(&job_id, &record)
    }

    /// Load the stored record of `job_id`, or create and persist a fresh one.
    async fn seed(&self, job_id: &str) -> Result<(Record<D>, bool), JobError> {
        if let Some(bytes) = self.store.load(job_id).await? {
            let record: Record<D> = Checkpoint::from_binary(&bytes)?;
            record.validate_against(self.definition.as_ref())?;
            return Ok((record, true));
        }

        let record = Checkpoint::new(
            self.definition.name(),
            self.initial.clone(),
            self.initial.clone(),
            self.definition.new_instance(),
            StateHistory::new(),
            RunMetadata::default(),
        );
        self.store.save(job_id, record.to_binary()?).await?;
        Ok((record, false))
    }

    /// One observe, transition, act round. `record` changes only if all
    /// three tasks succeed.
    async fn round(&self, ctx: &JobContext, record: &mut Record<D>) -> Result<(), JobError> {
        let current = record.current_state.clone();
        let helper = Helper::new(current.clone());

        let observed = self
            .call(ctx, "observe", &self.names.observe(), &record.instance, &helper, None)
            .await?;
        let observation = observed
            .observation
            .ok_or_else(|| JobError::Codec("observe task returned no observation".to_string()))?;

        let moved = self
            .call(
                ctx,
                "transition",
                &self.names.transition(),
                &observed.instance,
                &helper,
                Some(&observation),
            )
            .await?;
        let next = moved.state.unwrap_or_else(|| current.clone());
        let fired = moved.transition;
        let mut instance = moved.instance;

        if let Some(index) = fired {
            debug!(
                job_id = ctx.job_id(),
                from = current.name(),
                to = next.name(),
                index,
                "transition selected"
            );
        }

        if fired.is_some() || self.definition.action_policy() == ActionPolicy::EveryTick {
            let helper = Helper::new(next.clone());
            let acted = self
                .call(
                    ctx,
                    "action",
                    &self.names.action(&next),
                    &instance,
                    &helper,
                    Some(&observation),
                )
                .await?;
            instance = acted.instance;
        }

        let now = Utc::now();
        let tick = record.metadata.ticks + 1;
        if fired.is_some() {
            record.history.push(StateTransition {
                from: current,
                to: next.clone(),
                timestamp: now,
                tick,
            });
        }
        record.current_state = next;
        record.instance = instance;
        record.timestamp = now;
        record.metadata.ticks = tick;
        record.metadata.updated_at = now;
        Ok(())
    }

    async fn call(
        &self,
        ctx: &JobContext,
        phase: &str,
        task: &str,
        instance: &D::Instance,
        helper: &Helper<D::State>,
        observation: Option<&D::Event>,
    ) -> Result<Output<D>, JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled(ctx.job_id().to_string()));
        }

        let input = serde_json::to_value(TaskRequest {
            instance,
            helper,
            observation,
        })?;
        let output = ctx
            .execute_task(task, input, &self.options)
            .await
            .map_err(|source| {
                error!(job_id = ctx.job_id(), phase, task, error = %source, "task failed");
                JobError::task(phase, source)
            })?;

        Ok(serde_json::from_value(output)?)
    }

    fn finish(&self, job_id: &str, record: &Record<D>) -> Result<(), JobError> {
        let state = &record.current_state;
        if state.is_failed() {
            warn!(job_id, state = state.name(), "FSM job ended in a failed state");
            return Err(JobError::FailedState {
                state: state.name().to_string(),
            });
        }

        info!(
            job_id,
            state = state.name(),
            ticks = record.metadata.ticks,
            "FSM job completed"
        );
        Ok(())
    }
}
