//! What a running job sees of its substrate.

use crate::durable::error::{JobError, TaskError};
use crate::durable::options::DurableOptions;
use crate::durable::runtime::Substrate;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

pub(crate) type QueryHandler = Arc<dyn Fn() -> anyhow::Result<Value> + Send + Sync>;

/// Named signal mailboxes of one job.
///
/// Senders and receivers are created together on first use from either
/// side, so a signal sent before the job opened its channel is buffered.
#[derive(Default)]
pub(crate) struct Mailboxes {
    senders: DashMap<String, mpsc::UnboundedSender<Value>>,
    receivers: DashMap<String, mpsc::UnboundedReceiver<Value>>,
}

impl Mailboxes {
    fn ensure(&self, name: &str) {
        self.senders.entry(name.to_string()).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            self.receivers.insert(name.to_string(), rx);
            tx
        });
    }

    pub(crate) fn sender(&self, name: &str) -> Option<mpsc::UnboundedSender<Value>> {
        self.ensure(name);
        self.senders.get(name).map(|tx| tx.value().clone())
    }

    fn take_receiver(&self, name: &str) -> Option<mpsc::UnboundedReceiver<Value>> {
        self.ensure(name);
        self.receivers.remove(name).map(|(_, rx)| rx)
    }
}

/// Receiving end of a named signal.
pub struct SignalChannel {
    name: String,
    rx: mpsc::UnboundedReceiver<Value>,
}

impl SignalChannel {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next signal, at most `timeout`.
    pub async fn receive_with_timeout(&mut self, timeout: Duration) -> Option<Value> {
        tokio::time::timeout(timeout, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn receive(&mut self) -> Option<Value> {
        self.rx.recv().await
    }
}

/// Handle given to a job body by the substrate hosting it.
///
/// A body calls [`JobContext::ready`] once its queries and signal channels
/// are in place; starting a job returns only after that, or after the body
/// has ended.
pub struct JobContext {
    job_id: String,
    substrate: Arc<dyn Substrate>,
    mailboxes: Arc<Mailboxes>,
    queries: Arc<DashMap<String, QueryHandler>>,
    cancel: watch::Receiver<bool>,
    ready: watch::Sender<bool>,
}

impl JobContext {
    pub(crate) fn new(
        job_id: impl Into<String>,
        substrate: Arc<dyn Substrate>,
        mailboxes: Arc<Mailboxes>,
        queries: Arc<DashMap<String, QueryHandler>>,
        cancel: watch::Receiver<bool>,
        ready: watch::Sender<bool>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            substrate,
            mailboxes,
            queries,
            cancel,
            ready,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Answer queries named `name` with `handler` from now on.
    pub fn set_query_handler<F>(&self, name: &str, handler: F)
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.queries.insert(name.to_string(), Arc::new(handler));
    }

    /// Mark the job as able to answer queries and receive signals.
    pub fn ready(&self) {
        self.ready.send_replace(true);
    }

    /// Open the receiving end of signal `name`. Each channel opens once.
    pub fn signal_channel(&self, name: &str) -> Result<SignalChannel, JobError> {
        let rx = self
            .mailboxes
            .take_receiver(name)
            .ok_or_else(|| JobError::ChannelTaken(name.to_string()))?;
        Ok(SignalChannel {
            name: name.to_string(),
            rx,
        })
    }

    /// Run a named task through the substrate.
    pub async fn execute_task(
        &self,
        name: &str,
        input: Value,
        options: &DurableOptions,
    ) -> Result<Value, TaskError> {
        self.substrate.execute_task(name, input, options).await
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // substrate went away without cancelling
            futures::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signals_sent_before_open_are_buffered() {
        let mailboxes = Mailboxes::default();
        let tx = mailboxes.sender("tick").unwrap();
        tx.send(Value::from(1)).unwrap();

        let mut channel = SignalChannel {
            name: "tick".to_string(),
            rx: mailboxes.take_receiver("tick").unwrap(),
        };
        assert_eq!(
            channel.receive_with_timeout(Duration::from_millis(10)).await,
            Some(Value::from(1))
        );
    }

    #[tokio::test]
    async fn receive_times_out_without_signal() {
        let mailboxes = Mailboxes::default();
        let mut channel = SignalChannel {
            name: "tick".to_string(),
            rx: mailboxes.take_receiver("tick").unwrap(),
        };
        assert_eq!(
            channel.receive_with_timeout(Duration::from_millis(5)).await,
            None
        );
    }

    #[test]
    fn receiver_is_handed_out_once() {
        let mailboxes = Mailboxes::default();
        assert!(mailboxes.take_receiver("tick").is_some());
        assert!(mailboxes.take_receiver("tick").is_none());
    }
}
