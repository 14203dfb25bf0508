//! WebhookWorkerPool - bounded queue of verified webhooks and the workers
//! that drain it.
//!
//! `submit` waits while the queue is full, so a burst slows the gateway's
//! deliveries down instead of dropping events. Each job gets
//! `max_attempts` tries for retryable failures; the last failure is
//! recorded and raises a HIGH alert.
//!
//! ## Graceful Shutdown
//!
//! Once the shutdown signal flips, workers finish the jobs already queued
//! and exit. A job waiting out a retry backoff stops retrying and is
//! recorded as failed, so a redelivery or replay can pick it up.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use super::dispatcher::WebhookDispatcher;
use crate::application::monitoring::BillingMonitor;
use crate::application::BillingError;
use crate::config::WebhookConfig;
use crate::domain::webhook::WebhookEnvelope;

#[derive(Debug, thiserror::Error)]
#[error("webhook queue is closed")]
pub struct QueueClosed;

/// Sending half of the webhook queue.
#[derive(Clone)]
pub struct WebhookQueue {
    sender: mpsc::Sender<WebhookEnvelope>,
}

impl WebhookQueue {
    /// Enqueue a verified event, waiting for room when the queue is full.
    pub async fn submit(&self, envelope: WebhookEnvelope) -> Result<(), QueueClosed> {
        self.sender.send(envelope).await.map_err(|_| QueueClosed)
    }

    /// A queue with no workers; the caller drains the receiver.
    pub fn detached(capacity: usize) -> (Self, mpsc::Receiver<WebhookEnvelope>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.sender.capacity()
    }
}

pub struct WebhookWorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WebhookWorkerPool {
    /// Spawn `config.workers` workers over a queue of `config.queue_capacity`.
    pub fn start(
        config: &WebhookConfig,
        dispatcher: Arc<WebhookDispatcher>,
        monitor: Arc<BillingMonitor>,
        shutdown: watch::Receiver<bool>,
    ) -> (WebhookQueue, Self) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..config.workers)
            .map(|worker_id| {
                let worker = Worker {
                    id: worker_id,
                    receiver: receiver.clone(),
                    dispatcher: dispatcher.clone(),
                    monitor: monitor.clone(),
                    max_attempts: config.max_attempts.max(1),
                    retry_backoff: config.retry_backoff(),
                    shutdown: shutdown.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        tracing::info!(workers = config.workers, capacity = config.queue_capacity, "Webhook worker pool started");
        (WebhookQueue { sender }, Self { handles })
    }

    /// Wait for every worker to exit.
    pub async fn join(self) {
        for result in join_all(self.handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Webhook worker panicked");
            }
        }
        tracing::info!("Webhook worker pool stopped");
    }
}

struct Worker {
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<WebhookEnvelope>>>,
    dispatcher: Arc<WebhookDispatcher>,
    monitor: Arc<BillingMonitor>,
    max_attempts: u32,
    retry_backoff: Duration,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            let next = {
                let mut receiver = self.receiver.lock().await;
                tokio::select! {
                    biased;
                    envelope = receiver.recv() => envelope,
                    _ = self.shutdown.wait_for(|stop| *stop) => None,
                }
            };
            let Some(envelope) = next else {
                break;
            };
            self.process(&envelope).await;
        }
        tracing::debug!(worker = self.id, "Webhook worker exiting");
    }

    async fn process(&self, envelope: &WebhookEnvelope) {
        let metrics = self.monitor.metrics();
        let mut attempt = 1;
        loop {
            let error = match self.dispatcher.dispatch(envelope, attempt).await {
                Ok(outcome) => {
                    metrics.webhook_succeeded();
                    tracing::debug!(worker = self.id, event_id = %envelope.id, ?outcome, "Webhook handled");
                    return;
                }
                Err(e) => e,
            };

            if error.is_retryable() && attempt < self.max_attempts {
                let delay = self.retry_backoff * 2u32.saturating_pow(attempt - 1);
                tracing::warn!(
                    worker = self.id,
                    event_id = %envelope.id,
                    attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Webhook processing failed, retrying"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown_requested(self.shutdown.clone()) => {
                        tracing::info!(worker = self.id, event_id = %envelope.id, attempt, "Webhook retry abandoned for shutdown");
                        self.fail(envelope, &error, attempt).await;
                        return;
                    }
                }
                attempt += 1;
                continue;
            }

            self.fail(envelope, &error, attempt).await;
            return;
        }
    }

    async fn fail(&self, envelope: &WebhookEnvelope, error: &BillingError, attempts: u32) {
        self.monitor.metrics().webhook_failed();
        tracing::error!(
            worker = self.id,
            event_id = %envelope.id,
            event_type = %envelope.event_type,
            attempts,
            error = %error,
            "Webhook processing failed"
        );
        self.dispatcher.record_failure(envelope, error, attempts).await;
        self.monitor
            .webhook_processing_failed(&envelope.id, &envelope.event_type, attempts, &error.to_string())
            .await;
    }
}

/// Resolves once shutdown is signalled; never resolves if the sender is gone.
async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
