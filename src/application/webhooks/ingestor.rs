//! WebhookIngestor - the trust boundary for gateway webhooks.
//!
//! Nothing in a delivery is believed until the gateway confirms the
//! signature. A body that is not an event envelope at all is refused as
//! malformed before verification, since the gateway cannot vouch for it.
//! Verified events are queued and the HTTP handler answers 200 whatever the
//! business outcome; the gateway only retries on non-2xx.

use std::sync::Arc;

use super::worker_pool::WebhookQueue;
use crate::application::monitoring::BillingMonitor;
use crate::domain::webhook::WebhookEnvelope;
use crate::ports::{GatewayError, PaymentGateway, WebhookHeaders};

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook signature rejected: {0}")]
    InvalidSignature(String),

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// The gateway could not be asked; the delivery should be retried.
    #[error("webhook verification unavailable: {0}")]
    VerificationUnavailable(GatewayError),

    #[error("webhook queue is closed")]
    QueueClosed,
}

pub struct WebhookIngestor {
    gateway: Arc<dyn PaymentGateway>,
    webhook_id: Option<String>,
    monitor: Arc<BillingMonitor>,
    queue: WebhookQueue,
}

impl WebhookIngestor {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        webhook_id: Option<String>,
        monitor: Arc<BillingMonitor>,
        queue: WebhookQueue,
    ) -> Self {
        Self {
            gateway,
            webhook_id,
            monitor,
            queue,
        }
    }

    /// Parse, verify, and enqueue one delivery. Returns the event id.
    pub async fn ingest(&self, payload: &[u8], headers: &WebhookHeaders) -> Result<String, WebhookError> {
        let metrics = self.monitor.metrics();
        metrics.webhook_received();

        let envelope: WebhookEnvelope = serde_json::from_slice(payload).map_err(|e| {
            metrics.webhook_failed();
            tracing::warn!(error = %e, "Malformed webhook payload");
            WebhookError::MalformedPayload(e.to_string())
        })?;

        // Unverified until the gateway answers; used for logging only.
        let claimed_id = envelope.id.as_str();
        let webhook_id = match self.webhook_id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => return Err(self.reject(claimed_id, "webhook id not configured").await),
        };
        let missing = headers.missing();
        if !missing.is_empty() {
            let reason = format!("missing headers: {}", missing.join(", "));
            return Err(self.reject(claimed_id, &reason).await);
        }

        match self.gateway.verify_webhook_signature(payload, headers, webhook_id).await {
            Ok(true) => {}
            Ok(false) => return Err(self.reject(claimed_id, "verification failed").await),
            Err(e) => {
                metrics.webhook_failed();
                tracing::error!(event_id = claimed_id, error = %e, "Webhook signature could not be verified");
                return Err(WebhookError::VerificationUnavailable(e));
            }
        }

        let event_id = envelope.id.clone();
        tracing::info!(event_id = %event_id, event_type = %envelope.event_type, "Webhook accepted");
        self.queue.submit(envelope).await.map_err(|_| WebhookError::QueueClosed)?;
        Ok(event_id)
    }

    async fn reject(&self, event_id: &str, reason: &str) -> WebhookError {
        self.monitor.metrics().webhook_failed();
        tracing::warn!(event_id, reason, "Webhook signature rejected");
        self.monitor.webhook_signature_invalid(Some(event_id), reason).await;
        WebhookError::InvalidSignature(reason.to_string())
    }
}
