//! Billing counters backed by a Prometheus registry.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Gateway operations tracked under the `operation` label.
pub const GATEWAY_OPERATIONS: &[&str] = &[
    "create_order",
    "capture_order",
    "create_subscription",
    "fetch_subscription",
    "verify_webhook_signature",
    "refresh_credentials",
];

/// Success/failure pair for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcomes {
    pub succeeded: u64,
    pub failed: u64,
}

impl Outcomes {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed
    }

    pub fn since(&self, earlier: &Outcomes) -> Outcomes {
        Outcomes {
            succeeded: self.succeeded.saturating_sub(earlier.succeeded),
            failed: self.failed.saturating_sub(earlier.failed),
        }
    }

    pub fn success_rate(&self) -> Option<f64> {
        success_rate(self.succeeded, self.failed)
    }
}

/// `success / (success + failure) * 100`, or `None` with no samples.
pub fn success_rate(succeeded: u64, failed: u64) -> Option<f64> {
    let total = succeeded + failed;
    if total == 0 {
        return None;
    }
    Some(succeeded as f64 / total as f64 * 100.0)
}

/// Point-in-time read of the counters used for alerting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub webhooks: Outcomes,
    pub gateway_api: Outcomes,
    pub subscription_creation: Outcomes,
}

impl MetricsSnapshot {
    pub fn since(&self, earlier: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            webhooks: self.webhooks.since(&earlier.webhooks),
            gateway_api: self.gateway_api.since(&earlier.gateway_api),
            subscription_creation: self.subscription_creation.since(&earlier.subscription_creation),
        }
    }
}

/// Billing counters.
///
/// - `billing_webhooks_total{outcome}`: received, succeeded, failed
/// - `billing_gateway_calls_total{operation, outcome}`: attempted, succeeded, failed
/// - `billing_subscription_events_total{event}`: created, activated, cancelled, suspended, failed
#[derive(Clone)]
pub struct BillingMetrics {
    webhooks: IntCounterVec,
    gateway_calls: IntCounterVec,
    subscription_events: IntCounterVec,
    registry: Arc<Registry>,
}

impl BillingMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let webhooks = IntCounterVec::new(
            Opts::new("webhooks_total", "Gateway webhook deliveries by outcome").namespace("billing"),
            &["outcome"],
        )?;
        let gateway_calls = IntCounterVec::new(
            Opts::new("gateway_calls_total", "Gateway API calls by operation and outcome")
                .namespace("billing"),
            &["operation", "outcome"],
        )?;
        let subscription_events = IntCounterVec::new(
            Opts::new("subscription_events_total", "Subscription lifecycle events").namespace("billing"),
            &["event"],
        )?;

        registry.register(Box::new(webhooks.clone()))?;
        registry.register(Box::new(gateway_calls.clone()))?;
        registry.register(Box::new(subscription_events.clone()))?;

        Ok(Self {
            webhooks,
            gateway_calls,
            subscription_events,
            registry: Arc::new(registry),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn webhook_received(&self) {
        self.webhooks.with_label_values(&["received"]).inc();
    }

    pub fn webhook_succeeded(&self) {
        self.webhooks.with_label_values(&["succeeded"]).inc();
    }

    pub fn webhook_failed(&self) {
        self.webhooks.with_label_values(&["failed"]).inc();
    }

    pub fn gateway_attempted(&self, operation: &str) {
        self.gateway_calls.with_label_values(&[operation, "attempted"]).inc();
    }

    pub fn gateway_succeeded(&self, operation: &str) {
        self.gateway_calls.with_label_values(&[operation, "succeeded"]).inc();
    }

    pub fn gateway_failed(&self, operation: &str) {
        self.gateway_calls.with_label_values(&[operation, "failed"]).inc();
    }

    pub fn subscription_created(&self) {
        self.subscription_event("created");
    }

    pub fn subscription_activated(&self) {
        self.subscription_event("activated");
    }

    pub fn subscription_cancelled(&self) {
        self.subscription_event("cancelled");
    }

    pub fn subscription_suspended(&self) {
        self.subscription_event("suspended");
    }

    pub fn subscription_failed(&self) {
        self.subscription_event("failed");
    }

    fn subscription_event(&self, event: &str) {
        self.subscription_events.with_label_values(&[event]).inc();
    }

    pub fn webhook_count(&self, outcome: &str) -> u64 {
        self.webhooks.with_label_values(&[outcome]).get()
    }

    pub fn gateway_count(&self, operation: &str, outcome: &str) -> u64 {
        self.gateway_calls.with_label_values(&[operation, outcome]).get()
    }

    pub fn subscription_count(&self, event: &str) -> u64 {
        self.subscription_events.with_label_values(&[event]).get()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let gateway = |outcome: &str| {
            GATEWAY_OPERATIONS
                .iter()
                .map(|op| self.gateway_count(op, outcome))
                .sum::<u64>()
        };
        MetricsSnapshot {
            webhooks: Outcomes {
                succeeded: self.webhook_count("succeeded"),
                failed: self.webhook_count("failed"),
            },
            gateway_api: Outcomes {
                succeeded: gateway("succeeded"),
                failed: gateway("failed"),
            },
            subscription_creation: Outcomes {
                succeeded: self.subscription_count("created"),
                failed: self.subscription_count("failed"),
            },
        }
    }

    /// Prometheus text exposition of every registered counter.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
