//! Success-rate monitoring and immediate alerts.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::metrics::{BillingMetrics, MetricsSnapshot, Outcomes};
use crate::config::AlertingConfig;
use crate::ports::{Alert, AlertKind, AlertSink};

/// Watches billing counters and raises alerts.
///
/// `check_thresholds` judges only the outcomes recorded since the previous
/// check, so a bad hour is not diluted by a good week.
pub struct BillingMonitor {
    metrics: Arc<BillingMetrics>,
    alerts: Arc<dyn AlertSink>,
    config: AlertingConfig,
    last_snapshot: Mutex<MetricsSnapshot>,
}

impl BillingMonitor {
    pub fn new(metrics: Arc<BillingMetrics>, alerts: Arc<dyn AlertSink>, config: AlertingConfig) -> Self {
        let baseline = metrics.snapshot();
        Self {
            metrics,
            alerts,
            config,
            last_snapshot: Mutex::new(baseline),
        }
    }

    pub fn metrics(&self) -> &BillingMetrics {
        &self.metrics
    }

    /// Compare each category's window against its threshold. Returns the
    /// alerts raised.
    pub async fn check_thresholds(&self) -> Vec<Alert> {
        let current = self.metrics.snapshot();
        let window = {
            let mut last = self.last_snapshot.lock().await;
            let window = current.since(&last);
            *last = current;
            window
        };

        let checks = [
            (
                AlertKind::WebhookSuccessRateLow,
                "Webhook processing",
                window.webhooks,
                self.config.webhook_success_threshold,
            ),
            (
                AlertKind::GatewayApiSuccessRateLow,
                "Gateway API",
                window.gateway_api,
                self.config.gateway_api_success_threshold,
            ),
            (
                AlertKind::SubscriptionCreationSuccessRateLow,
                "Subscription creation",
                window.subscription_creation,
                self.config.subscription_creation_success_threshold,
            ),
        ];

        let mut raised = Vec::new();
        for (kind, label, outcomes, threshold) in checks {
            if let Some(alert) = self.judge(kind, label, outcomes, threshold) {
                self.alerts.raise(alert.clone()).await;
                raised.push(alert);
            }
        }
        raised
    }

    fn judge(&self, kind: AlertKind, label: &str, outcomes: Outcomes, threshold: f64) -> Option<Alert> {
        if outcomes.total() < self.config.min_samples {
            return None;
        }
        let rate = outcomes.success_rate()?;
        if rate >= threshold {
            return None;
        }
        Some(
            Alert::new(
                kind,
                format!("{} success rate {:.1}% is below {:.1}%", label, rate, threshold),
            )
            .with_context("success_rate", format!("{:.2}", rate))
            .with_context("threshold", threshold)
            .with_context("succeeded", outcomes.succeeded)
            .with_context("failed", outcomes.failed),
        )
    }

    pub async fn webhook_signature_invalid(&self, event_id: Option<&str>, reason: &str) {
        let mut alert = Alert::new(
            AlertKind::WebhookSignatureInvalid,
            format!("Rejected webhook with invalid signature: {}", reason),
        );
        if let Some(id) = event_id {
            alert = alert.with_context("event_id", id);
        }
        self.alerts.raise(alert).await;
    }

    pub async fn webhook_processing_failed(&self, event_id: &str, event_type: &str, attempts: u32, error: &str) {
        self.alerts
            .raise(
                Alert::new(
                    AlertKind::WebhookProcessingFailed,
                    format!("Webhook {} failed after {} attempts: {}", event_id, attempts, error),
                )
                .with_context("event_id", event_id)
                .with_context("event_type", event_type)
                .with_context("attempts", attempts),
            )
            .await;
    }

    pub async fn subscription_creation_failed(&self, tenant_id: &str, tier: &str, error: &str) {
        self.alerts
            .raise(
                Alert::new(
                    AlertKind::SubscriptionCreationFailed,
                    format!("Subscription creation failed for tenant {}: {}", tenant_id, error),
                )
                .with_context("tenant_id", tenant_id)
                .with_context("tier", tier),
            )
            .await;
    }

    pub async fn capture_reconciliation_required(&self, order_id: &str, capture_id: Option<&str>) {
        let mut alert = Alert::new(
            AlertKind::CaptureReconciliationRequired,
            format!("Gateway reports a capture for order {} which is marked FAILED", order_id),
        )
        .with_context("order_id", order_id);
        if let Some(capture_id) = capture_id {
            alert = alert.with_context("capture_id", capture_id);
        }
        self.alerts.raise(alert).await;
    }

    /// Payment was taken but no appointment exists yet.
    pub async fn appointment_creation_failed(&self, order_id: &str, capture_id: Option<&str>, error: &str) {
        let mut alert = Alert::new(
            AlertKind::AppointmentCreationFailed,
            format!("Order {} is paid but its appointment could not be created: {}", order_id, error),
        )
        .with_context("order_id", order_id);
        if let Some(capture_id) = capture_id {
            alert = alert.with_context("capture_id", capture_id);
        }
        self.alerts.raise(alert).await;
    }

    pub async fn gateway_call_failed(&self, operation: &str, reference: &str, error: &str) {
        self.alerts
            .raise(
                Alert::new(
                    AlertKind::GatewayCallFailed,
                    format!("Gateway {} failed for {}: {}", operation, reference, error),
                )
                .with_context("operation", operation)
                .with_context("reference", reference),
            )
            .await;
    }

    pub async fn notification_failed(&self, channel: &str, reference: &str, error: &str) {
        self.alerts
            .raise(
                Alert::new(
                    AlertKind::NotificationDeliveryFailed,
                    format!("{} notification for {} was not delivered: {}", channel, reference, error),
                )
                .with_context("channel", channel)
                .with_context("reference", reference),
            )
            .await;
    }

    pub async fn schedule_fallback(&self, order_id: &str, raw_slot: &str, fallback: &str) {
        self.alerts
            .raise(
                Alert::new(
                    AlertKind::AppointmentScheduleFallback,
                    format!(
                        "Booked slot '{}' for order {} could not be read; scheduled at {} for review",
                        raw_slot, order_id, fallback
                    ),
                )
                .with_context("order_id", order_id)
                .with_context("booked_slot", raw_slot),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::alerting::RecordingAlertSink;
    use crate::ports::AlertSeverity;

    fn monitor() -> (BillingMonitor, Arc<RecordingAlertSink>) {
        let metrics = Arc::new(BillingMetrics::new().unwrap());
        let sink = Arc::new(RecordingAlertSink::new());
        let monitor = BillingMonitor::new(metrics, sink.clone(), AlertingConfig::default());
        (monitor, sink)
    }

    fn record_webhooks(monitor: &BillingMonitor, succeeded: u32, failed: u32) {
        for _ in 0..succeeded {
            monitor.metrics().webhook_succeeded();
        }
        for _ in 0..failed {
            monitor.metrics().webhook_failed();
        }
    }

    #[tokio::test]
    async fn webhook_rate_of_92_percent_raises_alert() {
        let (monitor, sink) = monitor();
        record_webhooks(&monitor, 92, 8);

        let raised = monitor.check_thresholds().await;

        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].kind, AlertKind::WebhookSuccessRateLow);
        assert_eq!(sink.kinds(), vec![AlertKind::WebhookSuccessRateLow]);
    }

    #[tokio::test]
    async fn webhook_rate_of_96_percent_is_quiet() {
        let (monitor, sink) = monitor();
        record_webhooks(&monitor, 96, 4);

        assert!(monitor.check_thresholds().await.is_empty());
        assert!(sink.alerts().is_empty());
    }

    #[tokio::test]
    async fn small_windows_are_not_judged() {
        let (monitor, _sink) = monitor();
        record_webhooks(&monitor, 1, 8);

        assert!(monitor.check_thresholds().await.is_empty());
    }

    #[tokio::test]
    async fn each_check_only_sees_its_own_window() {
        let (monitor, _sink) = monitor();
        record_webhooks(&monitor, 92, 8);
        assert_eq!(monitor.check_thresholds().await.len(), 1);

        record_webhooks(&monitor, 100, 0);
        assert!(monitor.check_thresholds().await.is_empty());
    }

    #[tokio::test]
    async fn gateway_threshold_is_ninety_percent() {
        let (monitor, _sink) = monitor();
        for _ in 0..17 {
            monitor.metrics().gateway_succeeded("capture_order");
        }
        for _ in 0..3 {
            monitor.metrics().gateway_failed("capture_order");
        }

        let raised = monitor.check_thresholds().await;
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].kind, AlertKind::GatewayApiSuccessRateLow);
        assert_eq!(raised[0].context.get("failed").map(String::as_str), Some("3"));
    }

    #[tokio::test]
    async fn subscription_creation_threshold_is_eighty_five_percent() {
        let (monitor, _sink) = monitor();
        for _ in 0..8 {
            monitor.metrics().subscription_created();
        }
        for _ in 0..2 {
            monitor.metrics().subscription_failed();
        }

        let raised = monitor.check_thresholds().await;
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].kind, AlertKind::SubscriptionCreationSuccessRateLow);
    }

    #[tokio::test]
    async fn invalid_signature_alert_is_critical() {
        let (monitor, sink) = monitor();
        monitor.webhook_signature_invalid(Some("WH-9"), "verification status FAILURE").await;

        let alerts = sink.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[0].context.get("event_id").map(String::as_str), Some("WH-9"));
    }
}
