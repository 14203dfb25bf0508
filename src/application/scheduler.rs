//! BillingScheduler - periodic background jobs.
//!
//! | Job | Default cadence |
//! |-----|-----------------|
//! | Success-rate sweep | 5 min |
//! | Subscription reconciliation | 15 min |
//! | Appointment recovery for paid orders | 15 min |
//! | Gateway token refresh | 30 min |
//! | Webhook event log cleanup | 24 h |
//!
//! Each job body is a public method so tests can run one cycle directly.
//! Job errors are logged; the loop keeps going.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use super::monitoring::BillingMonitor;
use super::orders::OrderPaymentProcessor;
use super::subscriptions::{ReconcileReport, SubscriptionLifecycleManager};
use super::BillingError;
use crate::config::{AlertingConfig, SchedulerConfig, WebhookConfig};
use crate::domain::foundation::Timestamp;
use crate::ports::{Alert, PaymentGateway, WebhookEventRepository};

/// Paid orders booked per recovery run.
const RECOVERY_BATCH: u32 = 50;

#[derive(Debug, Clone)]
pub struct SchedulerIntervals {
    pub metrics_sweep: Duration,
    pub reconciliation: Duration,
    pub token_refresh: Duration,
    pub webhook_cleanup: Duration,
    pub webhook_retention_days: i64,
}

impl SchedulerIntervals {
    pub fn from_config(scheduler: &SchedulerConfig, alerting: &AlertingConfig, webhooks: &WebhookConfig) -> Self {
        Self {
            metrics_sweep: alerting.sweep_interval(),
            reconciliation: scheduler.reconciliation_interval(),
            token_refresh: scheduler.token_refresh_interval(),
            webhook_cleanup: scheduler.webhook_cleanup_interval(),
            webhook_retention_days: webhooks.retention_days,
        }
    }
}

pub struct BillingScheduler {
    monitor: Arc<BillingMonitor>,
    subscriptions: Arc<SubscriptionLifecycleManager>,
    orders: Arc<OrderPaymentProcessor>,
    gateway: Arc<dyn PaymentGateway>,
    webhook_events: Arc<dyn WebhookEventRepository>,
    intervals: SchedulerIntervals,
}

impl BillingScheduler {
    pub fn new(
        monitor: Arc<BillingMonitor>,
        subscriptions: Arc<SubscriptionLifecycleManager>,
        orders: Arc<OrderPaymentProcessor>,
        gateway: Arc<dyn PaymentGateway>,
        webhook_events: Arc<dyn WebhookEventRepository>,
        intervals: SchedulerIntervals,
    ) -> Self {
        Self {
            monitor,
            subscriptions,
            orders,
            gateway,
            webhook_events,
            intervals,
        }
    }

    /// Run every job on its interval until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut sweep = interval_after(self.intervals.metrics_sweep);
        let mut reconcile = interval_after(self.intervals.reconciliation);
        let mut refresh = interval_after(self.intervals.token_refresh);
        let mut cleanup = interval_after(self.intervals.webhook_cleanup);

        tracing::info!(?self.intervals, "Billing scheduler started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Billing scheduler stopping");
                        return;
                    }
                }
                _ = sweep.tick() => {
                    self.run_metrics_sweep().await;
                }
                _ = reconcile.tick() => {
                    if let Err(e) = self.run_reconciliation(Timestamp::now()).await {
                        tracing::error!(error = %e, "Subscription reconciliation failed");
                    }
                    if let Err(e) = self.run_appointment_recovery(Timestamp::now()).await {
                        tracing::error!(error = %e, "Appointment recovery failed");
                    }
                }
                _ = refresh.tick() => {
                    self.run_token_refresh().await;
                }
                _ = cleanup.tick() => {
                    if let Err(e) = self.run_webhook_cleanup(Timestamp::now()).await {
                        tracing::error!(error = %e, "Webhook event cleanup failed");
                    }
                }
            }
        }
    }

    /// Evaluate success rates over the window since the previous sweep.
    pub async fn run_metrics_sweep(&self) -> Vec<Alert> {
        let alerts = self.monitor.check_thresholds().await;
        tracing::debug!(raised = alerts.len(), "Metrics sweep finished");
        alerts
    }

    pub async fn run_reconciliation(&self, now: Timestamp) -> Result<ReconcileReport, BillingError> {
        self.subscriptions.reconcile_due(now).await
    }

    /// Book appointments for paid orders whose side effect failed or was
    /// abandoned past the claim timeout.
    pub async fn run_appointment_recovery(&self, now: Timestamp) -> Result<usize, BillingError> {
        let booked = self.orders.resume_unfulfilled(now, RECOVERY_BATCH).await?;
        if booked > 0 {
            tracing::info!(booked, "Recovered appointments for paid orders");
        }
        Ok(booked)
    }

    /// Refresh gateway tokens ahead of expiry. Failures are retried on the
    /// next tick; requests refresh lazily in the meantime.
    pub async fn run_token_refresh(&self) -> bool {
        match self.gateway.refresh_credentials().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Gateway token refresh failed");
                false
            }
        }
    }

    /// Drop webhook event records past retention.
    pub async fn run_webhook_cleanup(&self, now: Timestamp) -> Result<u64, BillingError> {
        let cutoff = now.add_days(-self.intervals.webhook_retention_days);
        let removed = self.webhook_events.delete_before(cutoff).await?;
        if removed > 0 {
            tracing::info!(removed, "Purged old webhook event records");
        }
        Ok(removed)
    }
}

/// Interval whose first tick is one period away rather than immediate.
fn interval_after(period: Duration) -> time::Interval {
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
