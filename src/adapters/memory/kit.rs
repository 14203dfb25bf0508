//! A complete set of in-memory ports for local runs and tests.

use std::sync::Arc;

use super::{
    InMemoryBillingAuditLog, InMemoryClinicDirectory, InMemoryPaymentOrderRepository,
    InMemoryPaymentTransactionLog, InMemorySubscriptionRepository, InMemoryWebhookEventRepository,
    RecordingNotificationSender,
};
use crate::adapters::alerting::RecordingAlertSink;
use crate::application::BillingPorts;
use crate::ports::{PaymentGateway, PlanCatalog};

/// Concrete handles stay accessible so tests can seed and inspect state.
#[derive(Clone, Default)]
pub struct InMemoryBilling {
    pub orders: Arc<InMemoryPaymentOrderRepository>,
    pub subscriptions: Arc<InMemorySubscriptionRepository>,
    pub audit: Arc<InMemoryBillingAuditLog>,
    pub transactions: Arc<InMemoryPaymentTransactionLog>,
    pub webhook_events: Arc<InMemoryWebhookEventRepository>,
    pub directory: Arc<InMemoryClinicDirectory>,
    pub notifier: Arc<RecordingNotificationSender>,
    pub alerts: Arc<RecordingAlertSink>,
}

impl InMemoryBilling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ports(&self, gateway: Arc<dyn PaymentGateway>, catalog: Arc<dyn PlanCatalog>) -> BillingPorts {
        BillingPorts {
            orders: self.orders.clone(),
            subscriptions: self.subscriptions.clone(),
            audit: self.audit.clone(),
            transactions: self.transactions.clone(),
            webhook_events: self.webhook_events.clone(),
            gateway,
            directory: self.directory.clone(),
            notifier: self.notifier.clone(),
            catalog,
            alerts: self.alerts.clone(),
        }
    }
}
