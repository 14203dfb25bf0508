//! Service wiring shared by the binary, the HTTP layer, and tests.

use std::sync::Arc;

use super::monitoring::{BillingMetrics, BillingMonitor, MeteredGateway};
use super::orders::{AppointmentFulfilment, OrderPaymentProcessor, OrderProcessorSettings};
use super::subscriptions::{SubscriptionLifecycleManager, SubscriptionSettings};
use super::webhooks::WebhookDispatcher;
use crate::config::{AlertingConfig, AppConfig, ValidationError};
use crate::domain::foundation::Currency;
use crate::ports::{
    AlertSink, BillingAuditLog, ClinicDirectory, NotificationSender, PaymentGateway,
    PaymentOrderRepository, PaymentTransactionLog, PlanCatalog, SubscriptionRepository,
    WebhookEventRepository,
};

/// Port implementations the billing services run on.
#[derive(Clone)]
pub struct BillingPorts {
    pub orders: Arc<dyn PaymentOrderRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub audit: Arc<dyn BillingAuditLog>,
    pub transactions: Arc<dyn PaymentTransactionLog>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub directory: Arc<dyn ClinicDirectory>,
    pub notifier: Arc<dyn NotificationSender>,
    pub catalog: Arc<dyn PlanCatalog>,
    pub alerts: Arc<dyn AlertSink>,
}

#[derive(Debug, Clone)]
pub struct BillingSettings {
    pub orders: OrderProcessorSettings,
    pub subscriptions: SubscriptionSettings,
    pub alerting: AlertingConfig,
}

impl BillingSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ValidationError> {
        let billing = &config.billing;
        Ok(Self {
            orders: OrderProcessorSettings {
                settlement_currency: billing.settlement_currency()?,
                side_effect_claim_timeout: billing.side_effect_claim_timeout(),
                return_url: billing.order_return_url.clone(),
                cancel_url: billing.order_cancel_url.clone(),
            },
            subscriptions: SubscriptionSettings {
                return_url: billing.subscription_return_url.clone(),
                cancel_url: billing.subscription_cancel_url.clone(),
                brand_name: billing.brand_name.clone(),
            },
            alerting: config.alerting.clone(),
        })
    }
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            orders: OrderProcessorSettings {
                settlement_currency: Currency::usd(),
                side_effect_claim_timeout: chrono::Duration::minutes(10),
                return_url: None,
                cancel_url: None,
            },
            subscriptions: SubscriptionSettings {
                return_url: "http://localhost:3000/billing/return".to_string(),
                cancel_url: "http://localhost:3000/billing/cancel".to_string(),
                brand_name: None,
            },
            alerting: AlertingConfig::default(),
        }
    }
}

/// The assembled billing engine.
#[derive(Clone)]
pub struct BillingServices {
    pub orders: Arc<OrderPaymentProcessor>,
    pub subscriptions: Arc<SubscriptionLifecycleManager>,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub monitor: Arc<BillingMonitor>,
    pub metrics: Arc<BillingMetrics>,
    /// Metered gateway; every call through it is counted.
    pub gateway: Arc<dyn PaymentGateway>,
    pub catalog: Arc<dyn PlanCatalog>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
}

impl BillingServices {
    pub fn build(ports: BillingPorts, metrics: Arc<BillingMetrics>, settings: BillingSettings) -> Self {
        let monitor = Arc::new(BillingMonitor::new(metrics.clone(), ports.alerts.clone(), settings.alerting));
        let gateway: Arc<dyn PaymentGateway> = Arc::new(MeteredGateway::new(ports.gateway, metrics.clone()));

        let fulfilment = Arc::new(AppointmentFulfilment::new(
            ports.orders.clone(),
            ports.directory.clone(),
            ports.notifier,
            monitor.clone(),
        ));
        let orders = Arc::new(OrderPaymentProcessor::new(
            ports.orders,
            ports.transactions.clone(),
            gateway.clone(),
            ports.directory,
            fulfilment,
            monitor.clone(),
            settings.orders,
        ));
        let subscriptions = Arc::new(SubscriptionLifecycleManager::new(
            ports.subscriptions,
            ports.audit,
            ports.transactions,
            gateway.clone(),
            ports.catalog.clone(),
            monitor.clone(),
            settings.subscriptions,
        ));
        let dispatcher = Arc::new(WebhookDispatcher::new(
            ports.webhook_events.clone(),
            orders.clone(),
            subscriptions.clone(),
        ));

        Self {
            orders,
            subscriptions,
            dispatcher,
            monitor,
            metrics,
            gateway,
            catalog: ports.catalog,
            webhook_events: ports.webhook_events,
        }
    }
}
