//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing core and the outside world. Adapters implement these ports.
//!
//! ## Gateway
//!
//! - `PaymentGateway` - Orders, captures, subscriptions, webhook verification
//! - `TenantCredentialStore` - Per-tenant gateway credentials
//!
//! ## Persistence
//!
//! - `PaymentOrderRepository` - One-time payment orders
//! - `SubscriptionRepository` - Tenant subscriptions (optimistic versioning)
//! - `BillingAuditLog`, `PaymentTransactionLog` - Append-only ledger
//! - `WebhookEventRepository` - Webhook idempotency tracking
//!
//! ## Collaborators
//!
//! - `ClinicDirectory` - Patients, doctors, services, appointments
//! - `NotificationSender` - Patient and staff notifications
//! - `AlertSink` - Operational alerts
//! - `PlanCatalog` - Subscription tiers

mod alert_sink;
mod billing_ledger;
mod directory;
mod notification_sender;
mod order_repository;
mod payment_gateway;
mod plan_catalog;
mod subscription_repository;
mod tenant_credentials;
mod webhook_event_repository;

pub use alert_sink::{Alert, AlertKind, AlertSeverity, AlertSink};
pub use billing_ledger::{BillingAuditLog, PaymentTransactionLog};
pub use directory::{
    Appointment, ClinicDirectory, ClinicService, ClinicSettings, Doctor, NewAppointment, Patient,
};
pub use notification_sender::{AppointmentConfirmation, NotificationSender, StaffNotice};
pub use order_repository::{PaymentOrderRepository, TransitionOutcome};
pub use payment_gateway::{
    CaptureResult, CreateOrderRequest, CreateSubscriptionRequest, CreatedOrder,
    CreatedSubscription, GatewayError, GatewayErrorCode, GatewaySubscription, PaymentGateway,
    WebhookHeaders,
};
pub use plan_catalog::PlanCatalog;
pub use subscription_repository::SubscriptionRepository;
pub use tenant_credentials::{GatewayCredentials, TenantCredentialStore};
pub use webhook_event_repository::{
    ProcessingResult, SaveResult, WebhookEventRecord, WebhookEventRepository,
};
