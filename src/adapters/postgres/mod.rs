//! PostgreSQL adapters - Database implementations for the persistence ports.
//!
//! - `PostgresPaymentOrderRepository` - One-time orders with conditional status updates
//! - `PostgresSubscriptionRepository` - Subscriptions guarded by a version column
//! - `PostgresBillingAuditLog`, `PostgresPaymentTransactionLog` - Append-only ledger
//! - `PostgresWebhookEventRepository` - Webhook idempotency records
//! - `PostgresTenantCredentialStore` - Tenant gateway accounts

mod billing_ledger;
mod payment_order_repository;
mod subscription_repository;
mod tenant_credentials;
mod webhook_event_repository;

pub use billing_ledger::{PostgresBillingAuditLog, PostgresPaymentTransactionLog};
pub use payment_order_repository::PostgresPaymentOrderRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use tenant_credentials::PostgresTenantCredentialStore;
pub use webhook_event_repository::PostgresWebhookEventRepository;
