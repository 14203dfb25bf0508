//! In-memory port implementations for tests and local runs.
//!
//! State lives behind tokio locks; nothing survives a restart.

mod credentials;
mod directory;
mod kit;
mod ledger;
mod notifications;
mod orders;
mod subscriptions;
mod webhook_events;

pub use credentials::InMemoryTenantCredentialStore;
pub use directory::InMemoryClinicDirectory;
pub use kit::InMemoryBilling;
pub use ledger::{InMemoryBillingAuditLog, InMemoryPaymentTransactionLog};
pub use notifications::RecordingNotificationSender;
pub use orders::InMemoryPaymentOrderRepository;
pub use subscriptions::InMemorySubscriptionRepository;
pub use webhook_events::InMemoryWebhookEventRepository;
