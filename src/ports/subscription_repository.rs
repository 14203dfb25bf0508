//! Subscription persistence port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::domain::subscription::Subscription;

/// Repository for tenant subscriptions.
///
/// Updates use optimistic concurrency: `update` succeeds only if the stored
/// version equals `subscription.version`, and stores `version + 1`. A stale
/// write fails with `ConcurrentModification`, which callers treat as retryable.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Fails with `SubscriptionExists` on a duplicate gateway subscription id.
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn find_by_provider_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// The tenant's newest subscription that is not CANCELED, if any.
    async fn find_current_for_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Subscriptions with a pending plan change effective at or before `now`.
    async fn find_due_plan_changes(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError>;

    /// Non-canceled subscriptions whose scheduled cancellation is due.
    async fn find_due_cancellations(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError>;
}
