//! In-memory subscription repository with optimistic versioning.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, TenantId, Timestamp};
use crate::domain::subscription::Subscription;
use crate::ports::SubscriptionRepository;

#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: RwLock<HashMap<String, Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions.contains_key(&subscription.provider_subscription_id) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionExists,
                format!("Subscription {} already exists", subscription.provider_subscription_id),
            ));
        }
        subscriptions.insert(subscription.provider_subscription_id.clone(), subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        let stored = subscriptions
            .get_mut(&subscription.provider_subscription_id)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("Subscription {} not found", subscription.provider_subscription_id),
                )
                .with_detail("id", subscription.provider_subscription_id.clone())
            })?;
        if stored.version != subscription.version {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Subscription {} was modified (expected version {}, found {})",
                    subscription.provider_subscription_id, subscription.version, stored.version
                ),
            ));
        }
        let mut next = subscription.clone();
        next.version += 1;
        *stored = next;
        Ok(())
    }

    async fn find_by_provider_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.subscriptions.read().await.get(provider_subscription_id).cloned())
    }

    async fn find_current_for_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| &s.tenant_id == tenant_id && !s.is_canceled())
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn find_due_plan_changes(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| {
                !s.is_canceled()
                    && s.pending_plan_change
                        .is_some_and(|p| !p.effective_date.is_after(&now))
            })
            .cloned()
            .collect())
    }

    async fn find_due_cancellations(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| {
                !s.is_canceled() && s.cancellation.is_some_and(|c| !c.effective_date.is_after(&now))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plan::{BillingCycle, PlanTier};

    fn subscription(tenant: TenantId, provider_id: &str) -> Subscription {
        Subscription::create_pending(tenant, provider_id, PlanTier::Basic, BillingCycle::Monthly, Timestamp::now())
            .unwrap()
    }

    #[tokio::test]
    async fn stale_update_is_rejected() {
        let repo = InMemorySubscriptionRepository::new();
        let sub = subscription(TenantId::new(), "I-1");
        repo.insert(&sub).await.unwrap();

        repo.update(&sub).await.unwrap();
        let err = repo.update(&sub).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ConcurrentModification);
        let stored = repo.find_by_provider_id("I-1").await.unwrap().unwrap();
        assert_eq!(stored.version, sub.version + 1);
    }

    #[tokio::test]
    async fn current_for_tenant_skips_canceled() {
        let repo = InMemorySubscriptionRepository::new();
        let tenant = TenantId::new();
        let mut old = subscription(tenant, "I-OLD");
        old.cancel(Timestamp::now()).unwrap();
        repo.insert(&old).await.unwrap();
        repo.insert(&subscription(tenant, "I-NEW")).await.unwrap();

        let current = repo.find_current_for_tenant(&tenant).await.unwrap().unwrap();
        assert_eq!(current.provider_subscription_id, "I-NEW");
    }

    #[tokio::test]
    async fn due_plan_changes_respect_effective_date() {
        let repo = InMemorySubscriptionRepository::new();
        let now = Timestamp::now();
        let mut sub = subscription(TenantId::new(), "I-2");
        sub.activate(now, Some(now.add_days(10))).unwrap();
        sub.schedule_plan_change(PlanTier::Enterprise, now).unwrap();
        repo.insert(&sub).await.unwrap();

        assert!(repo.find_due_plan_changes(now).await.unwrap().is_empty());
        assert_eq!(repo.find_due_plan_changes(now.add_days(11)).await.unwrap().len(), 1);
    }
}
