//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Updates are guarded by the `version` column; a stale write matches no row
//! and surfaces as `ConcurrentModification`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, TenantId, Timestamp};
use crate::domain::plan::{BillingCycle, PlanTier};
use crate::domain::subscription::{
    PaymentMethodSummary, PendingPlanChange, ScheduledCancellation, Subscription,
    SubscriptionStatus,
};
use crate::ports::SubscriptionRepository;

const COLUMNS: &str = "id, tenant_id, provider_subscription_id, status, plan_tier, billing_cycle, \
    current_period_start, current_period_end, pending_plan_tier, pending_plan_effective_date, \
    cancellation_requested_at, cancellation_effective_date, payment_method, last_payment_at, \
    failed_payment_count, version, created_at, updated_at, canceled_at";

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, condition: &str, operation: &str, bind: BindValue<'_>) -> Result<Vec<Subscription>, DomainError> {
        let sql = format!("SELECT {} FROM subscriptions WHERE {}", COLUMNS, condition);
        let query = sqlx::query_as::<_, SubscriptionRow>(&sql);
        let query = match bind {
            BindValue::Text(value) => query.bind(value.to_string()),
            BindValue::Uuid(value) => query.bind(value),
            BindValue::Time(value) => query.bind(value),
        };
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database(operation, e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}

enum BindValue<'a> {
    Text(&'a str),
    Uuid(Uuid),
    Time(DateTime<Utc>),
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    tenant_id: Uuid,
    provider_subscription_id: String,
    status: String,
    plan_tier: String,
    billing_cycle: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    pending_plan_tier: Option<String>,
    pending_plan_effective_date: Option<DateTime<Utc>>,
    cancellation_requested_at: Option<DateTime<Utc>>,
    cancellation_effective_date: Option<DateTime<Utc>>,
    payment_method: Option<serde_json::Value>,
    last_payment_at: Option<DateTime<Utc>>,
    failed_payment_count: i32,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
}

fn corrupt(field: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid {} value: {}", field, err))
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status: SubscriptionStatus = row.status.parse().map_err(|e| corrupt("status", e))?;
        let plan_tier: PlanTier = row.plan_tier.parse().map_err(|e| corrupt("plan_tier", e))?;
        let billing_cycle: BillingCycle = row.billing_cycle.parse().map_err(|e| corrupt("billing_cycle", e))?;

        let pending_plan_change = match (row.pending_plan_tier, row.pending_plan_effective_date) {
            (Some(tier), Some(effective)) => Some(PendingPlanChange {
                tier: tier.parse().map_err(|e| corrupt("pending_plan_tier", e))?,
                effective_date: Timestamp::from_datetime(effective),
            }),
            _ => None,
        };
        let cancellation = match (row.cancellation_requested_at, row.cancellation_effective_date) {
            (Some(requested), Some(effective)) => Some(ScheduledCancellation {
                requested_at: Timestamp::from_datetime(requested),
                effective_date: Timestamp::from_datetime(effective),
            }),
            _ => None,
        };
        let payment_method = row
            .payment_method
            .map(serde_json::from_value::<PaymentMethodSummary>)
            .transpose()
            .map_err(|e| corrupt("payment_method", e))?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            provider_subscription_id: row.provider_subscription_id,
            status,
            plan_tier,
            billing_cycle,
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            pending_plan_change,
            cancellation,
            payment_method,
            last_payment_at: row.last_payment_at.map(Timestamp::from_datetime),
            failed_payment_count: row.failed_payment_count.max(0) as u32,
            version: row.version,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            canceled_at: row.canceled_at.map(Timestamp::from_datetime),
        })
    }
}

fn payment_method_json(subscription: &Subscription) -> Result<Option<serde_json::Value>, DomainError> {
    subscription
        .payment_method
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| DomainError::new(ErrorCode::InternalError, format!("Failed to encode payment method: {}", e)))
}

fn datetime(ts: Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(|t| *t.as_datetime())
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let payment_method = payment_method_json(subscription)?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, tenant_id, provider_subscription_id, status, plan_tier, billing_cycle,
                current_period_start, current_period_end, pending_plan_tier, pending_plan_effective_date,
                cancellation_requested_at, cancellation_effective_date, payment_method, last_payment_at,
                failed_payment_count, version, created_at, updated_at, canceled_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.tenant_id.as_uuid())
        .bind(&subscription.provider_subscription_id)
        .bind(subscription.status.as_str())
        .bind(subscription.plan_tier.as_str())
        .bind(subscription.billing_cycle.as_str())
        .bind(datetime(subscription.current_period_start))
        .bind(datetime(subscription.current_period_end))
        .bind(subscription.pending_plan_change.map(|p| p.tier.as_str()))
        .bind(datetime(subscription.pending_plan_change.map(|p| p.effective_date)))
        .bind(datetime(subscription.cancellation.map(|c| c.requested_at)))
        .bind(datetime(subscription.cancellation.map(|c| c.effective_date)))
        .bind(payment_method)
        .bind(datetime(subscription.last_payment_at))
        .bind(subscription.failed_payment_count as i32)
        .bind(subscription.version)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .bind(datetime(subscription.canceled_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if matches!(
                    db_err.constraint(),
                    Some("subscriptions_provider_subscription_id_key" | "subscriptions_one_live_per_tenant")
                ) {
                    return DomainError::new(
                        ErrorCode::SubscriptionExists,
                        format!("Tenant {} already has a live subscription", subscription.tenant_id),
                    );
                }
            }
            DomainError::database("save subscription", e)
        })?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let payment_method = payment_method_json(subscription)?;

        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $3,
                plan_tier = $4,
                billing_cycle = $5,
                current_period_start = $6,
                current_period_end = $7,
                pending_plan_tier = $8,
                pending_plan_effective_date = $9,
                cancellation_requested_at = $10,
                cancellation_effective_date = $11,
                payment_method = $12,
                last_payment_at = $13,
                failed_payment_count = $14,
                updated_at = $15,
                canceled_at = $16,
                version = version + 1
            WHERE provider_subscription_id = $1 AND version = $2
            "#,
        )
        .bind(&subscription.provider_subscription_id)
        .bind(subscription.version)
        .bind(subscription.status.as_str())
        .bind(subscription.plan_tier.as_str())
        .bind(subscription.billing_cycle.as_str())
        .bind(datetime(subscription.current_period_start))
        .bind(datetime(subscription.current_period_end))
        .bind(subscription.pending_plan_change.map(|p| p.tier.as_str()))
        .bind(datetime(subscription.pending_plan_change.map(|p| p.effective_date)))
        .bind(datetime(subscription.cancellation.map(|c| c.requested_at)))
        .bind(datetime(subscription.cancellation.map(|c| c.effective_date)))
        .bind(payment_method)
        .bind(datetime(subscription.last_payment_at))
        .bind(subscription.failed_payment_count as i32)
        .bind(subscription.updated_at.as_datetime())
        .bind(datetime(subscription.canceled_at))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("update subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(match self.find_by_provider_id(&subscription.provider_subscription_id).await? {
                Some(stored) => DomainError::new(
                    ErrorCode::ConcurrentModification,
                    format!(
                        "Subscription {} was modified (expected version {}, found {})",
                        subscription.provider_subscription_id, subscription.version, stored.version
                    ),
                ),
                None => DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("Subscription {} not found", subscription.provider_subscription_id),
                )
                .with_detail("id", subscription.provider_subscription_id.clone()),
            });
        }

        Ok(())
    }

    async fn find_by_provider_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let found = self
            .fetch_where(
                "provider_subscription_id = $1",
                "find subscription",
                BindValue::Text(provider_subscription_id),
            )
            .await?;
        Ok(found.into_iter().next())
    }

    async fn find_current_for_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError> {
        let found = self
            .fetch_where(
                "tenant_id = $1 AND status <> 'CANCELED' ORDER BY created_at DESC LIMIT 1",
                "find tenant subscription",
                BindValue::Uuid(*tenant_id.as_uuid()),
            )
            .await?;
        Ok(found.into_iter().next())
    }

    async fn find_due_plan_changes(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError> {
        self.fetch_where(
            "status <> 'CANCELED' AND pending_plan_effective_date <= $1 ORDER BY pending_plan_effective_date",
            "find due plan changes",
            BindValue::Time(*now.as_datetime()),
        )
        .await
    }

    async fn find_due_cancellations(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError> {
        self.fetch_where(
            "status <> 'CANCELED' AND cancellation_effective_date <= $1 ORDER BY cancellation_effective_date",
            "find due cancellations",
            BindValue::Time(*now.as_datetime()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> SubscriptionRow {
        let now = Utc::now();
        SubscriptionRow {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            provider_subscription_id: "I-BW452GLLEP1G".to_string(),
            status: "ACTIVE".to_string(),
            plan_tier: "professional".to_string(),
            billing_cycle: "monthly".to_string(),
            current_period_start: Some(now),
            current_period_end: Some(now + chrono::Duration::days(30)),
            pending_plan_tier: None,
            pending_plan_effective_date: None,
            cancellation_requested_at: None,
            cancellation_effective_date: None,
            payment_method: None,
            last_payment_at: None,
            failed_payment_count: 0,
            version: 4,
            created_at: now,
            updated_at: now,
            canceled_at: None,
        }
    }

    #[test]
    fn row_restores_scheduled_changes() {
        let effective = Utc::now() + chrono::Duration::days(30);
        let mut scheduled = row();
        scheduled.pending_plan_tier = Some("basic".to_string());
        scheduled.pending_plan_effective_date = Some(effective);
        scheduled.cancellation_requested_at = Some(Utc::now());
        scheduled.cancellation_effective_date = Some(effective);

        let subscription = Subscription::try_from(scheduled).unwrap();

        let change = subscription.pending_plan_change.unwrap();
        assert_eq!(change.tier, PlanTier::Basic);
        assert_eq!(*change.effective_date.as_datetime(), effective);
        assert!(subscription.cancellation.is_some());
        assert_eq!(subscription.version, 4);
    }

    #[test]
    fn half_written_plan_change_is_ignored() {
        let mut partial = row();
        partial.pending_plan_tier = Some("basic".to_string());

        let subscription = Subscription::try_from(partial).unwrap();
        assert!(subscription.pending_plan_change.is_none());
    }

    #[test]
    fn payment_method_is_read_from_json() {
        let mut with_method = row();
        with_method.payment_method = Some(serde_json::json!({"method_type": "paypal", "mask": "a***@clinic.test"}));

        let subscription = Subscription::try_from(with_method).unwrap();
        assert_eq!(subscription.payment_method.unwrap().method_type, "paypal");
    }

    #[test]
    fn unknown_tier_is_rejected() {
        let mut bad = row();
        bad.plan_tier = "platinum".to_string();
        assert_eq!(Subscription::try_from(bad).unwrap_err().code, ErrorCode::DatabaseError);
    }
}
