//! PostgreSQL audit log and payment transaction ledger.
//!
//! Both tables are append-only; there are no update or delete statements here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    AuditEntryId, Currency, DomainError, ErrorCode, Money, SubscriptionId, TenantId, Timestamp,
    TransactionId,
};
use crate::domain::ledger::{BillingAuditLogEntry, PaymentTransaction};
use crate::ports::{BillingAuditLog, PaymentTransactionLog};

/// Reads a SCREAMING_SNAKE_CASE column back into its enum through serde.
fn parse_label<T: DeserializeOwned>(field: &str, value: &str) -> Result<T, DomainError> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid {} value '{}': {}", field, value, e))
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Audit log
// ════════════════════════════════════════════════════════════════════════════════

pub struct PostgresBillingAuditLog {
    pool: PgPool,
}

impl PostgresBillingAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    tenant_id: Uuid,
    subscription_id: Option<Uuid>,
    actor: String,
    action: String,
    before_state: Option<serde_json::Value>,
    after_state: Option<serde_json::Value>,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for BillingAuditLogEntry {
    type Error = DomainError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(BillingAuditLogEntry {
            id: AuditEntryId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            actor: row.actor,
            action: parse_label("action", &row.action)?,
            before: row.before_state,
            after: row.after_state,
            occurred_at: Timestamp::from_datetime(row.occurred_at),
        })
    }
}

#[async_trait]
impl BillingAuditLog for PostgresBillingAuditLog {
    async fn append(&self, entry: &BillingAuditLogEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO billing_audit_log (
                id, tenant_id, subscription_id, actor, action, before_state, after_state, occurred_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.tenant_id.as_uuid())
        .bind(entry.subscription_id.map(|id| *id.as_uuid()))
        .bind(&entry.actor)
        .bind(entry.action.as_str())
        .bind(&entry.before)
        .bind(&entry.after)
        .bind(entry.occurred_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("append audit entry", e))?;

        Ok(())
    }

    async fn list_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<BillingAuditLogEntry>, DomainError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, subscription_id, actor, action, before_state, after_state, occurred_at
            FROM billing_audit_log
            WHERE tenant_id = $1
            ORDER BY occurred_at ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("list audit entries", e))?;

        rows.into_iter().map(BillingAuditLogEntry::try_from).collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Payment transactions
// ════════════════════════════════════════════════════════════════════════════════

pub struct PostgresPaymentTransactionLog {
    pool: PgPool,
}

impl PostgresPaymentTransactionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    tenant_id: Uuid,
    kind: String,
    outcome: String,
    reference: String,
    external_id: Option<String>,
    amount_minor: Option<i64>,
    currency: Option<String>,
    raw_payload: Option<serde_json::Value>,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for PaymentTransaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let amount = match (row.amount_minor, row.currency) {
            (Some(minor), Some(code)) => {
                let currency = Currency::new(code.trim()).map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Invalid currency: {}", e))
                })?;
                Some(Money::new(minor, currency))
            }
            _ => None,
        };

        Ok(PaymentTransaction {
            id: TransactionId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            kind: parse_label("kind", &row.kind)?,
            outcome: parse_label("outcome", &row.outcome)?,
            reference: row.reference,
            external_id: row.external_id,
            amount,
            raw_payload: row.raw_payload,
            recorded_at: Timestamp::from_datetime(row.recorded_at),
        })
    }
}

#[async_trait]
impl PaymentTransactionLog for PostgresPaymentTransactionLog {
    async fn record(&self, transaction: &PaymentTransaction) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_transactions (
                id, tenant_id, kind, outcome, reference, external_id,
                amount_minor, currency, raw_payload, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.tenant_id.as_uuid())
        .bind(transaction.kind.as_str())
        .bind(transaction.outcome.as_str())
        .bind(&transaction.reference)
        .bind(&transaction.external_id)
        .bind(transaction.amount.as_ref().map(Money::amount_minor))
        .bind(transaction.amount.as_ref().map(|m| m.currency().as_str().to_string()))
        .bind(&transaction.raw_payload)
        .bind(transaction.recorded_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("record payment transaction", e))?;

        Ok(())
    }

    async fn list_for_reference(&self, reference: &str) -> Result<Vec<PaymentTransaction>, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, kind, outcome, reference, external_id,
                   amount_minor, currency, raw_payload, recorded_at
            FROM payment_transactions
            WHERE reference = $1
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("list payment transactions", e))?;

        rows.into_iter().map(PaymentTransaction::try_from).collect()
    }
}
