//! PostgreSQL implementation of PaymentOrderRepository.
//!
//! Every status transition is a conditional `UPDATE ... WHERE status =
//! 'PENDING' RETURNING`, so exactly one caller wins a capture no matter how
//! many handlers race on the same order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    AppointmentId, Currency, DoctorId, DomainError, ErrorCode, Money, PatientId, PaymentOrderId,
    ServiceId, TenantId, Timestamp,
};
use crate::domain::payment::{CaptureDetails, OrderStatus, PayeeContext, PaymentOrder};
use crate::ports::{PaymentOrderRepository, TransitionOutcome};

const COLUMNS: &str = "id, order_id, tenant_id, patient_id, doctor_id, service_id, booked_slot, \
    amount_minor, currency, status, capture_id, payer_email, payer_name, raw_payload, \
    failure_reason, appointment_id, side_effect_claimed_at, created_at, updated_at, completed_at";

pub struct PostgresPaymentOrderRepository {
    pool: PgPool,
}

impl PostgresPaymentOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, order_id: &str) -> Result<bool, DomainError> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM payment_orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("look up payment order", e))?;
        Ok(found.is_some())
    }

    /// Classifies a conditional update that matched no row.
    async fn unchanged_or_missing(&self, order_id: &str) -> Result<TransitionOutcome, DomainError> {
        Ok(match self.find_by_order_id(order_id).await? {
            Some(order) => TransitionOutcome::Unchanged(order),
            None => TransitionOutcome::NotFound,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentOrderRow {
    id: Uuid,
    order_id: String,
    tenant_id: Uuid,
    patient_id: Uuid,
    doctor_id: Uuid,
    service_id: Option<Uuid>,
    booked_slot: String,
    amount_minor: i64,
    currency: String,
    status: String,
    capture_id: Option<String>,
    payer_email: Option<String>,
    payer_name: Option<String>,
    raw_payload: Option<serde_json::Value>,
    failure_reason: Option<String>,
    appointment_id: Option<Uuid>,
    side_effect_claimed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentOrderRow> for PaymentOrder {
    type Error = DomainError;

    fn try_from(row: PaymentOrderRow) -> Result<Self, Self::Error> {
        let currency = Currency::new(row.currency.trim()).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid currency: {}", e))
        })?;
        let status: OrderStatus = row.status.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid order status: {}", e))
        })?;

        let mut order = PaymentOrder::restore(
            PaymentOrderId::from_uuid(row.id),
            row.order_id,
            TenantId::from_uuid(row.tenant_id),
            PatientId::from_uuid(row.patient_id),
            PayeeContext {
                doctor_id: DoctorId::from_uuid(row.doctor_id),
                service_id: row.service_id.map(ServiceId::from_uuid),
                booked_slot: row.booked_slot,
            },
            Money::new(row.amount_minor, currency),
            Timestamp::from_datetime(row.created_at),
        );
        order.status = status;
        order.capture_id = row.capture_id;
        order.payer_email = row.payer_email;
        order.payer_name = row.payer_name;
        order.raw_payload = row.raw_payload;
        order.failure_reason = row.failure_reason;
        order.appointment_id = row.appointment_id.map(AppointmentId::from_uuid);
        order.side_effect_claimed_at = row.side_effect_claimed_at.map(Timestamp::from_datetime);
        order.updated_at = Timestamp::from_datetime(row.updated_at);
        order.completed_at = row.completed_at.map(Timestamp::from_datetime);
        Ok(order)
    }
}

fn not_found(order_id: &str) -> DomainError {
    DomainError::new(ErrorCode::OrderNotFound, format!("Payment order {} not found", order_id))
        .with_detail("id", order_id)
}

#[async_trait]
impl PaymentOrderRepository for PostgresPaymentOrderRepository {
    async fn insert(&self, order: &PaymentOrder) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_orders (
                id, order_id, tenant_id, patient_id, doctor_id, service_id, booked_slot,
                order_type, amount_minor, currency, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_id)
        .bind(order.tenant_id.as_uuid())
        .bind(order.patient_id.as_uuid())
        .bind(order.payee.doctor_id.as_uuid())
        .bind(order.payee.service_id.map(|s| *s.as_uuid()))
        .bind(&order.payee.booked_slot)
        .bind(order.order_type.as_str())
        .bind(order.amount().amount_minor())
        .bind(order.amount().currency().as_str())
        .bind(order.status.as_str())
        .bind(order.created_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("payment_orders_order_id_key") {
                    return DomainError::new(
                        ErrorCode::OrderAlreadyExists,
                        format!("Payment order {} already exists", order.order_id),
                    );
                }
            }
            DomainError::database("save payment order", e)
        })?;

        Ok(())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<PaymentOrder>, DomainError> {
        let row: Option<PaymentOrderRow> =
            sqlx::query_as(&format!("SELECT {} FROM payment_orders WHERE order_id = $1", COLUMNS))
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database("find payment order", e))?;

        row.map(PaymentOrder::try_from).transpose()
    }

    async fn complete_if_pending(
        &self,
        order_id: &str,
        details: &CaptureDetails,
        now: Timestamp,
    ) -> Result<TransitionOutcome, DomainError> {
        let row: Option<PaymentOrderRow> = sqlx::query_as(&format!(
            r#"
            UPDATE payment_orders SET
                status = 'COMPLETED',
                capture_id = $2,
                payer_email = $3,
                payer_name = $4,
                raw_payload = $5,
                side_effect_claimed_at = $6,
                completed_at = $6,
                updated_at = $6
            WHERE order_id = $1 AND status = 'PENDING'
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(order_id)
        .bind(&details.capture_id)
        .bind(&details.payer_email)
        .bind(&details.payer_name)
        .bind(&details.raw_payload)
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("complete payment order", e))?;

        match row {
            Some(row) => Ok(TransitionOutcome::Applied(PaymentOrder::try_from(row)?)),
            None => self.unchanged_or_missing(order_id).await,
        }
    }

    async fn fail_if_pending(
        &self,
        order_id: &str,
        reason: &str,
        now: Timestamp,
    ) -> Result<TransitionOutcome, DomainError> {
        let row: Option<PaymentOrderRow> = sqlx::query_as(&format!(
            r#"
            UPDATE payment_orders SET
                status = 'FAILED',
                failure_reason = $2,
                updated_at = $3
            WHERE order_id = $1 AND status = 'PENDING'
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(order_id)
        .bind(reason)
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("fail payment order", e))?;

        match row {
            Some(row) => Ok(TransitionOutcome::Applied(PaymentOrder::try_from(row)?)),
            None => self.unchanged_or_missing(order_id).await,
        }
    }

    async fn reclaim_side_effect(
        &self,
        order_id: &str,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<Option<PaymentOrder>, DomainError> {
        let row: Option<PaymentOrderRow> = sqlx::query_as(&format!(
            r#"
            UPDATE payment_orders SET
                side_effect_claimed_at = $2,
                updated_at = $2
            WHERE order_id = $1
              AND status = 'COMPLETED'
              AND appointment_id IS NULL
              AND (side_effect_claimed_at IS NULL OR side_effect_claimed_at <= $3)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(order_id)
        .bind(now.as_datetime())
        .bind(stale_before.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("claim appointment side effect", e))?;

        match row {
            Some(row) => Ok(Some(PaymentOrder::try_from(row)?)),
            None if self.exists(order_id).await? => Ok(None),
            None => Err(not_found(order_id)),
        }
    }

    async fn find_unfulfilled(&self, stale_before: Timestamp, limit: u32) -> Result<Vec<PaymentOrder>, DomainError> {
        let rows: Vec<PaymentOrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM payment_orders
            WHERE status = 'COMPLETED'
              AND appointment_id IS NULL
              AND (side_effect_claimed_at IS NULL OR side_effect_claimed_at <= $1)
            ORDER BY created_at
            LIMIT $2
            "#,
            COLUMNS
        ))
        .bind(stale_before.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("find unfulfilled payment orders", e))?;

        rows.into_iter().map(PaymentOrder::try_from).collect()
    }

    async fn release_side_effect_claim(&self, order_id: &str) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE payment_orders SET side_effect_claimed_at = NULL
            WHERE order_id = $1 AND appointment_id IS NULL
            "#,
        )
        .bind(order_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("release side-effect claim", e))?;

        if !self.exists(order_id).await? {
            return Err(not_found(order_id));
        }
        Ok(())
    }

    async fn attach_appointment(
        &self,
        order_id: &str,
        appointment_id: AppointmentId,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE payment_orders SET appointment_id = $2, updated_at = $3 WHERE order_id = $1",
        )
        .bind(order_id)
        .bind(appointment_id.as_uuid())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("attach appointment", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(order_id));
        }
        Ok(())
    }
}
