//! PostgreSQL webhook event log.
//!
//! The primary key on `event_id` is the idempotency guard. A `failed` record
//! may be overwritten by a later attempt; `success` and `ignored` are final.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{ProcessingResult, SaveResult, WebhookEventRecord, WebhookEventRepository};

pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    event_id: String,
    event_type: String,
    processed_at: DateTime<Utc>,
    result: String,
    detail: Option<String>,
    attempts: i32,
    payload: serde_json::Value,
}

impl TryFrom<WebhookEventRow> for WebhookEventRecord {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        let result = ProcessingResult::parse(&row.result).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid webhook result value: {}", row.result),
            )
        })?;

        Ok(WebhookEventRecord {
            event_id: row.event_id,
            event_type: row.event_type,
            processed_at: Timestamp::from_datetime(row.processed_at),
            result,
            detail: row.detail,
            attempts: row.attempts.max(0) as u32,
            payload: row.payload,
        })
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, processed_at, result, detail, attempts, payload
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("find webhook event", e))?;

        row.map(WebhookEventRecord::try_from).transpose()
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (event_id, event_type, processed_at, result, detail, attempts, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (event_id) DO UPDATE SET
                event_type = EXCLUDED.event_type,
                processed_at = EXCLUDED.processed_at,
                result = EXCLUDED.result,
                detail = EXCLUDED.detail,
                attempts = EXCLUDED.attempts,
                payload = EXCLUDED.payload
            WHERE webhook_events.result = 'failed'
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(record.processed_at.as_datetime())
        .bind(record.result.as_str())
        .bind(&record.detail)
        .bind(record.attempts as i32)
        .bind(&record.payload)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("save webhook event", e))?;

        Ok(if result.rows_affected() == 0 {
            SaveResult::AlreadyExists
        } else {
            SaveResult::Inserted
        })
    }

    async fn delete_before(&self, before: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM webhook_events WHERE processed_at < $1")
            .bind(before.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("delete old webhook events", e))?;

        Ok(result.rows_affected())
    }
}
