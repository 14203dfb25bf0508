//! In-memory webhook event log.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

#[derive(Default)]
pub struct InMemoryWebhookEventRepository {
    records: RwLock<HashMap<String, WebhookEventRecord>>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.records.read().await.get(event_id).cloned())
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let mut records = self.records.write().await;
        if records.get(&record.event_id).is_some_and(|r| r.result.is_final()) {
            return Ok(SaveResult::AlreadyExists);
        }
        records.insert(record.event_id.clone(), record);
        Ok(SaveResult::Inserted)
    }

    async fn delete_before(&self, before: Timestamp) -> Result<u64, DomainError> {
        let mut records = self.records.write().await;
        let initial = records.len();
        records.retain(|_, r| !r.processed_at.is_before(&before));
        Ok((initial - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ProcessingResult;

    #[tokio::test]
    async fn failed_record_is_replaced_by_success() {
        let repo = InMemoryWebhookEventRepository::new();
        let payload = serde_json::json!({});

        let first = repo
            .save(WebhookEventRecord::failed("WH-1", "PAYMENT.SALE.COMPLETED", "db down", 3, payload.clone()))
            .await
            .unwrap();
        let second = repo
            .save(WebhookEventRecord::success("WH-1", "PAYMENT.SALE.COMPLETED", 1, payload))
            .await
            .unwrap();

        assert_eq!(first, SaveResult::Inserted);
        assert_eq!(second, SaveResult::Inserted);
        let stored = repo.find_by_event_id("WH-1").await.unwrap().unwrap();
        assert_eq!(stored.result, ProcessingResult::Success);
    }

    #[tokio::test]
    async fn final_record_is_never_overwritten() {
        let repo = InMemoryWebhookEventRepository::new();
        let payload = serde_json::json!({});
        repo.save(WebhookEventRecord::ignored("WH-2", "CUSTOMER.DISPUTE.CREATED", "unhandled", payload.clone()))
            .await
            .unwrap();

        let result = repo
            .save(WebhookEventRecord::failed("WH-2", "CUSTOMER.DISPUTE.CREATED", "boom", 1, payload))
            .await
            .unwrap();

        assert_eq!(result, SaveResult::AlreadyExists);
    }

    #[tokio::test]
    async fn delete_before_removes_old_records() {
        let repo = InMemoryWebhookEventRepository::new();
        let mut old = WebhookEventRecord::success("WH-OLD", "X", 1, serde_json::Value::Null);
        old.processed_at = Timestamp::now().add_days(-40);
        repo.save(old).await.unwrap();
        repo.save(WebhookEventRecord::success("WH-NEW", "X", 1, serde_json::Value::Null))
            .await
            .unwrap();

        let removed = repo.delete_before(Timestamp::now().add_days(-30)).await.unwrap();

        assert_eq!(removed, 1);
        assert!(repo.find_by_event_id("WH-NEW").await.unwrap().is_some());
    }
}
