//! WebhookEventRepository port - log of processed gateway webhooks.
//!
//! The gateway delivers at least once, so the same event id can arrive many
//! times. A `success` or `ignored` record short-circuits redeliveries; a
//! `failed` record does not, and is overwritten when a redelivery succeeds.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingResult {
    Success,
    Ignored,
    Failed,
}

impl ProcessingResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingResult::Success => "success",
            ProcessingResult::Ignored => "ignored",
            ProcessingResult::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(ProcessingResult::Success),
            "ignored" => Some(ProcessingResult::Ignored),
            "failed" => Some(ProcessingResult::Failed),
            _ => None,
        }
    }

    /// Whether a redelivery of this event can be skipped.
    pub fn is_final(&self) -> bool {
        !matches!(self, ProcessingResult::Failed)
    }
}

/// Record of a processed webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEventRecord {
    /// Gateway event id (WH-xxx).
    pub event_id: String,
    pub event_type: String,
    pub processed_at: Timestamp,
    pub result: ProcessingResult,
    /// Reason for `ignored`, error for `failed`.
    pub detail: Option<String>,
    pub attempts: u32,
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        attempts: u32,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(event_id, event_type, ProcessingResult::Success, None, attempts, payload)
    }

    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(event_id, event_type, ProcessingResult::Ignored, Some(reason.into()), 1, payload)
    }

    pub fn failed(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        error: impl Into<String>,
        attempts: u32,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(event_id, event_type, ProcessingResult::Failed, Some(error.into()), attempts, payload)
    }

    fn build(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        result: ProcessingResult,
        detail: Option<String>,
        attempts: u32,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Timestamp::now(),
            result,
            detail,
            attempts,
            payload,
        }
    }
}

/// Result of attempting to save a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Stored, either new or replacing an earlier `failed` record.
    Inserted,
    /// A final (`success`/`ignored`) record already exists.
    AlreadyExists,
}

#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Store a record. Never overwrites a final record.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Delete records older than `before`; returns how many were removed.
    async fn delete_before(&self, before: Timestamp) -> Result<u64, DomainError>;
}
