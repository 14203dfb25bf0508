//! Webhook worker pool configuration

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Submissions wait when the queue is full.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Attempts per event before it is recorded as failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the second attempt; doubles for each later one.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Processed-event records older than this are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl WebhookConfig {
    pub fn retry_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(2..=5).contains(&self.workers) {
            return Err(ValidationError::InvalidWorkerCount);
        }
        if self.queue_capacity == 0 {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidRetryPolicy("webhook attempts must be at least 1"));
        }
        if self.retention_days <= 0 {
            return Err(ValidationError::InvalidInterval("retention_days"));
        }
        Ok(())
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_workers() -> usize {
    3
}

fn default_queue_capacity() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_retention_days() -> i64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = WebhookConfig::default();
        assert_eq!(config.workers, 3);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn worker_count_is_bounded() {
        for workers in [0, 1, 6] {
            let config = WebhookConfig {
                workers,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ValidationError::InvalidWorkerCount)));
        }
    }

    #[test]
    fn empty_queue_is_rejected() {
        let config = WebhookConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidQueueCapacity)));
    }
}
