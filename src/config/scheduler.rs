//! Background job cadence

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Due plan changes and cancellations.
    #[serde(default = "default_reconciliation_interval")]
    pub reconciliation_interval_secs: u64,

    #[serde(default = "default_token_refresh_interval")]
    pub token_refresh_interval_secs: u64,

    #[serde(default = "default_cleanup_interval")]
    pub webhook_cleanup_interval_secs: u64,
}

impl SchedulerConfig {
    pub fn reconciliation_interval(&self) -> Duration {
        Duration::from_secs(self.reconciliation_interval_secs)
    }

    pub fn token_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.token_refresh_interval_secs)
    }

    pub fn webhook_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.webhook_cleanup_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reconciliation_interval_secs == 0 {
            return Err(ValidationError::InvalidInterval("reconciliation_interval_secs"));
        }
        if self.token_refresh_interval_secs == 0 {
            return Err(ValidationError::InvalidInterval("token_refresh_interval_secs"));
        }
        if self.webhook_cleanup_interval_secs == 0 {
            return Err(ValidationError::InvalidInterval("webhook_cleanup_interval_secs"));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reconciliation_interval_secs: default_reconciliation_interval(),
            token_refresh_interval_secs: default_token_refresh_interval(),
            webhook_cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

fn default_reconciliation_interval() -> u64 {
    900
}

fn default_token_refresh_interval() -> u64 {
    1_800
}

fn default_cleanup_interval() -> u64 {
    86_400
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cadence() {
        let config = SchedulerConfig::default();
        assert_eq!(config.reconciliation_interval(), Duration::from_secs(15 * 60));
        assert_eq!(config.token_refresh_interval(), Duration::from_secs(30 * 60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = SchedulerConfig {
            token_refresh_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
