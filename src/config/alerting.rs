//! Success-rate alerting configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct AlertingConfig {
    /// Percent.
    #[serde(default = "default_webhook_threshold")]
    pub webhook_success_threshold: f64,

    #[serde(default = "default_gateway_threshold")]
    pub gateway_api_success_threshold: f64,

    #[serde(default = "default_subscription_threshold")]
    pub subscription_creation_success_threshold: f64,

    /// Windows with fewer outcomes than this are not judged.
    #[serde(default = "default_min_samples")]
    pub min_samples: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl AlertingConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_threshold(self.webhook_success_threshold, "webhook_success_threshold")?;
        check_threshold(self.gateway_api_success_threshold, "gateway_api_success_threshold")?;
        check_threshold(
            self.subscription_creation_success_threshold,
            "subscription_creation_success_threshold",
        )?;
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidInterval("sweep_interval_secs"));
        }
        Ok(())
    }
}

fn check_threshold(value: f64, name: &'static str) -> Result<(), ValidationError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::InvalidThreshold(name));
    }
    Ok(())
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            webhook_success_threshold: default_webhook_threshold(),
            gateway_api_success_threshold: default_gateway_threshold(),
            subscription_creation_success_threshold: default_subscription_threshold(),
            min_samples: default_min_samples(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_webhook_threshold() -> f64 {
    95.0
}

fn default_gateway_threshold() -> f64 {
    90.0
}

fn default_subscription_threshold() -> f64 {
    85.0
}

fn default_min_samples() -> u64 {
    10
}

fn default_sweep_interval() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds() {
        let config = AlertingConfig::default();
        assert_eq!(config.webhook_success_threshold, 95.0);
        assert_eq!(config.gateway_api_success_threshold, 90.0);
        assert_eq!(config.subscription_creation_success_threshold, 85.0);
        assert_eq!(config.min_samples, 10);
        assert_eq!(config.sweep_interval(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn threshold_above_hundred_is_rejected() {
        let config = AlertingConfig {
            gateway_api_success_threshold: 120.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidThreshold("gateway_api_success_threshold"))
        ));
    }
}
