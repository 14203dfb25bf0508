//! Payment gateway (PayPal) configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::{is_http_url, ValidationError};
use super::server::Environment;

pub const SANDBOX_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
pub const LIVE_BASE_URL: &str = "https://api-m.paypal.com";

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    #[default]
    Sandbox,
    Live,
}

/// Gateway configuration.
///
/// `client_id`/`client_secret` are the platform credentials used when a
/// tenant has no credentials of its own.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub client_id: Option<String>,

    pub client_secret: Option<SecretString>,

    /// Webhook id assigned by the gateway; required to verify signatures.
    pub webhook_id: Option<String>,

    #[serde(default)]
    pub mode: GatewayMode,

    /// Overrides the mode's base URL (used by tests).
    pub base_url: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub retry_initial_backoff_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub retry_backoff_multiplier: u32,

    #[serde(default = "default_max_backoff")]
    pub retry_max_backoff_ms: u64,

    /// Tokens are refreshed this long before they expire.
    #[serde(default = "default_token_refresh_margin")]
    pub token_refresh_margin_secs: u64,
}

impl GatewayConfig {
    pub fn base_url(&self) -> String {
        match (&self.base_url, self.mode) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, GatewayMode::Sandbox) => SANDBOX_BASE_URL.to_string(),
            (None, GatewayMode::Live) => LIVE_BASE_URL.to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_refresh_margin(&self) -> Duration {
        Duration::from_secs(self.token_refresh_margin_secs)
    }

    pub fn has_global_credentials(&self) -> bool {
        self.client_id.as_deref().is_some_and(|id| !id.is_empty()) && self.client_secret.is_some()
    }

    /// Production requires live mode, platform credentials, and a webhook id.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if let Some(url) = &self.base_url {
            if !is_http_url(url) {
                return Err(ValidationError::InvalidGatewayUrl);
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.retry_max_attempts == 0 {
            return Err(ValidationError::InvalidRetryPolicy("max attempts must be at least 1"));
        }
        if self.retry_backoff_multiplier == 0 {
            return Err(ValidationError::InvalidRetryPolicy("multiplier must be at least 1"));
        }
        if self.retry_initial_backoff_ms > self.retry_max_backoff_ms {
            return Err(ValidationError::InvalidRetryPolicy("initial backoff exceeds maximum"));
        }

        if *environment == Environment::Production {
            if !self.has_global_credentials() {
                return Err(ValidationError::MissingRequired("GATEWAY_CLIENT_ID/GATEWAY_CLIENT_SECRET"));
            }
            if self.webhook_id.as_deref().map_or(true, str::is_empty) {
                return Err(ValidationError::MissingRequired("GATEWAY_WEBHOOK_ID"));
            }
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            webhook_id: None,
            mode: GatewayMode::default(),
            base_url: None,
            request_timeout_secs: default_request_timeout(),
            retry_max_attempts: default_max_attempts(),
            retry_initial_backoff_ms: default_initial_backoff(),
            retry_backoff_multiplier: default_backoff_multiplier(),
            retry_max_backoff_ms: default_max_backoff(),
            token_refresh_margin_secs: default_token_refresh_margin(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    2_000
}

fn default_backoff_multiplier() -> u32 {
    2
}

fn default_max_backoff() -> u64 {
    30_000
}

fn default_token_refresh_margin() -> u64 {
    300
}
