//! Billing configuration: settlement currency, plan catalog, redirects.

use serde::Deserialize;
use std::time::Duration;

use super::error::{is_http_url, ValidationError};
use crate::domain::foundation::Currency;

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Every charge settles in this currency, whatever the clinic displays.
    #[serde(default = "default_settlement_currency")]
    pub settlement_currency: String,

    /// YAML file replacing the embedded plan catalog.
    pub plan_catalog_path: Option<String>,

    #[serde(default = "default_catalog_cache_ttl")]
    pub catalog_cache_ttl_secs: u64,

    #[serde(default = "default_subscription_return_url")]
    pub subscription_return_url: String,

    #[serde(default = "default_subscription_cancel_url")]
    pub subscription_cancel_url: String,

    pub order_return_url: Option<String>,

    pub order_cancel_url: Option<String>,

    /// Shown on the gateway approval page.
    pub brand_name: Option<String>,

    /// A side-effect claim older than this may be taken over by a redelivery.
    #[serde(default = "default_side_effect_claim_timeout")]
    pub side_effect_claim_timeout_secs: u64,
}

impl BillingConfig {
    pub fn settlement_currency(&self) -> Result<Currency, ValidationError> {
        Currency::new(&self.settlement_currency)
            .map_err(|_| ValidationError::InvalidCurrency(self.settlement_currency.clone()))
    }

    pub fn catalog_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_cache_ttl_secs)
    }

    pub fn side_effect_claim_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.side_effect_claim_timeout_secs as i64)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.settlement_currency()?;
        if !is_http_url(&self.subscription_return_url) {
            return Err(ValidationError::InvalidRedirectUrl("subscription_return_url"));
        }
        if !is_http_url(&self.subscription_cancel_url) {
            return Err(ValidationError::InvalidRedirectUrl("subscription_cancel_url"));
        }
        if self.order_return_url.as_deref().is_some_and(|u| !is_http_url(u)) {
            return Err(ValidationError::InvalidRedirectUrl("order_return_url"));
        }
        if self.order_cancel_url.as_deref().is_some_and(|u| !is_http_url(u)) {
            return Err(ValidationError::InvalidRedirectUrl("order_cancel_url"));
        }
        if self.catalog_cache_ttl_secs == 0 {
            return Err(ValidationError::InvalidInterval("catalog_cache_ttl_secs"));
        }
        if self.side_effect_claim_timeout_secs == 0 {
            return Err(ValidationError::InvalidInterval("side_effect_claim_timeout_secs"));
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            settlement_currency: default_settlement_currency(),
            plan_catalog_path: None,
            catalog_cache_ttl_secs: default_catalog_cache_ttl(),
            subscription_return_url: default_subscription_return_url(),
            subscription_cancel_url: default_subscription_cancel_url(),
            order_return_url: None,
            order_cancel_url: None,
            brand_name: None,
            side_effect_claim_timeout_secs: default_side_effect_claim_timeout(),
        }
    }
}

fn default_settlement_currency() -> String {
    "USD".to_string()
}

fn default_catalog_cache_ttl() -> u64 {
    3_600
}

fn default_subscription_return_url() -> String {
    "http://localhost:3000/billing/approved".to_string()
}

fn default_subscription_cancel_url() -> String {
    "http://localhost:3000/billing/cancelled".to_string()
}

fn default_side_effect_claim_timeout() -> u64 {
    600
}
