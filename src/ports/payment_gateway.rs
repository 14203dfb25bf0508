//! Payment gateway port.
//!
//! Defines the contract the billing engine needs from the external payment
//! gateway: one-off orders, recurring subscriptions, and webhook
//! verification.
//!
//! # Design
//!
//! - **Declines are data**: a declined capture is `Ok` with `success == false`
//! - **Retry classification travels with the error** via [`GatewayError::retryable`]
//! - **Idempotent**: callers supply idempotency keys for create calls

use crate::domain::foundation::{DomainError, ErrorCode, Money, TenantId, Timestamp};
use crate::domain::subscription::PaymentMethodSummary;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Port for payment gateway integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a one-off order the payer must approve.
    async fn create_order(
        &self,
        tenant_id: &TenantId,
        request: CreateOrderRequest,
    ) -> Result<CreatedOrder, GatewayError>;

    /// Capture an approved order.
    ///
    /// A business decline is returned as `Ok(CaptureResult { success: false, .. })`.
    async fn capture_order(
        &self,
        tenant_id: &TenantId,
        order_id: &str,
    ) -> Result<CaptureResult, GatewayError>;

    /// Create a recurring subscription for a gateway plan.
    async fn create_subscription(
        &self,
        tenant_id: &TenantId,
        request: CreateSubscriptionRequest,
    ) -> Result<CreatedSubscription, GatewayError>;

    /// Fetch the gateway's view of a subscription.
    async fn fetch_subscription(
        &self,
        tenant_id: &TenantId,
        subscription_id: &str,
    ) -> Result<GatewaySubscription, GatewayError>;

    /// Verify that a webhook delivery really came from the gateway.
    ///
    /// Returns `Ok(false)` for a well-formed request that fails verification;
    /// `Err` only when verification itself could not be performed.
    async fn verify_webhook_signature(
        &self,
        payload: &[u8],
        headers: &WebhookHeaders,
        webhook_id: &str,
    ) -> Result<bool, GatewayError>;

    /// Refresh cached credentials ahead of expiry.
    async fn refresh_credentials(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// Request to create a one-off order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub amount: Money,

    /// Our reference for the purchase (internal order row id).
    pub reference_id: String,

    /// Shown to the payer on the approval page.
    pub description: String,

    /// Opaque metadata echoed back on webhooks.
    pub custom_id: String,

    /// Same key for the same logical request, so retries never double-create.
    pub idempotency_key: String,

    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order_id: String,
    pub status: String,
    pub approval_url: Option<String>,
}

/// Outcome of a capture attempt the gateway answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResult {
    pub success: bool,
    pub status: String,
    pub capture_id: Option<String>,
    pub payer_email: Option<String>,
    pub payer_name: Option<String>,
    /// Gateway response body, kept for reconciliation.
    pub raw_response: serde_json::Value,
}

/// Request to create a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub plan_id: String,

    /// Tenant id, echoed back as the subscription's custom id.
    pub custom_id: String,

    pub return_url: String,
    pub cancel_url: String,
    pub brand_name: Option<String>,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedSubscription {
    pub subscription_id: String,
    pub status: String,
    pub approval_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySubscription {
    pub subscription_id: String,
    pub status: String,
    pub plan_id: Option<String>,
    pub next_billing_time: Option<Timestamp>,
    pub last_payment_time: Option<Timestamp>,
    pub subscriber_email: Option<String>,
    /// Funding source the gateway charges, already masked.
    pub payment_method: Option<PaymentMethodSummary>,
}

/// Transmission headers the gateway attaches to every webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub transmission_id: Option<String>,
    pub transmission_time: Option<String>,
    pub transmission_sig: Option<String>,
    pub cert_url: Option<String>,
    pub auth_algo: Option<String>,
}

impl WebhookHeaders {
    pub const TRANSMISSION_ID: &'static str = "paypal-transmission-id";
    pub const TRANSMISSION_TIME: &'static str = "paypal-transmission-time";
    pub const TRANSMISSION_SIG: &'static str = "paypal-transmission-sig";
    pub const CERT_URL: &'static str = "paypal-cert-url";
    pub const AUTH_ALGO: &'static str = "paypal-auth-algo";

    /// Builds from (name, value) pairs; names match case-insensitively.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();
        let get = |name: &str| map.get(name).filter(|v| !v.trim().is_empty()).cloned();
        Self {
            transmission_id: get(Self::TRANSMISSION_ID),
            transmission_time: get(Self::TRANSMISSION_TIME),
            transmission_sig: get(Self::TRANSMISSION_SIG),
            cert_url: get(Self::CERT_URL),
            auth_algo: get(Self::AUTH_ALGO),
        }
    }

    /// Names of required headers that are absent.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (Self::TRANSMISSION_ID, &self.transmission_id),
            (Self::TRANSMISSION_TIME, &self.transmission_time),
            (Self::TRANSMISSION_SIG, &self.transmission_sig),
            (Self::CERT_URL, &self.cert_url),
            (Self::AUTH_ALGO, &self.auth_algo),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    /// Gateway error name (e.g. `INVALID_REQUEST`), when provided.
    pub provider_code: Option<String>,
    pub http_status: Option<u16>,
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            http_status: None,
            retryable: code.is_retryable(),
        }
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let code = match status {
            401 | 403 => GatewayErrorCode::Authentication,
            404 => GatewayErrorCode::NotFound,
            408 => GatewayErrorCode::Timeout,
            429 => GatewayErrorCode::RateLimited,
            500..=599 => GatewayErrorCode::ProviderUnavailable,
            _ => GatewayErrorCode::InvalidRequest,
        };
        let mut err = Self::new(code, message);
        err.http_status = Some(status);
        err
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Configuration, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }

    pub fn cancelled(operation: &str) -> Self {
        Self::new(
            GatewayErrorCode::Cancelled,
            format!("{} cancelled by shutdown", operation),
        )
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        let code = match err.code {
            GatewayErrorCode::Configuration => ErrorCode::ConfigurationError,
            _ => ErrorCode::ExternalServiceError,
        };
        DomainError::new(code, err.message)
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Connection failed before a response arrived.
    Network,
    Timeout,
    RateLimited,
    /// 5xx from the gateway.
    ProviderUnavailable,
    /// Credentials rejected.
    Authentication,
    /// 4xx business or validation failure.
    InvalidRequest,
    NotFound,
    /// Response could not be parsed.
    InvalidResponse,
    /// No usable credentials or plan mapping. Never retried.
    Configuration,
    /// Shutdown interrupted a retry wait.
    Cancelled,
}

impl GatewayErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::Network
                | GatewayErrorCode::Timeout
                | GatewayErrorCode::RateLimited
                | GatewayErrorCode::ProviderUnavailable
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::Network => "network_error",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::RateLimited => "rate_limited",
            GatewayErrorCode::ProviderUnavailable => "provider_unavailable",
            GatewayErrorCode::Authentication => "authentication_error",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::InvalidResponse => "invalid_response",
            GatewayErrorCode::Configuration => "configuration_error",
            GatewayErrorCode::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}
