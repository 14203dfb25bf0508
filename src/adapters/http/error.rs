//! Error kind to HTTP status mapping, applied at the API boundary.
//!
//! | Error | Status | Code |
//! |-------|--------|------|
//! | Validation | 400 | `VALIDATION_FAILED` |
//! | NotFound | 404 | `NOT_FOUND` |
//! | InvalidState | 409 | `INVALID_STATE` |
//! | Conflict | 409 | `CONCURRENT_MODIFICATION` |
//! | PaymentDeclined | 402 | `PAYMENT_DECLINED` |
//! | InvalidWebhookSignature | 401 | `INVALID_WEBHOOK_SIGNATURE` |
//! | Gateway | 502 | `GATEWAY_ERROR` |
//! | Configuration | 500 | `CONFIGURATION_ERROR` |
//! | Infrastructure | 500 | `INFRASTRUCTURE_ERROR` |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::application::webhooks::WebhookError;
use crate::application::BillingError;

/// Standard error body for all endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Everything a billing endpoint can fail with.
#[derive(Debug)]
pub enum ApiError {
    Billing(BillingError),
    /// The gateway declined the capture. Not an error inside the service,
    /// where it is a normal outcome, but a 402 to the caller.
    PaymentDeclined { order_id: String, reason: String },
    Webhook(WebhookError),
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        ApiError::Billing(err)
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        ApiError::Webhook(err)
    }
}

impl ApiError {
    fn status_and_body(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::Billing(err) => billing_status(err),
            ApiError::PaymentDeclined { order_id, reason } => (
                StatusCode::PAYMENT_REQUIRED,
                ErrorResponse::new("PAYMENT_DECLINED", format!("Payment was declined: {}", reason))
                    .with_details(serde_json::json!({ "order_id": order_id, "reason": reason })),
            ),
            ApiError::Webhook(err) => webhook_status(err),
        }
    }
}

fn billing_status(err: &BillingError) -> (StatusCode, ErrorResponse) {
    let status = match err {
        BillingError::Validation { .. } => StatusCode::BAD_REQUEST,
        BillingError::NotFound { .. } => StatusCode::NOT_FOUND,
        BillingError::InvalidState { .. } | BillingError::Conflict(_) => StatusCode::CONFLICT,
        BillingError::InvalidWebhookSignature(_) => StatusCode::UNAUTHORIZED,
        BillingError::Gateway(_) => StatusCode::BAD_GATEWAY,
        BillingError::Configuration(_) | BillingError::Infrastructure(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    // Server-side failures are logged in full and answered generically.
    let message = if status.is_server_error() {
        tracing::error!(error = %err, code = err.code(), "Request failed");
        match err {
            BillingError::Gateway(_) => "The payment gateway could not complete the request".to_string(),
            _ => "An internal error occurred".to_string(),
        }
    } else {
        err.to_string()
    };

    let mut body = ErrorResponse::new(err.code(), message);
    if let BillingError::Validation { field, .. } = err {
        body = body.with_details(serde_json::json!({ "field": field }));
    }
    if err.is_retryable() {
        body = body.with_details(serde_json::json!({ "retryable": true }));
    }
    (status, body)
}

fn webhook_status(err: &WebhookError) -> (StatusCode, ErrorResponse) {
    match err {
        WebhookError::InvalidSignature(reason) => (
            StatusCode::UNAUTHORIZED,
            ErrorResponse::new("INVALID_WEBHOOK_SIGNATURE", reason.clone()),
        ),
        WebhookError::MalformedPayload(reason) => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("MALFORMED_WEBHOOK", reason.clone()),
        ),
        // Non-2xx makes the gateway redeliver later.
        WebhookError::VerificationUnavailable(_) | WebhookError::QueueClosed => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorResponse::new("WEBHOOK_UNAVAILABLE", err.to_string()),
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
