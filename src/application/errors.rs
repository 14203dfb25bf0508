//! Billing error type returned by the application services.
//!
//! Ports speak `DomainError` and `GatewayError`; services convert both into
//! `BillingError`, and the HTTP layer maps its variants to status codes.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::GatewayError;

#[derive(Debug, Clone, Error)]
pub enum BillingError {
    #[error("Validation failed on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Gateway error: {0}")]
    Gateway(GatewayError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state: cannot {attempted} while {current}")]
    InvalidState { current: String, attempted: String },

    /// Another writer changed the record first. Safe to retry.
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidWebhookSignature(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl BillingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        BillingError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::Validation { .. } => "VALIDATION_FAILED",
            BillingError::NotFound { .. } => "NOT_FOUND",
            BillingError::Gateway(_) => "GATEWAY_ERROR",
            BillingError::Configuration(_) => "CONFIGURATION_ERROR",
            BillingError::InvalidState { .. } => "INVALID_STATE",
            BillingError::Conflict(_) => "CONCURRENT_MODIFICATION",
            BillingError::InvalidWebhookSignature(_) => "INVALID_WEBHOOK_SIGNATURE",
            BillingError::Infrastructure(_) => "INFRASTRUCTURE_ERROR",
        }
    }

    /// Whether repeating the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::Gateway(e) => e.retryable,
            BillingError::Conflict(_) | BillingError::Infrastructure(_) => true,
            _ => false,
        }
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        let detail = |key: &str| err.details.get(key).cloned();
        match err.code {
            ErrorCode::ValidationFailed => BillingError::Validation {
                field: detail("field").unwrap_or_else(|| "input".to_string()),
                message: err.message,
            },
            ErrorCode::OrderNotFound => not_found_from("payment order", &err),
            ErrorCode::SubscriptionNotFound => not_found_from("subscription", &err),
            ErrorCode::PatientNotFound => not_found_from("patient", &err),
            ErrorCode::DoctorNotFound => not_found_from("doctor", &err),
            ErrorCode::ServiceNotFound => not_found_from("service", &err),
            ErrorCode::InvalidStateTransition => BillingError::InvalidState {
                current: detail("current").unwrap_or_else(|| "unknown".to_string()),
                attempted: detail("attempted").unwrap_or(err.message),
            },
            ErrorCode::OrderAlreadyExists | ErrorCode::SubscriptionExists => {
                BillingError::InvalidState {
                    current: "exists".to_string(),
                    attempted: err.message,
                }
            }
            ErrorCode::ConcurrentModification => BillingError::Conflict(err.message),
            ErrorCode::ConfigurationError => BillingError::Configuration(err.message),
            ErrorCode::ExternalServiceError | ErrorCode::DatabaseError | ErrorCode::InternalError => {
                BillingError::Infrastructure(err.to_string())
            }
        }
    }
}

fn not_found_from(resource: &'static str, err: &DomainError) -> BillingError {
    BillingError::NotFound {
        resource,
        id: err.details.get("id").cloned().unwrap_or_else(|| err.message.clone()),
    }
}

impl From<GatewayError> for BillingError {
    fn from(err: GatewayError) -> Self {
        match err.code {
            crate::ports::GatewayErrorCode::Configuration => BillingError::Configuration(err.message),
            _ => BillingError::Gateway(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GatewayErrorCode;

    #[test]
    fn validation_domain_error_keeps_field() {
        let err: BillingError = DomainError::validation("fee", "must be positive").into();
        match err {
            BillingError::Validation { field, message } => {
                assert_eq!(field, "fee");
                assert_eq!(message, "must be positive");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn not_found_uses_id_detail() {
        let err: BillingError = DomainError::new(ErrorCode::DoctorNotFound, "no such doctor")
            .with_detail("id", "doc-1")
            .into();
        assert!(matches!(err, BillingError::NotFound { resource: "doctor", ref id } if id == "doc-1"));
    }

    #[test]
    fn transition_details_become_invalid_state() {
        let err: BillingError = DomainError::new(ErrorCode::InvalidStateTransition, "bad move")
            .with_detail("current", "FAILED")
            .with_detail("attempted", "COMPLETED")
            .into();
        assert_eq!(err.to_string(), "Invalid state: cannot COMPLETED while FAILED");
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[test]
    fn concurrent_modification_is_retryable() {
        let err: BillingError = DomainError::new(ErrorCode::ConcurrentModification, "version 3 is stale").into();
        assert!(matches!(err, BillingError::Conflict(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn database_error_is_infrastructure() {
        let err: BillingError = DomainError::database("insert order", "connection reset").into();
        assert!(matches!(err, BillingError::Infrastructure(_)));
    }

    #[test]
    fn gateway_configuration_error_is_not_retryable() {
        let err: BillingError = GatewayError::configuration("no credentials for tenant").into();
        assert!(matches!(err, BillingError::Configuration(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn gateway_retryability_is_preserved() {
        let err: BillingError = GatewayError::from_status(503, "unavailable").into();
        assert!(err.is_retryable());

        let err: BillingError = GatewayError::new(GatewayErrorCode::InvalidRequest, "bad amount").into();
        assert!(!err.is_retryable());
    }
}
