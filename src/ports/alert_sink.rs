//! Alert sink port.
//!
//! Alerts are raised by the billing monitor when a success rate drops below
//! its threshold, and immediately for failures that need a human (invalid
//! webhook signatures, captures that could not be reconciled).

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "LOW",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    WebhookSuccessRateLow,
    GatewayApiSuccessRateLow,
    SubscriptionCreationSuccessRateLow,
    WebhookSignatureInvalid,
    WebhookProcessingFailed,
    SubscriptionCreationFailed,
    CaptureReconciliationRequired,
    AppointmentCreationFailed,
    GatewayCallFailed,
    NotificationDeliveryFailed,
    AppointmentScheduleFallback,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::WebhookSuccessRateLow => "WEBHOOK_SUCCESS_RATE_LOW",
            AlertKind::GatewayApiSuccessRateLow => "GATEWAY_API_SUCCESS_RATE_LOW",
            AlertKind::SubscriptionCreationSuccessRateLow => "SUBSCRIPTION_CREATION_SUCCESS_RATE_LOW",
            AlertKind::WebhookSignatureInvalid => "WEBHOOK_SIGNATURE_INVALID",
            AlertKind::WebhookProcessingFailed => "WEBHOOK_PROCESSING_FAILED",
            AlertKind::SubscriptionCreationFailed => "SUBSCRIPTION_CREATION_FAILED",
            AlertKind::CaptureReconciliationRequired => "CAPTURE_RECONCILIATION_REQUIRED",
            AlertKind::AppointmentCreationFailed => "APPOINTMENT_CREATION_FAILED",
            AlertKind::GatewayCallFailed => "GATEWAY_CALL_FAILED",
            AlertKind::NotificationDeliveryFailed => "NOTIFICATION_DELIVERY_FAILED",
            AlertKind::AppointmentScheduleFallback => "APPOINTMENT_SCHEDULE_FALLBACK",
        }
    }

    /// Severity used when the caller has no better information.
    pub fn default_severity(&self) -> AlertSeverity {
        match self {
            AlertKind::WebhookSignatureInvalid => AlertSeverity::Critical,
            AlertKind::WebhookSuccessRateLow
            | AlertKind::GatewayApiSuccessRateLow
            | AlertKind::SubscriptionCreationSuccessRateLow
            | AlertKind::WebhookProcessingFailed
            | AlertKind::SubscriptionCreationFailed
            | AlertKind::CaptureReconciliationRequired
            | AlertKind::AppointmentCreationFailed
            | AlertKind::GatewayCallFailed => AlertSeverity::High,
            AlertKind::NotificationDeliveryFailed | AlertKind::AppointmentScheduleFallback => {
                AlertSeverity::Medium
            }
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub context: BTreeMap<String, String>,
    pub raised_at: Timestamp,
}

impl Alert {
    pub fn new(kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            context: BTreeMap::new(),
            raised_at: Timestamp::now(),
        }
    }

    pub fn with_severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }
}

/// Delivers alerts. Delivery failures are the sink's problem; callers never
/// fail because an alert could not be sent.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn raise(&self, alert: Alert);
}
