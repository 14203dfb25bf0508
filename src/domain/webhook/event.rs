//! Gateway webhook envelope and event classification.
//!
//! Only the fields the billing engine acts on are read; the full resource is
//! kept as JSON for the event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Webhook notification as delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WebhookEnvelope {
    /// Event id (WH-xxx). Redeliveries reuse it.
    pub id: String,

    pub event_type: String,

    #[serde(default)]
    pub create_time: Option<String>,

    #[serde(default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    pub resource: serde_json::Value,
}

/// What a webhook means for the billing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventKind {
    SubscriptionActivated,
    SubscriptionPaymentFailed,
    SubscriptionSuspended,
    SubscriptionCancelled,
    SubscriptionUpdated,
    /// A recurring charge for a subscription cleared.
    SubscriptionRenewalPaid,
    /// A one-off order capture completed.
    OrderCaptureCompleted,
    /// A one-off order capture was denied or reversed.
    OrderCaptureDenied,
    Unknown(String),
}

impl GatewayEventKind {
    pub fn from_event_type(event_type: &str) -> Self {
        match event_type {
            "BILLING.SUBSCRIPTION.ACTIVATED" | "BILLING.SUBSCRIPTION.RE-ACTIVATED" => {
                GatewayEventKind::SubscriptionActivated
            }
            "BILLING.SUBSCRIPTION.PAYMENT.FAILED" => GatewayEventKind::SubscriptionPaymentFailed,
            "BILLING.SUBSCRIPTION.SUSPENDED" => GatewayEventKind::SubscriptionSuspended,
            "BILLING.SUBSCRIPTION.CANCELLED" | "BILLING.SUBSCRIPTION.EXPIRED" => {
                GatewayEventKind::SubscriptionCancelled
            }
            "BILLING.SUBSCRIPTION.UPDATED" => GatewayEventKind::SubscriptionUpdated,
            "PAYMENT.SALE.COMPLETED" => GatewayEventKind::SubscriptionRenewalPaid,
            "PAYMENT.CAPTURE.COMPLETED" => GatewayEventKind::OrderCaptureCompleted,
            "PAYMENT.CAPTURE.DENIED" => GatewayEventKind::OrderCaptureDenied,
            other => GatewayEventKind::Unknown(other.to_string()),
        }
    }

    pub fn is_subscription_event(&self) -> bool {
        matches!(
            self,
            GatewayEventKind::SubscriptionActivated
                | GatewayEventKind::SubscriptionPaymentFailed
                | GatewayEventKind::SubscriptionSuspended
                | GatewayEventKind::SubscriptionCancelled
                | GatewayEventKind::SubscriptionUpdated
                | GatewayEventKind::SubscriptionRenewalPaid
        )
    }
}

impl WebhookEnvelope {
    pub fn kind(&self) -> GatewayEventKind {
        GatewayEventKind::from_event_type(&self.event_type)
    }

    /// Raw JSON for the event log.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn resource_str(&self, path: &[&str]) -> Option<String> {
        let mut value = &self.resource;
        for key in path {
            value = value.get(key)?;
        }
        value.as_str().map(str::to_string)
    }

    fn resource_time(&self, path: &[&str]) -> Option<Timestamp> {
        self.resource_str(path)
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| Timestamp::from_datetime(dt.with_timezone(&Utc)))
    }

    /// Gateway subscription id the event refers to.
    ///
    /// Subscription events carry it as the resource id; sale events as the
    /// billing agreement id.
    pub fn subscription_id(&self) -> Option<String> {
        match self.kind() {
            GatewayEventKind::SubscriptionRenewalPaid => self.resource_str(&["billing_agreement_id"]),
            _ => self.resource_str(&["id"]),
        }
    }

    pub fn plan_id(&self) -> Option<String> {
        self.resource_str(&["plan_id"])
    }

    pub fn next_billing_time(&self) -> Option<Timestamp> {
        self.resource_time(&["billing_info", "next_billing_time"])
    }

    /// When the resource changed at the gateway, falling back to the event time.
    ///
    /// A subscription resource's `create_time` is when it was first created,
    /// so status events use its `update_time` instead.
    pub fn occurred_at(&self) -> Option<Timestamp> {
        let kind = self.kind();
        let resource_time = if kind.is_subscription_event() && kind != GatewayEventKind::SubscriptionRenewalPaid {
            self.resource_time(&["update_time"])
        } else {
            self.resource_time(&["create_time"]).or_else(|| self.resource_time(&["update_time"]))
        };
        resource_time.or_else(|| {
            self.create_time
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| Timestamp::from_datetime(dt.with_timezone(&Utc)))
        })
    }

    /// Gateway order id a capture belongs to.
    pub fn capture_order_id(&self) -> Option<String> {
        self.resource_str(&["supplementary_data", "related_ids", "order_id"])
    }

    /// Capture id (or sale id for recurring payments).
    pub fn resource_id(&self) -> Option<String> {
        self.resource_str(&["id"])
    }

    pub fn payer_email(&self) -> Option<String> {
        self.resource_str(&["payer", "email_address"])
            .or_else(|| self.resource_str(&["subscriber", "email_address"]))
    }

    pub fn payer_name(&self) -> Option<String> {
        let given = self.resource_str(&["payer", "name", "given_name"]);
        let surname = self.resource_str(&["payer", "name", "surname"]);
        match (given, surname) {
            (Some(g), Some(s)) => Some(format!("{} {}", g, s)),
            (Some(g), None) => Some(g),
            (None, Some(s)) => Some(s),
            (None, None) => None,
        }
    }

    /// Amount as (decimal value, currency) from either the v2 capture shape
    /// (`amount.value`/`currency_code`) or the v1 sale shape (`total`/`currency`).
    pub fn amount(&self) -> Option<(String, String)> {
        let value = self
            .resource_str(&["amount", "value"])
            .or_else(|| self.resource_str(&["amount", "total"]))?;
        let currency = self
            .resource_str(&["amount", "currency_code"])
            .or_else(|| self.resource_str(&["amount", "currency"]))?;
        Some((value, currency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str, resource: serde_json::Value) -> WebhookEnvelope {
        WebhookEnvelope {
            id: "WH-1".to_string(),
            event_type: event_type.to_string(),
            create_time: Some("2024-05-01T10:00:00Z".to_string()),
            resource_type: None,
            summary: None,
            resource,
        }
    }

    #[test]
    fn subscription_event_types_are_classified() {
        assert_eq!(
            GatewayEventKind::from_event_type("BILLING.SUBSCRIPTION.RE-ACTIVATED"),
            GatewayEventKind::SubscriptionActivated
        );
        assert_eq!(
            GatewayEventKind::from_event_type("BILLING.SUBSCRIPTION.EXPIRED"),
            GatewayEventKind::SubscriptionCancelled
        );
        assert!(GatewayEventKind::SubscriptionRenewalPaid.is_subscription_event());
        assert!(!GatewayEventKind::OrderCaptureCompleted.is_subscription_event());
    }

    #[test]
    fn unknown_event_types_keep_their_name() {
        assert_eq!(
            GatewayEventKind::from_event_type("CUSTOMER.DISPUTE.CREATED"),
            GatewayEventKind::Unknown("CUSTOMER.DISPUTE.CREATED".to_string())
        );
    }

    #[test]
    fn sale_event_reads_subscription_from_billing_agreement() {
        let event = envelope(
            "PAYMENT.SALE.COMPLETED",
            json!({"id": "SALE-9", "billing_agreement_id": "I-ABC", "amount": {"total": "49.00", "currency": "USD"}}),
        );
        assert_eq!(event.subscription_id().as_deref(), Some("I-ABC"));
        assert_eq!(event.resource_id().as_deref(), Some("SALE-9"));
        assert_eq!(event.amount(), Some(("49.00".to_string(), "USD".to_string())));
    }

    #[test]
    fn capture_event_reads_related_order_id() {
        let event = envelope(
            "PAYMENT.CAPTURE.COMPLETED",
            json!({
                "id": "CAP-1",
                "amount": {"value": "150.00", "currency_code": "USD"},
                "supplementary_data": {"related_ids": {"order_id": "ORDER-7"}}
            }),
        );
        assert_eq!(event.capture_order_id().as_deref(), Some("ORDER-7"));
        assert_eq!(event.amount(), Some(("150.00".to_string(), "USD".to_string())));
    }

    #[test]
    fn next_billing_time_is_parsed() {
        let event = envelope(
            "BILLING.SUBSCRIPTION.ACTIVATED",
            json!({"id": "I-ABC", "billing_info": {"next_billing_time": "2024-06-01T10:00:00Z"}}),
        );
        let expected: chrono::DateTime<chrono::Utc> = "2024-06-01T10:00:00Z".parse().unwrap();
        assert_eq!(event.next_billing_time(), Some(Timestamp::from_datetime(expected)));
    }

    #[test]
    fn occurred_at_falls_back_to_envelope_time() {
        let event = envelope("BILLING.SUBSCRIPTION.SUSPENDED", json!({"id": "I-ABC"}));
        let expected: chrono::DateTime<chrono::Utc> = "2024-05-01T10:00:00Z".parse().unwrap();
        assert_eq!(event.occurred_at(), Some(Timestamp::from_datetime(expected)));
    }

    #[test]
    fn subscription_status_event_uses_update_time() {
        let event = envelope(
            "BILLING.SUBSCRIPTION.SUSPENDED",
            json!({
                "id": "I-ABC",
                "create_time": "2024-01-01T10:00:00Z",
                "update_time": "2024-04-30T08:00:00Z"
            }),
        );
        let expected: chrono::DateTime<chrono::Utc> = "2024-04-30T08:00:00Z".parse().unwrap();
        assert_eq!(event.occurred_at(), Some(Timestamp::from_datetime(expected)));
    }

    #[test]
    fn subscription_created_long_ago_falls_back_to_envelope_time() {
        let event = envelope(
            "BILLING.SUBSCRIPTION.ACTIVATED",
            json!({"id": "I-ABC", "create_time": "2024-01-01T10:00:00Z"}),
        );
        let expected: chrono::DateTime<chrono::Utc> = "2024-05-01T10:00:00Z".parse().unwrap();
        assert_eq!(event.occurred_at(), Some(Timestamp::from_datetime(expected)));
    }

    #[test]
    fn sale_event_uses_its_own_create_time() {
        let event = envelope(
            "PAYMENT.SALE.COMPLETED",
            json!({"id": "SALE-1", "create_time": "2024-04-30T09:00:00Z", "update_time": "2024-04-30T09:05:00Z"}),
        );
        let expected: chrono::DateTime<chrono::Utc> = "2024-04-30T09:00:00Z".parse().unwrap();
        assert_eq!(event.occurred_at(), Some(Timestamp::from_datetime(expected)));
    }

    #[test]
    fn envelope_deserializes_from_gateway_json() {
        let raw = r#"{"id":"WH-2","event_type":"BILLING.SUBSCRIPTION.CANCELLED","resource":{"id":"I-1"}}"#;
        let event: WebhookEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(event.kind(), GatewayEventKind::SubscriptionCancelled);
        assert!(event.create_time.is_none());
    }
}
