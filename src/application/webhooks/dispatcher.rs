//! WebhookDispatcher - routes verified gateway events at most once.
//!
//! ## How It Works
//!
//! 1. Look the event id up in the webhook event log
//! 2. A `success` or `ignored` record means a redelivery: skip it
//! 3. Otherwise route by event type to the order processor or the
//!    subscription manager
//! 4. Record the result; errors are returned unrecorded so the worker can
//!    retry, and only the worker's final failure is logged as `failed`.
//!    A capture whose appointment could not be booked counts as an error.

use std::sync::Arc;

use crate::application::orders::{OrderPaymentProcessor, WebhookPayment, WebhookPaymentOutcome};
use crate::application::subscriptions::{SubscriptionEventOutcome, SubscriptionLifecycleManager};
use crate::application::BillingError;
use crate::domain::webhook::{GatewayEventKind, WebhookEnvelope};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

/// Result of dispatching one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Processed,
    Ignored(String),
    /// Already handled by an earlier delivery.
    Duplicate,
}

pub struct WebhookDispatcher {
    events: Arc<dyn WebhookEventRepository>,
    orders: Arc<OrderPaymentProcessor>,
    subscriptions: Arc<SubscriptionLifecycleManager>,
}

impl WebhookDispatcher {
    pub fn new(
        events: Arc<dyn WebhookEventRepository>,
        orders: Arc<OrderPaymentProcessor>,
        subscriptions: Arc<SubscriptionLifecycleManager>,
    ) -> Self {
        Self {
            events,
            orders,
            subscriptions,
        }
    }

    #[tracing::instrument(skip(self, envelope), fields(event_id = %envelope.id, event_type = %envelope.event_type))]
    pub async fn dispatch(&self, envelope: &WebhookEnvelope, attempt: u32) -> Result<DispatchOutcome, BillingError> {
        if let Some(record) = self.events.find_by_event_id(&envelope.id).await? {
            if record.result.is_final() {
                tracing::debug!(result = record.result.as_str(), "Skipping redelivered event");
                return Ok(DispatchOutcome::Duplicate);
            }
        }

        let outcome = self.route(envelope).await?;

        let record = match &outcome {
            DispatchOutcome::Ignored(reason) => {
                WebhookEventRecord::ignored(&envelope.id, &envelope.event_type, reason.clone(), envelope.to_json())
            }
            _ => WebhookEventRecord::success(&envelope.id, &envelope.event_type, attempt, envelope.to_json()),
        };
        if self.events.save(record).await? == SaveResult::AlreadyExists {
            // A concurrent delivery of the same event finished first.
            tracing::debug!("Event already recorded by another delivery");
        }
        Ok(outcome)
    }

    /// Log a delivery that exhausted its attempts so a redelivery may retry it.
    pub async fn record_failure(&self, envelope: &WebhookEnvelope, error: &BillingError, attempts: u32) {
        let record = WebhookEventRecord::failed(
            &envelope.id,
            &envelope.event_type,
            error.to_string(),
            attempts,
            envelope.to_json(),
        );
        if let Err(e) = self.events.save(record).await {
            tracing::error!(event_id = %envelope.id, error = %e, "Failed to record webhook failure");
        }
    }

    async fn route(&self, envelope: &WebhookEnvelope) -> Result<DispatchOutcome, BillingError> {
        let kind = envelope.kind();
        match kind {
            GatewayEventKind::OrderCaptureCompleted => {
                let Some(order_id) = envelope.capture_order_id() else {
                    return Ok(DispatchOutcome::Ignored("capture without related order id".to_string()));
                };
                let outcome = self
                    .orders
                    .process_webhook_payment(WebhookPayment {
                        order_id,
                        capture_id: envelope.resource_id(),
                        payer_email: envelope.payer_email(),
                        payer_name: envelope.payer_name(),
                        raw_payload: envelope.resource.clone(),
                    })
                    .await?;
                Ok(match outcome {
                    // Paid but not booked: retry until the appointment exists.
                    WebhookPaymentOutcome::Processed { appointment_id: None } => {
                        return Err(BillingError::Infrastructure(
                            "payment recorded but appointment not created".to_string(),
                        ));
                    }
                    WebhookPaymentOutcome::Processed { .. } | WebhookPaymentOutcome::RequiresReconciliation => {
                        DispatchOutcome::Processed
                    }
                    WebhookPaymentOutcome::AlreadyProcessed => DispatchOutcome::Ignored("order already processed".to_string()),
                    WebhookPaymentOutcome::SideEffectInProgress => {
                        DispatchOutcome::Ignored("appointment side effect held by another handler".to_string())
                    }
                    WebhookPaymentOutcome::UnknownOrder => DispatchOutcome::Ignored("unknown order".to_string()),
                })
            }
            GatewayEventKind::OrderCaptureDenied => {
                let Some(order_id) = envelope.capture_order_id() else {
                    return Ok(DispatchOutcome::Ignored("denial without related order id".to_string()));
                };
                let reason = envelope.summary.clone().unwrap_or_else(|| "CAPTURE_DENIED".to_string());
                if self.orders.process_webhook_denial(&order_id, &reason).await? {
                    Ok(DispatchOutcome::Processed)
                } else {
                    Ok(DispatchOutcome::Ignored("order not pending".to_string()))
                }
            }
            GatewayEventKind::Unknown(event_type) => {
                tracing::info!(event_type = %event_type, "Unhandled webhook event type");
                Ok(DispatchOutcome::Ignored(format!("unhandled event type {}", event_type)))
            }
            _ => match self.subscriptions.apply_webhook_event(envelope).await? {
                SubscriptionEventOutcome::Applied { .. } | SubscriptionEventOutcome::CancellationDeferred { .. } => {
                    Ok(DispatchOutcome::Processed)
                }
                SubscriptionEventOutcome::Ignored(reason) => Ok(DispatchOutcome::Ignored(reason)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_fixtures::{capture_completed, envelope, TestBilling};
    use crate::domain::payment::OrderStatus;
    use crate::ports::{AlertKind, PaymentOrderRepository, ProcessingResult};
    use serde_json::json;

    #[tokio::test]
    async fn capture_webhook_completes_order_and_is_recorded() {
        let t = TestBilling::new().await;
        let order_id = t.create_order().await;

        let outcome = t.services.dispatcher.dispatch(&capture_completed("WH-1", &order_id), 1).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Processed);
        let order = t.kit.orders.find_by_order_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.capture_id.as_deref(), Some(format!("CAP-{}", order_id).as_str()));
        let record = t.kit.webhook_events.find_by_event_id("WH-1").await.unwrap().unwrap();
        assert_eq!(record.result, ProcessingResult::Success);
    }

    #[tokio::test]
    async fn redelivered_event_is_skipped() {
        let t = TestBilling::new().await;
        let order_id = t.create_order().await;
        let event = capture_completed("WH-1", &order_id);
        t.services.dispatcher.dispatch(&event, 1).await.unwrap();

        let again = t.services.dispatcher.dispatch(&event, 1).await.unwrap();

        assert_eq!(again, DispatchOutcome::Duplicate);
        assert_eq!(t.kit.directory.appointments().await.len(), 1);
    }

    #[tokio::test]
    async fn unhandled_event_type_is_recorded_as_ignored() {
        let t = TestBilling::new().await;

        let outcome = t
            .services
            .dispatcher
            .dispatch(&envelope("WH-9", "CUSTOMER.DISPUTE.CREATED", json!({"id": "PP-D-1"})), 1)
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Ignored(_)));
        let record = t.kit.webhook_events.find_by_event_id("WH-9").await.unwrap().unwrap();
        assert_eq!(record.result, ProcessingResult::Ignored);
        assert!(record.detail.is_some());
    }

    #[tokio::test]
    async fn previously_failed_event_is_processed_again() {
        let t = TestBilling::new().await;
        let order_id = t.create_order().await;
        let event = capture_completed("WH-2", &order_id);
        t.services
            .dispatcher
            .record_failure(&event, &BillingError::Infrastructure("db down".to_string()), 3)
            .await;

        let outcome = t.services.dispatcher.dispatch(&event, 1).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Processed);
        let record = t.kit.webhook_events.find_by_event_id("WH-2").await.unwrap().unwrap();
        assert_eq!(record.result, ProcessingResult::Success);
    }

    #[tokio::test]
    async fn capture_denied_fails_pending_order() {
        let t = TestBilling::new().await;
        let order_id = t.create_order().await;
        let mut event = envelope(
            "WH-3",
            "PAYMENT.CAPTURE.DENIED",
            json!({"id": "CAP-X", "supplementary_data": {"related_ids": {"order_id": order_id}}}),
        );
        event.summary = Some("Payment denied".to_string());

        let outcome = t.services.dispatcher.dispatch(&event, 1).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Processed);
        let order = t.kit.orders.find_by_order_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
        assert_eq!(order.failure_reason.as_deref(), Some("Payment denied"));
    }

    #[tokio::test]
    async fn capture_for_unknown_order_is_ignored() {
        let t = TestBilling::new().await;
        let outcome = t.services.dispatcher.dispatch(&capture_completed("WH-4", "NOPE"), 1).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Ignored("unknown order".to_string()));
    }

    #[tokio::test]
    async fn capture_without_appointment_stays_retryable_until_booked() {
        let t = TestBilling::new().await;
        let order_id = t.create_order().await;
        let event = capture_completed("WH-5", &order_id);
        t.kit.directory.fail_appointment_creation(true);

        let err = t.services.dispatcher.dispatch(&event, 1).await.unwrap_err();

        assert!(err.is_retryable());
        assert!(t.kit.webhook_events.find_by_event_id("WH-5").await.unwrap().is_none());
        assert_eq!(t.kit.alerts.count_of(AlertKind::AppointmentCreationFailed), 1);

        t.kit.directory.fail_appointment_creation(false);
        let outcome = t.services.dispatcher.dispatch(&event, 2).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Processed);
        assert_eq!(t.kit.directory.appointments().await.len(), 1);
        let order = t.kit.orders.find_by_order_id(&order_id).await.unwrap().unwrap();
        assert!(order.has_appointment());
        let record = t.kit.webhook_events.find_by_event_id("WH-5").await.unwrap().unwrap();
        assert_eq!(record.result, ProcessingResult::Success);
    }
}
