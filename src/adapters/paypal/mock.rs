//! Mock payment gateway for testing.
//!
//! Scripted responses, call tracking, and error injection so services can be
//! exercised without a gateway sandbox.
//!
//! ```ignore
//! let gateway = MockPaymentGateway::new()
//!     .with_capture(Ok(MockPaymentGateway::declined_capture("INSTRUMENT_DECLINED")));
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::foundation::TenantId;
use crate::ports::{
    CaptureResult, CreateOrderRequest, CreateSubscriptionRequest, CreatedOrder,
    CreatedSubscription, GatewayError, GatewaySubscription, PaymentGateway, WebhookHeaders,
};

#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    captures: Arc<Mutex<VecDeque<Result<CaptureResult, GatewayError>>>>,
    create_order_error: Arc<Mutex<Option<GatewayError>>>,
    create_subscription_error: Arc<Mutex<Option<GatewayError>>>,
    subscriptions: Arc<Mutex<HashMap<String, GatewaySubscription>>>,
    verification: Arc<Mutex<Option<Result<bool, GatewayError>>>>,
    capture_delay: Duration,
    orders_created: Arc<Mutex<Vec<CreateOrderRequest>>>,
    subscriptions_created: Arc<Mutex<Vec<CreateSubscriptionRequest>>>,
    capture_calls: Arc<AtomicUsize>,
    refresh_calls: Arc<AtomicUsize>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a capture response. With an empty queue captures succeed.
    pub fn with_capture(self, result: Result<CaptureResult, GatewayError>) -> Self {
        self.captures.lock().unwrap().push_back(result);
        self
    }

    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    pub fn failing_create_order(self, error: GatewayError) -> Self {
        *self.create_order_error.lock().unwrap() = Some(error);
        self
    }

    pub fn failing_create_subscription(self, error: GatewayError) -> Self {
        *self.create_subscription_error.lock().unwrap() = Some(error);
        self
    }

    pub fn with_subscription(self, subscription: GatewaySubscription) -> Self {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.subscription_id.clone(), subscription);
        self
    }

    pub fn with_verification(self, result: Result<bool, GatewayError>) -> Self {
        *self.verification.lock().unwrap() = Some(result);
        self
    }

    pub fn completed_capture(capture_id: &str) -> CaptureResult {
        CaptureResult {
            success: true,
            status: "COMPLETED".to_string(),
            capture_id: Some(capture_id.to_string()),
            payer_email: Some("payer@example.com".to_string()),
            payer_name: Some("Pat Payer".to_string()),
            raw_response: serde_json::json!({"status": "COMPLETED", "capture_id": capture_id}),
        }
    }

    pub fn declined_capture(reason: &str) -> CaptureResult {
        CaptureResult {
            success: false,
            status: reason.to_string(),
            capture_id: None,
            payer_email: None,
            payer_name: None,
            raw_response: serde_json::json!({"name": "UNPROCESSABLE_ENTITY", "issue": reason}),
        }
    }

    pub fn capture_calls(&self) -> usize {
        self.capture_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn orders_created(&self) -> Vec<CreateOrderRequest> {
        self.orders_created.lock().unwrap().clone()
    }

    pub fn subscriptions_created(&self) -> Vec<CreateSubscriptionRequest> {
        self.subscriptions_created.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(
        &self,
        _tenant_id: &TenantId,
        request: CreateOrderRequest,
    ) -> Result<CreatedOrder, GatewayError> {
        if let Some(err) = self.create_order_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut created = self.orders_created.lock().unwrap();
        created.push(request);
        let order_id = format!("MOCK-ORDER-{}", created.len());
        Ok(CreatedOrder {
            approval_url: Some(format!("https://gateway.test/checkoutnow?token={}", order_id)),
            order_id,
            status: "CREATED".to_string(),
        })
    }

    async fn capture_order(
        &self,
        _tenant_id: &TenantId,
        order_id: &str,
    ) -> Result<CaptureResult, GatewayError> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        if !self.capture_delay.is_zero() {
            tokio::time::sleep(self.capture_delay).await;
        }
        let scripted = self.captures.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(Self::completed_capture(&format!("CAP-{}", order_id))))
    }

    async fn create_subscription(
        &self,
        _tenant_id: &TenantId,
        request: CreateSubscriptionRequest,
    ) -> Result<CreatedSubscription, GatewayError> {
        if let Some(err) = self.create_subscription_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut created = self.subscriptions_created.lock().unwrap();
        created.push(request);
        let subscription_id = format!("I-MOCK{}", created.len());
        Ok(CreatedSubscription {
            approval_url: Some(format!(
                "https://gateway.test/webapps/billing/subscriptions?ba_token={}",
                subscription_id
            )),
            subscription_id,
            status: "APPROVAL_PENDING".to_string(),
        })
    }

    async fn fetch_subscription(
        &self,
        _tenant_id: &TenantId,
        subscription_id: &str,
    ) -> Result<GatewaySubscription, GatewayError> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| GatewayError::from_status(404, format!("subscription {} not found", subscription_id)))
    }

    async fn verify_webhook_signature(
        &self,
        _payload: &[u8],
        headers: &WebhookHeaders,
        webhook_id: &str,
    ) -> Result<bool, GatewayError> {
        if let Some(result) = self.verification.lock().unwrap().clone() {
            return result;
        }
        Ok(headers.missing().is_empty() && !webhook_id.is_empty())
    }

    async fn refresh_credentials(&self) -> Result<(), GatewayError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
