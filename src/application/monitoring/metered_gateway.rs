//! Gateway decorator that counts every call.

use async_trait::async_trait;
use std::sync::Arc;

use super::metrics::BillingMetrics;
use crate::domain::foundation::TenantId;
use crate::ports::{
    CaptureResult, CreateOrderRequest, CreateSubscriptionRequest, CreatedOrder,
    CreatedSubscription, GatewayError, GatewaySubscription, PaymentGateway, WebhookHeaders,
};

/// Wraps a gateway and records `attempted`/`succeeded`/`failed` per
/// operation. An answered capture counts as a successful call even when the
/// payment was declined.
pub struct MeteredGateway {
    inner: Arc<dyn PaymentGateway>,
    metrics: Arc<BillingMetrics>,
}

impl MeteredGateway {
    pub fn new(inner: Arc<dyn PaymentGateway>, metrics: Arc<BillingMetrics>) -> Self {
        Self { inner, metrics }
    }

    fn observe<T>(&self, operation: &str, result: Result<T, GatewayError>) -> Result<T, GatewayError> {
        match &result {
            Ok(_) => self.metrics.gateway_succeeded(operation),
            Err(e) => {
                tracing::warn!(operation, error = %e, "Gateway call failed");
                self.metrics.gateway_failed(operation);
            }
        }
        result
    }
}

#[async_trait]
impl PaymentGateway for MeteredGateway {
    async fn create_order(
        &self,
        tenant_id: &TenantId,
        request: CreateOrderRequest,
    ) -> Result<CreatedOrder, GatewayError> {
        self.metrics.gateway_attempted("create_order");
        let result = self.inner.create_order(tenant_id, request).await;
        self.observe("create_order", result)
    }

    async fn capture_order(
        &self,
        tenant_id: &TenantId,
        order_id: &str,
    ) -> Result<CaptureResult, GatewayError> {
        self.metrics.gateway_attempted("capture_order");
        let result = self.inner.capture_order(tenant_id, order_id).await;
        self.observe("capture_order", result)
    }

    async fn create_subscription(
        &self,
        tenant_id: &TenantId,
        request: CreateSubscriptionRequest,
    ) -> Result<CreatedSubscription, GatewayError> {
        self.metrics.gateway_attempted("create_subscription");
        let result = self.inner.create_subscription(tenant_id, request).await;
        self.observe("create_subscription", result)
    }

    async fn fetch_subscription(
        &self,
        tenant_id: &TenantId,
        subscription_id: &str,
    ) -> Result<GatewaySubscription, GatewayError> {
        self.metrics.gateway_attempted("fetch_subscription");
        let result = self.inner.fetch_subscription(tenant_id, subscription_id).await;
        self.observe("fetch_subscription", result)
    }

    async fn verify_webhook_signature(
        &self,
        payload: &[u8],
        headers: &WebhookHeaders,
        webhook_id: &str,
    ) -> Result<bool, GatewayError> {
        self.metrics.gateway_attempted("verify_webhook_signature");
        let result = self.inner.verify_webhook_signature(payload, headers, webhook_id).await;
        self.observe("verify_webhook_signature", result)
    }

    async fn refresh_credentials(&self) -> Result<(), GatewayError> {
        self.metrics.gateway_attempted("refresh_credentials");
        let result = self.inner.refresh_credentials().await;
        self.observe("refresh_credentials", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::paypal::MockPaymentGateway;
    use crate::ports::GatewayErrorCode;

    fn metered(inner: MockPaymentGateway) -> (MeteredGateway, Arc<BillingMetrics>) {
        let metrics = Arc::new(BillingMetrics::new().unwrap());
        (MeteredGateway::new(Arc::new(inner), metrics.clone()), metrics)
    }

    #[tokio::test]
    async fn declined_capture_counts_as_answered_call() {
        let (gateway, metrics) = metered(
            MockPaymentGateway::new().with_capture(Ok(MockPaymentGateway::declined_capture("INSTRUMENT_DECLINED"))),
        );

        let result = gateway.capture_order(&TenantId::new(), "ORDER-1").await.unwrap();

        assert!(!result.success);
        assert_eq!(metrics.gateway_count("capture_order", "attempted"), 1);
        assert_eq!(metrics.gateway_count("capture_order", "succeeded"), 1);
        assert_eq!(metrics.gateway_count("capture_order", "failed"), 0);
    }

    #[tokio::test]
    async fn gateway_error_counts_as_failure() {
        let (gateway, metrics) = metered(
            MockPaymentGateway::new()
                .with_capture(Err(GatewayError::new(GatewayErrorCode::ProviderUnavailable, "503"))),
        );

        assert!(gateway.capture_order(&TenantId::new(), "ORDER-1").await.is_err());
        assert_eq!(metrics.gateway_count("capture_order", "failed"), 1);
        assert_eq!(metrics.snapshot().gateway_api.failed, 1);
    }
}
