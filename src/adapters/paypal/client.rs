//! PayPal REST adapter.
//!
//! Implements `PaymentGateway` against the Orders v2, Subscriptions v1, and
//! Notifications v1 APIs.
//!
//! # Behaviour
//!
//! - Bearer tokens come from [`TokenCache`]; a 401 drops the cached token and
//!   the call is re-sent once with a fresh one
//! - Transient failures are retried through [`with_retry`]
//! - Create calls carry a `PayPal-Request-Id` derived from the caller's
//!   idempotency key, so a retried request never creates twice
//! - A declined capture is `Ok(CaptureResult { success: false, .. })`
//!
//! ```ignore
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! let gateway = PayPalClient::new(&config.gateway, Some(credential_store), shutdown)?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use tokio::sync::watch;

use super::credentials::CredentialResolver;
use super::retry::{with_retry, RetryPolicy};
use super::token::TokenCache;
use super::wire::{
    approval_link, Amount, ApplicationContext, CaptureResponse, ErrorBody, OrderBody,
    OrderResponse, PurchaseUnit, SubscriptionBody, SubscriptionResponse, VerifySignatureBody,
    VerifySignatureResponse,
};
use crate::config::GatewayConfig;
use crate::domain::foundation::{TenantId, Timestamp};
use crate::ports::{
    CaptureResult, CreateOrderRequest, CreateSubscriptionRequest, CreatedOrder,
    CreatedSubscription, GatewayCredentials, GatewayError, GatewaySubscription, PaymentGateway,
    TenantCredentialStore, WebhookHeaders,
};

/// How far ahead `refresh_credentials` renews tokens. Matches the default
/// token-refresh job cadence.
const DEFAULT_REFRESH_HORIZON: Duration = Duration::from_secs(30 * 60);

pub struct PayPalClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenCache,
    credentials: CredentialResolver,
    retry: RetryPolicy,
    refresh_horizon: Duration,
    shutdown: watch::Receiver<bool>,
}

impl PayPalClient {
    pub fn new(
        config: &GatewayConfig,
        tenant_credentials: Option<Arc<dyn TenantCredentialStore>>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GatewayError::configuration(format!("http client: {}", e)))?;
        let base_url = config.base_url();

        Ok(Self {
            tokens: TokenCache::new(http.clone(), base_url.clone(), config.token_refresh_margin()),
            credentials: CredentialResolver::from_config(config, tenant_credentials),
            retry: RetryPolicy::from_config(config),
            refresh_horizon: DEFAULT_REFRESH_HORIZON,
            http,
            base_url,
            shutdown,
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_refresh_horizon(mut self, horizon: Duration) -> Self {
        self.refresh_horizon = horizon;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends with a bearer token, re-authenticating once on 401.
    async fn send<F>(&self, credentials: &GatewayCredentials, build: F) -> Result<reqwest::Response, GatewayError>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let mut reauthenticated = false;
        loop {
            let token = self.tokens.access_token(credentials).await?;
            let response = build(token.expose_secret())
                .send()
                .await
                .map_err(transport_error)?;

            if response.status() == StatusCode::UNAUTHORIZED && !reauthenticated {
                tracing::info!(client_id = %credentials.client_id, "Gateway rejected access token, re-authenticating");
                self.tokens.invalidate(&credentials.client_id).await;
                reauthenticated = true;
                continue;
            }
            return Ok(response);
        }
    }

    async fn create_order_once(
        &self,
        credentials: &GatewayCredentials,
        request: &CreateOrderRequest,
        request_id: &str,
    ) -> Result<CreatedOrder, GatewayError> {
        let body = OrderBody {
            intent: "CAPTURE",
            purchase_units: vec![PurchaseUnit {
                reference_id: &request.reference_id,
                custom_id: &request.custom_id,
                description: &request.description,
                amount: Amount {
                    currency_code: request.amount.currency().to_string(),
                    value: request.amount.to_decimal_string(),
                },
            }],
            application_context: (request.return_url.is_some() || request.cancel_url.is_some()).then(|| {
                ApplicationContext {
                    brand_name: None,
                    return_url: request.return_url.as_deref(),
                    cancel_url: request.cancel_url.as_deref(),
                    user_action: Some("PAY_NOW"),
                }
            }),
        };
        let url = self.url("/v2/checkout/orders");

        let response = self
            .send(credentials, |token| {
                self.http
                    .post(&url)
                    .bearer_auth(token)
                    .header("PayPal-Request-Id", request_id)
                    .json(&body)
            })
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let order: OrderResponse = parse_json(response, "create order").await?;
        Ok(CreatedOrder {
            approval_url: approval_link(&order.links),
            order_id: order.id,
            status: order.status,
        })
    }

    async fn capture_once(
        &self,
        credentials: &GatewayCredentials,
        order_id: &str,
        request_id: &str,
    ) -> Result<CaptureResult, GatewayError> {
        let url = self.url(&format!("/v2/checkout/orders/{}/capture", order_id));
        let response = self
            .send(credentials, |token| {
                self.http
                    .post(&url)
                    .bearer_auth(token)
                    .header("PayPal-Request-Id", request_id)
                    .json(&serde_json::json!({}))
            })
            .await?;

        let status = response.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let raw: serde_json::Value = parse_json(response, "capture decline").await?;
            let reason = serde_json::from_value::<ErrorBody>(raw.clone())
                .ok()
                .and_then(|b| b.first_issue().map(str::to_string).or(b.name))
                .unwrap_or_else(|| "UNPROCESSABLE_ENTITY".to_string());
            tracing::warn!(order_id, reason = %reason, "Gateway declined capture");
            return Ok(CaptureResult {
                success: false,
                status: reason,
                capture_id: None,
                payer_email: None,
                payer_name: None,
                raw_response: raw,
            });
        }
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        let raw: serde_json::Value = parse_json(response, "capture").await?;
        let capture: CaptureResponse = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::invalid_response(format!("capture: {}", e)))?;
        let (payer_email, payer_name) = match &capture.payer {
            Some(payer) => (
                payer.email_address.clone(),
                payer.name.as_ref().and_then(|n| n.full_name()),
            ),
            None => (None, None),
        };

        Ok(CaptureResult {
            success: capture.status == "COMPLETED",
            capture_id: capture.capture_id(),
            status: capture.status,
            payer_email,
            payer_name,
            raw_response: raw,
        })
    }

    async fn create_subscription_once(
        &self,
        credentials: &GatewayCredentials,
        request: &CreateSubscriptionRequest,
        request_id: &str,
    ) -> Result<CreatedSubscription, GatewayError> {
        let body = SubscriptionBody {
            plan_id: &request.plan_id,
            custom_id: &request.custom_id,
            application_context: ApplicationContext {
                brand_name: request.brand_name.as_deref(),
                return_url: Some(&request.return_url),
                cancel_url: Some(&request.cancel_url),
                user_action: Some("SUBSCRIBE_NOW"),
            },
        };
        let url = self.url("/v1/billing/subscriptions");

        let response = self
            .send(credentials, |token| {
                self.http
                    .post(&url)
                    .bearer_auth(token)
                    .header("PayPal-Request-Id", request_id)
                    .json(&body)
            })
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let subscription: SubscriptionResponse = parse_json(response, "create subscription").await?;
        Ok(CreatedSubscription {
            approval_url: approval_link(&subscription.links),
            subscription_id: subscription.id,
            status: subscription.status,
        })
    }

    async fn fetch_subscription_once(
        &self,
        credentials: &GatewayCredentials,
        subscription_id: &str,
    ) -> Result<GatewaySubscription, GatewayError> {
        let url = self.url(&format!("/v1/billing/subscriptions/{}", subscription_id));
        let response = self
            .send(credentials, |token| self.http.get(&url).bearer_auth(token))
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let subscription: SubscriptionResponse = parse_json(response, "fetch subscription").await?;
        let (next_billing_time, last_payment_time) = match subscription.billing_info {
            Some(info) => (
                info.next_billing_time.map(Timestamp::from_datetime),
                info.last_payment
                    .and_then(|p| p.time)
                    .map(Timestamp::from_datetime),
            ),
            None => (None, None),
        };
        let payment_method = subscription.subscriber.as_ref().and_then(|s| s.payment_method());
        Ok(GatewaySubscription {
            subscription_id: subscription.id,
            status: subscription.status,
            plan_id: subscription.plan_id,
            next_billing_time,
            last_payment_time,
            subscriber_email: subscription.subscriber.and_then(|s| s.email_address),
            payment_method,
        })
    }

    async fn verify_once(
        &self,
        credentials: &GatewayCredentials,
        body: &VerifySignatureBody<'_>,
    ) -> Result<bool, GatewayError> {
        let url = self.url("/v1/notifications/verify-webhook-signature");
        let response = self
            .send(credentials, |token| self.http.post(&url).bearer_auth(token).json(body))
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let verdict: VerifySignatureResponse = parse_json(response, "verify webhook signature").await?;
        Ok(verdict.verification_status == "SUCCESS")
    }
}

#[async_trait]
impl PaymentGateway for PayPalClient {
    async fn create_order(
        &self,
        tenant_id: &TenantId,
        request: CreateOrderRequest,
    ) -> Result<CreatedOrder, GatewayError> {
        let credentials = self.credentials.for_tenant(tenant_id).await?;
        let request_id = request_id(&request.idempotency_key);
        let (credentials, request, request_id) = (&credentials, &request, request_id.as_str());

        let created = with_retry(&self.retry, &self.shutdown, "create_order", move || {
            self.create_order_once(credentials, request, request_id)
        })
        .await?;

        tracing::info!(
            tenant_id = %tenant_id,
            gateway_order_id = %created.order_id,
            reference_id = %request.reference_id,
            "Gateway order created"
        );
        Ok(created)
    }

    async fn capture_order(
        &self,
        tenant_id: &TenantId,
        order_id: &str,
    ) -> Result<CaptureResult, GatewayError> {
        let credentials = self.credentials.for_tenant(tenant_id).await?;
        let request_id = request_id(&format!("capture:{}", order_id));
        let (credentials, request_id) = (&credentials, request_id.as_str());

        with_retry(&self.retry, &self.shutdown, "capture_order", move || {
            self.capture_once(credentials, order_id, request_id)
        })
        .await
    }

    async fn create_subscription(
        &self,
        tenant_id: &TenantId,
        request: CreateSubscriptionRequest,
    ) -> Result<CreatedSubscription, GatewayError> {
        let credentials = self.credentials.for_tenant(tenant_id).await?;
        let request_id = request_id(&request.idempotency_key);
        let (credentials, request, request_id) = (&credentials, &request, request_id.as_str());

        let created = with_retry(&self.retry, &self.shutdown, "create_subscription", move || {
            self.create_subscription_once(credentials, request, request_id)
        })
        .await?;

        tracing::info!(
            tenant_id = %tenant_id,
            subscription_id = %created.subscription_id,
            plan_id = %request.plan_id,
            "Gateway subscription created"
        );
        Ok(created)
    }

    async fn fetch_subscription(
        &self,
        tenant_id: &TenantId,
        subscription_id: &str,
    ) -> Result<GatewaySubscription, GatewayError> {
        let credentials = self.credentials.for_tenant(tenant_id).await?;
        let credentials = &credentials;

        with_retry(&self.retry, &self.shutdown, "fetch_subscription", move || {
            self.fetch_subscription_once(credentials, subscription_id)
        })
        .await
    }

    async fn verify_webhook_signature(
        &self,
        payload: &[u8],
        headers: &WebhookHeaders,
        webhook_id: &str,
    ) -> Result<bool, GatewayError> {
        let (
            Some(transmission_id),
            Some(transmission_time),
            Some(transmission_sig),
            Some(cert_url),
            Some(auth_algo),
        ) = (
            headers.transmission_id.as_deref(),
            headers.transmission_time.as_deref(),
            headers.transmission_sig.as_deref(),
            headers.cert_url.as_deref(),
            headers.auth_algo.as_deref(),
        )
        else {
            return Ok(false);
        };
        if webhook_id.trim().is_empty() {
            return Ok(false);
        }
        let Ok(event) = serde_json::from_slice::<serde_json::Value>(payload) else {
            tracing::warn!(transmission_id, "Webhook payload is not JSON; cannot verify");
            return Ok(false);
        };

        let credentials = self.credentials.platform()?;
        let body = VerifySignatureBody {
            auth_algo,
            cert_url,
            transmission_id,
            transmission_sig,
            transmission_time,
            webhook_id,
            webhook_event: &event,
        };
        let (credentials, body) = (&credentials, &body);

        let verified = with_retry(&self.retry, &self.shutdown, "verify_webhook_signature", move || {
            self.verify_once(credentials, body)
        })
        .await?;

        if !verified {
            tracing::warn!(transmission_id, "Gateway reported webhook signature as invalid");
        }
        Ok(verified)
    }

    async fn refresh_credentials(&self) -> Result<(), GatewayError> {
        if let Ok(platform) = self.credentials.platform() {
            self.tokens.access_token(&platform).await?;
        }
        let refreshed = self.tokens.refresh_expiring(self.refresh_horizon).await?;
        tracing::debug!(refreshed, "Gateway tokens checked");
        Ok(())
    }
}

/// Deterministic `PayPal-Request-Id` for an idempotency key.
fn request_id(key: &str) -> String {
    Sha256::digest(key.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

pub(super) fn transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::timeout(error.to_string())
    } else {
        GatewayError::network(error.to_string())
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, GatewayError> {
    let text = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&text).map_err(|e| {
        tracing::warn!(context, error = %e, "Unparseable gateway response");
        GatewayError::invalid_response(format!("{}: {}", context, e))
    })
}

async fn error_from_response(response: reqwest::Response) -> GatewayError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ErrorBody>(&text).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone())
        .unwrap_or_else(|| text.clone());

    tracing::warn!(status = %status, body = %text, "Gateway returned error");
    let error = GatewayError::from_status(status.as_u16(), message);
    match parsed.and_then(|b| b.name) {
        Some(name) => error.with_provider_code(name),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::paypal::fake::{CaptureMode, FakeGateway};
    use crate::domain::foundation::{Currency, Money};
    use crate::ports::GatewayErrorCode;
    use secrecy::SecretString;

    // ════════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════════

    fn config(base_url: String) -> GatewayConfig {
        GatewayConfig {
            client_id: Some("platform-client".to_string()),
            client_secret: Some(SecretString::new("platform-secret".to_string())),
            base_url: Some(base_url),
            ..Default::default()
        }
    }

    async fn client() -> (FakeGateway, PayPalClient, watch::Sender<bool>) {
        let fake = FakeGateway::start().await;
        let (stop, shutdown) = watch::channel(false);
        let client = PayPalClient::new(&config(fake.base_url()), None, shutdown)
            .unwrap()
            .with_retry_policy(RetryPolicy::immediate(3));
        (fake, client, stop)
    }

    fn order_request(key: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            amount: Money::new(15050, Currency::usd()),
            reference_id: "ord-7".to_string(),
            description: "Consultation with Dr. Reyes".to_string(),
            custom_id: "tenant:patient:slot".to_string(),
            idempotency_key: key.to_string(),
            return_url: Some("https://clinic.test/paid".to_string()),
            cancel_url: None,
        }
    }

    fn signed_headers(signature: &str) -> WebhookHeaders {
        WebhookHeaders::from_pairs([
            (WebhookHeaders::TRANSMISSION_ID, "69cd13f0-d67a-11e5-baa3-778b53f4ae55"),
            (WebhookHeaders::TRANSMISSION_TIME, "2026-10-19T10:00:00Z"),
            (WebhookHeaders::TRANSMISSION_SIG, signature),
            (WebhookHeaders::CERT_URL, "https://api.sandbox.paypal.com/v1/notifications/certs/CERT-1"),
            (WebhookHeaders::AUTH_ALGO, "SHA256withRSA"),
        ])
    }

    // ════════════════════════════════════════════════════════════════════════════════
    // Orders
    // ════════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn create_order_sends_capture_intent_and_decimal_amount() {
        let (fake, client, _stop) = client().await;

        let created = client
            .create_order(&TenantId::new(), order_request("order:key-1"))
            .await
            .unwrap();

        assert_eq!(created.status, "CREATED");
        assert!(created.approval_url.unwrap().contains("checkoutnow?token="));
        let (request_id, body) = fake.orders().pop().unwrap();
        assert_eq!(body["intent"], "CAPTURE");
        assert_eq!(body["purchase_units"][0]["amount"]["value"], "150.50");
        assert_eq!(body["purchase_units"][0]["amount"]["currency_code"], "USD");
        assert_eq!(body["purchase_units"][0]["custom_id"], "tenant:patient:slot");
        assert_eq!(body["application_context"]["return_url"], "https://clinic.test/paid");
        assert_eq!(request_id.unwrap().len(), 64);
    }

    #[tokio::test]
    async fn request_id_is_deterministic_per_idempotency_key() {
        let (fake, client, _stop) = client().await;
        let tenant = TenantId::new();

        client.create_order(&tenant, order_request("same")).await.unwrap();
        client.create_order(&tenant, order_request("same")).await.unwrap();
        client.create_order(&tenant, order_request("other")).await.unwrap();

        let ids: Vec<_> = fake.orders().into_iter().map(|(id, _)| id.unwrap()).collect();
        assert_eq!(ids[0], ids[1]);
        assert_ne!(ids[0], ids[2]);
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let (fake, client, _stop) = client().await;
        fake.fail_next(&[503, 429]);

        let created = client.create_order(&TenantId::new(), order_request("k")).await;

        assert!(created.is_ok());
        assert_eq!(fake.api_calls(), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (fake, client, _stop) = client().await;
        fake.fail_next(&[400]);

        let err = client
            .create_order(&TenantId::new(), order_request("k"))
            .await
            .unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::InvalidRequest);
        assert_eq!(err.provider_code.as_deref(), Some("SCRIPTED_FAILURE"));
        assert_eq!(fake.api_calls(), 1);
    }

    #[tokio::test]
    async fn revoked_token_triggers_one_reauthentication() {
        let (fake, client, _stop) = client().await;
        client.create_order(&TenantId::new(), order_request("a")).await.unwrap();
        fake.revoke_tokens();

        client.create_order(&TenantId::new(), order_request("b")).await.unwrap();

        assert_eq!(fake.token_requests(), 2);
    }

    #[tokio::test]
    async fn missing_credentials_fail_without_calling_gateway() {
        let fake = FakeGateway::start().await;
        let (_stop, shutdown) = watch::channel(false);
        let config = GatewayConfig {
            base_url: Some(fake.base_url()),
            ..Default::default()
        };
        let client = PayPalClient::new(&config, None, shutdown).unwrap();

        let err = client
            .create_order(&TenantId::new(), order_request("k"))
            .await
            .unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::Configuration);
        assert_eq!(fake.token_requests(), 0);
    }

    // ════════════════════════════════════════════════════════════════════════════════
    // Captures
    // ════════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn completed_capture_reports_payer() {
        let (_fake, client, _stop) = client().await;

        let result = client.capture_order(&TenantId::new(), "ORDER-1").await.unwrap();

        assert!(result.success);
        assert_eq!(result.status, "COMPLETED");
        assert_eq!(result.capture_id.as_deref(), Some("CAPTURE-ORDER-1"));
        assert_eq!(result.payer_email.as_deref(), Some("ana@example.com"));
        assert_eq!(result.payer_name.as_deref(), Some("Ana Lima"));
    }

    #[tokio::test]
    async fn declined_capture_is_data_not_error() {
        let (fake, client, _stop) = client().await;
        fake.set_capture_mode(CaptureMode::Declined);

        let result = client.capture_order(&TenantId::new(), "ORDER-2").await.unwrap();

        assert!(!result.success);
        assert_eq!(result.status, "INSTRUMENT_DECLINED");
        assert_eq!(result.raw_response["name"], "UNPROCESSABLE_ENTITY");
        assert_eq!(fake.api_calls(), 1);
    }

    #[tokio::test]
    async fn pending_capture_is_not_success() {
        let (fake, client, _stop) = client().await;
        fake.set_capture_mode(CaptureMode::Pending);

        let result = client.capture_order(&TenantId::new(), "ORDER-3").await.unwrap();

        assert!(!result.success);
        assert_eq!(result.status, "PENDING");
    }

    // ════════════════════════════════════════════════════════════════════════════════
    // Subscriptions
    // ════════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn create_subscription_posts_plan_and_tenant() {
        let (fake, client, _stop) = client().await;
        let tenant = TenantId::new();

        let created = client
            .create_subscription(
                &tenant,
                CreateSubscriptionRequest {
                    plan_id: "P-PROFESSIONAL-MONTHLY".to_string(),
                    custom_id: tenant.to_string(),
                    return_url: "https://clinic.test/billing/return".to_string(),
                    cancel_url: "https://clinic.test/billing/cancel".to_string(),
                    brand_name: Some("Clinic Cloud".to_string()),
                    idempotency_key: "subscription:key".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(created.status, "APPROVAL_PENDING");
        assert!(created.approval_url.unwrap().contains("ba_token="));
        let body = fake.subscriptions().pop().unwrap();
        assert_eq!(body["plan_id"], "P-PROFESSIONAL-MONTHLY");
        assert_eq!(body["custom_id"], tenant.to_string());
        assert_eq!(body["application_context"]["brand_name"], "Clinic Cloud");
    }

    #[tokio::test]
    async fn fetch_subscription_maps_billing_info() {
        let (_fake, client, _stop) = client().await;

        let subscription = client
            .fetch_subscription(&TenantId::new(), "I-ACTIVE")
            .await
            .unwrap();

        assert_eq!(subscription.status, "ACTIVE");
        assert_eq!(subscription.plan_id.as_deref(), Some("P-PROFESSIONAL-MONTHLY"));
        assert!(subscription.next_billing_time.is_some());
        assert!(subscription.last_payment_time.is_some());
        assert_eq!(subscription.subscriber_email.as_deref(), Some("owner@clinic.test"));
        let method = subscription.payment_method.unwrap();
        assert_eq!(method.method_type, "mastercard");
        assert_eq!(method.mask.as_deref(), Some("5100"));
    }

    #[tokio::test]
    async fn unknown_subscription_is_not_found() {
        let (_fake, client, _stop) = client().await;

        let err = client
            .fetch_subscription(&TenantId::new(), "I-MISSING")
            .await
            .unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::NotFound);
    }

    // ════════════════════════════════════════════════════════════════════════════════
    // Webhook verification
    // ════════════════════════════════════════════════════════════════════════════════

    const EVENT: &[u8] = br#"{"id":"WH-1","event_type":"PAYMENT.CAPTURE.COMPLETED","resource":{}}"#;

    #[tokio::test]
    async fn verification_asks_the_gateway() {
        let (fake, client, _stop) = client().await;

        assert!(client
            .verify_webhook_signature(EVENT, &signed_headers("valid-sig"), "WH-ID")
            .await
            .unwrap());
        assert!(!client
            .verify_webhook_signature(EVENT, &signed_headers("forged"), "WH-ID")
            .await
            .unwrap());

        let sent = fake.verifications();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0]["webhook_id"], "WH-ID");
        assert_eq!(sent[0]["webhook_event"]["id"], "WH-1");
    }

    #[tokio::test]
    async fn missing_headers_never_verify() {
        let (fake, client, _stop) = client().await;
        let mut headers = signed_headers("valid-sig");
        headers.auth_algo = None;

        assert!(!client.verify_webhook_signature(EVENT, &headers, "WH-ID").await.unwrap());
        assert!(!client
            .verify_webhook_signature(EVENT, &signed_headers("valid-sig"), "")
            .await
            .unwrap());
        assert!(fake.verifications().is_empty());
    }

    #[tokio::test]
    async fn verification_outage_is_an_error() {
        let (fake, client, _stop) = client().await;
        fake.fail_next(&[503, 503, 503]);

        let err = client
            .verify_webhook_signature(EVENT, &signed_headers("valid-sig"), "WH-ID")
            .await
            .unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::ProviderUnavailable);
    }

    // ════════════════════════════════════════════════════════════════════════════════
    // Credential refresh
    // ════════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn refresh_warms_platform_token_once() {
        let (fake, client, _stop) = client().await;

        client.refresh_credentials().await.unwrap();
        client.refresh_credentials().await.unwrap();

        assert_eq!(fake.token_requests(), 1);
    }

    #[test]
    fn request_id_is_hex_sha256() {
        assert_eq!(
            request_id("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
