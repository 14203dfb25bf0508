//! Local stand-in for the PayPal REST API, served by axum on an ephemeral port.
//!
//! Test-only. Mirrors the handful of endpoints the client calls and records
//! what it received so tests can assert on request shape.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Completed,
    Declined,
    Pending,
}

struct FakeState {
    token_requests: usize,
    token_authorizations: Vec<String>,
    token_lifetime: u64,
    reject_tokens: bool,
    issued: HashSet<String>,
    failures: VecDeque<u16>,
    capture_mode: CaptureMode,
    api_calls: usize,
    orders: Vec<(Option<String>, Value)>,
    subscriptions: Vec<Value>,
    verifications: Vec<Value>,
}

#[derive(Clone)]
pub struct FakeGateway {
    base_url: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeGateway {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(FakeState {
            token_requests: 0,
            token_authorizations: Vec::new(),
            token_lifetime: 32_400,
            reject_tokens: false,
            issued: HashSet::new(),
            failures: VecDeque::new(),
            capture_mode: CaptureMode::Completed,
            api_calls: 0,
            orders: Vec::new(),
            subscriptions: Vec::new(),
            verifications: Vec::new(),
        }));

        let router = Router::new()
            .route("/v1/oauth2/token", post(token))
            .route("/v2/checkout/orders", post(create_order))
            .route("/v2/checkout/orders/:order_id/capture", post(capture_order))
            .route("/v1/billing/subscriptions", post(create_subscription))
            .route("/v1/billing/subscriptions/:subscription_id", get(fetch_subscription))
            .route("/v1/notifications/verify-webhook-signature", post(verify_signature))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    pub fn token_requests(&self) -> usize {
        self.state.lock().unwrap().token_requests
    }

    /// `Authorization` headers of every token request, in order.
    pub fn token_authorizations(&self) -> Vec<String> {
        self.state.lock().unwrap().token_authorizations.clone()
    }

    pub fn api_calls(&self) -> usize {
        self.state.lock().unwrap().api_calls
    }

    pub fn set_token_lifetime(&self, seconds: u64) {
        self.state.lock().unwrap().token_lifetime = seconds;
    }

    pub fn reject_tokens(&self) {
        self.state.lock().unwrap().reject_tokens = true;
    }

    /// Forget every issued token, so the next API call answers 401.
    pub fn revoke_tokens(&self) {
        self.state.lock().unwrap().issued.clear();
    }

    /// The next API calls answer with these statuses, in order.
    pub fn fail_next(&self, statuses: &[u16]) {
        self.state.lock().unwrap().failures.extend(statuses.iter().copied());
    }

    pub fn set_capture_mode(&self, mode: CaptureMode) {
        self.state.lock().unwrap().capture_mode = mode;
    }

    /// `(PayPal-Request-Id, body)` of every order created.
    pub fn orders(&self) -> Vec<(Option<String>, Value)> {
        self.state.lock().unwrap().orders.clone()
    }

    pub fn subscriptions(&self) -> Vec<Value> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    pub fn verifications(&self) -> Vec<Value> {
        self.state.lock().unwrap().verifications.clone()
    }
}

type Shared = State<Arc<Mutex<FakeState>>>;

fn error(status: StatusCode, name: &str, issue: &str) -> Response {
    (
        status,
        Json(json!({
            "name": name,
            "message": format!("{} ({})", name, issue),
            "details": [{"issue": issue}]
        })),
    )
        .into_response()
}

/// Bearer check plus scripted failures, shared by every API route.
fn gate(state: &mut FakeState, headers: &HeaderMap) -> Option<Response> {
    state.api_calls += 1;
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    if !bearer.is_some_and(|t| state.issued.contains(&t)) {
        return Some(error(StatusCode::UNAUTHORIZED, "AUTHENTICATION_FAILURE", "INVALID_TOKEN"));
    }
    let status = state.failures.pop_front()?;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Some(error(status, "SCRIPTED_FAILURE", "SCRIPTED"))
}

async fn token(State(state): Shared, headers: HeaderMap, body: String) -> Response {
    let mut state = state.lock().unwrap();
    state.token_requests += 1;
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let basic = authorization.starts_with("Basic ");
    state.token_authorizations.push(authorization);
    if !basic || state.reject_tokens || body != "grant_type=client_credentials" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_client", "error_description": "Client Authentication failed"})),
        )
            .into_response();
    }
    let token = format!("A21AA-token-{}", state.token_requests);
    state.issued.insert(token.clone());
    Json(json!({
        "scope": "https://uri.paypal.com/services/payments",
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": state.token_lifetime
    }))
    .into_response()
}

async fn create_order(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    if let Some(rejection) = gate(&mut state, &headers) {
        return rejection;
    }
    let request_id = headers
        .get("paypal-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.orders.push((request_id, body));
    let id = format!("5O190127TN36471{}", state.orders.len());
    (
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "status": "CREATED",
            "links": [
                {"href": format!("https://api.test/v2/checkout/orders/{}", id), "rel": "self", "method": "GET"},
                {"href": format!("https://www.sandbox.paypal.com/checkoutnow?token={}", id), "rel": "approve", "method": "GET"}
            ]
        })),
    )
        .into_response()
}

async fn capture_order(State(state): Shared, headers: HeaderMap, Path(order_id): Path<String>) -> Response {
    let mut state = state.lock().unwrap();
    if let Some(rejection) = gate(&mut state, &headers) {
        return rejection;
    }
    match state.capture_mode {
        CaptureMode::Declined => error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "UNPROCESSABLE_ENTITY",
            "INSTRUMENT_DECLINED",
        ),
        mode => {
            let status = if mode == CaptureMode::Completed { "COMPLETED" } else { "PENDING" };
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": order_id,
                    "status": status,
                    "payer": {
                        "email_address": "ana@example.com",
                        "name": {"given_name": "Ana", "surname": "Lima"}
                    },
                    "purchase_units": [{
                        "payments": {"captures": [{"id": format!("CAPTURE-{}", order_id), "status": status}]}
                    }]
                })),
            )
                .into_response()
        }
    }
}

async fn create_subscription(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    if let Some(rejection) = gate(&mut state, &headers) {
        return rejection;
    }
    state.subscriptions.push(body);
    let id = format!("I-BW452GLLEP1{}", state.subscriptions.len());
    (
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "status": "APPROVAL_PENDING",
            "links": [
                {"href": format!("https://www.sandbox.paypal.com/webapps/billing/subscriptions?ba_token=BA-{}", id), "rel": "approve", "method": "GET"}
            ]
        })),
    )
        .into_response()
}

async fn fetch_subscription(
    State(state): Shared,
    headers: HeaderMap,
    Path(subscription_id): Path<String>,
) -> Response {
    let mut state = state.lock().unwrap();
    if let Some(rejection) = gate(&mut state, &headers) {
        return rejection;
    }
    if subscription_id == "I-MISSING" {
        return error(StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND", "INVALID_RESOURCE_ID");
    }
    Json(json!({
        "id": subscription_id,
        "status": "ACTIVE",
        "plan_id": "P-PROFESSIONAL-MONTHLY",
        "billing_info": {
            "next_billing_time": "2026-11-19T10:00:00Z",
            "last_payment": {"time": "2026-10-19T10:00:00Z"}
        },
        "subscriber": {
            "email_address": "owner@clinic.test",
            "payment_source": {"card": {"brand": "MASTERCARD", "last_digits": "5100"}}
        }
    }))
    .into_response()
}

async fn verify_signature(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    if let Some(rejection) = gate(&mut state, &headers) {
        return rejection;
    }
    let status = if body["transmission_sig"] == "valid-sig" { "SUCCESS" } else { "FAILURE" };
    state.verifications.push(body);
    Json(json!({"verification_status": status})).into_response()
}
