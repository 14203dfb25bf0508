//! Axum router configuration for billing endpoints.

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    cancel_subscription, capture_order, change_plan, create_order, create_subscription,
    get_subscription, handle_paypal_webhook, health, list_plans, metrics, BillingAppState,
};

/// Tenant-scoped routes, mounted under `/api/tenants/:tenant_id`.
///
/// - `POST /orders` - Create a consultation payment order
/// - `POST /orders/:order_id/capture` - Capture an approved order
/// - `GET /subscription` - Current subscription view
/// - `POST /subscription` - Open a subscription
/// - `POST /subscription/plan-change` - Change tier now or at period end
/// - `POST /subscription/cancel` - Schedule or apply a cancellation
pub fn tenant_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:order_id/capture", post(capture_order))
        .route("/subscription", get(get_subscription).post(create_subscription))
        .route("/subscription/plan-change", post(change_plan))
        .route("/subscription/cancel", post(cancel_subscription))
}

/// Gateway webhooks. No caller authentication; the signature is verified
/// with the gateway instead.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/paypal", post(handle_paypal_webhook))
}

/// Routes without middleware; tests drive this directly.
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .nest("/api/tenants/:tenant_id", tenant_routes())
        .route("/api/plans", get(list_plans))
        .nest("/webhooks", webhook_routes())
        .route("/metrics", get(metrics))
        .route("/health", get(health))
}

/// The complete application with request tracing, request ids, and a
/// per-request timeout.
pub fn billing_router(state: BillingAppState, request_timeout: Duration) -> Router {
    billing_routes()
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
