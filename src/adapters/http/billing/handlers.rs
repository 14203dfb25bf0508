//! HTTP handlers for billing endpoints.
//!
//! Handlers translate between JSON bodies and the application services;
//! no billing decisions are made here.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;

use super::dto::{
    CancelSubscriptionRequest, CancelSubscriptionResponse, CaptureResponse, CreateOrderRequest,
    CreateOrderResponse, CreateSubscriptionRequest, HealthResponse, PlanChangeRequest,
    PlanChangeResponse, PlanResponse, PlansResponse, WebhookAcceptedResponse,
};
use crate::adapters::http::error::ApiError;
use crate::application::orders::{CaptureOutcome, CreateOrderCommand};
use crate::application::subscriptions::CreateSubscriptionCommand;
use crate::application::webhooks::WebhookIngestor;
use crate::application::{BillingError, BillingServices};
use crate::domain::foundation::{DoctorId, PatientId, ServiceId, TenantId};
use crate::ports::WebhookHeaders;

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for every billing route. Cheap to clone.
#[derive(Clone)]
pub struct BillingAppState {
    pub services: BillingServices,
    pub ingestor: Arc<WebhookIngestor>,
}

impl BillingAppState {
    pub fn new(services: BillingServices, ingestor: Arc<WebhookIngestor>) -> Self {
        Self { services, ingestor }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Orders
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/tenants/:tenant_id/orders
pub async fn create_order(
    State(state): State<BillingAppState>,
    Path(tenant_id): Path<uuid::Uuid>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.booked_slot.trim().is_empty() {
        return Err(BillingError::validation("booked_slot", "Booked slot is required").into());
    }

    let cmd = CreateOrderCommand {
        tenant_id: TenantId::from_uuid(tenant_id),
        patient_id: PatientId::from_uuid(request.patient_id),
        doctor_id: DoctorId::from_uuid(request.doctor_id),
        service_id: request.service_id.map(ServiceId::from_uuid),
        booked_slot: request.booked_slot.clone(),
        fee_source: request.resolved_fee_source(),
    };

    let created = state.services.orders.create_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(CreateOrderResponse::from(created))))
}

/// POST /api/tenants/:tenant_id/orders/:order_id/capture
pub async fn capture_order(
    State(state): State<BillingAppState>,
    Path((tenant_id, order_id)): Path<(uuid::Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = TenantId::from_uuid(tenant_id);
    let outcome = state.services.orders.capture_order(&tenant_id, &order_id).await?;

    match CaptureResponse::from_outcome(&outcome) {
        Some(response) => Ok(Json(response)),
        None => {
            let reason = match outcome {
                CaptureOutcome::Declined { reason, .. } => reason,
                _ => String::new(),
            };
            Err(ApiError::PaymentDeclined { order_id, reason })
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/tenants/:tenant_id/subscription
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    Path(tenant_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = TenantId::from_uuid(tenant_id);
    let view = state
        .services
        .subscriptions
        .subscription_for_tenant(&tenant_id)
        .await?
        .ok_or_else(|| BillingError::not_found("subscription", tenant_id))?;
    Ok(Json(view))
}

/// POST /api/tenants/:tenant_id/subscription
pub async fn create_subscription(
    State(state): State<BillingAppState>,
    Path(tenant_id): Path<uuid::Uuid>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = CreateSubscriptionCommand {
        tenant_id: TenantId::from_uuid(tenant_id),
        tier: request.tier,
        cycle: request.cycle,
    };
    let created = state.services.subscriptions.create_subscription(cmd).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/tenants/:tenant_id/subscription/plan-change
pub async fn change_plan(
    State(state): State<BillingAppState>,
    Path(tenant_id): Path<uuid::Uuid>,
    Json(request): Json<PlanChangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .services
        .subscriptions
        .request_plan_change(&TenantId::from_uuid(tenant_id), request.tier, request.immediate)
        .await?;
    Ok(Json(PlanChangeResponse::from(outcome)))
}

/// POST /api/tenants/:tenant_id/subscription/cancel
///
/// The body is optional; without one the cancellation lands at period end.
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    Path(tenant_id): Path<uuid::Uuid>,
    request: Option<Json<CancelSubscriptionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let outcome = state
        .services
        .subscriptions
        .request_cancellation(&TenantId::from_uuid(tenant_id), request.effective_date)
        .await?;
    Ok(Json(CancelSubscriptionResponse::from(outcome)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Catalog
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/plans
pub async fn list_plans(State(state): State<BillingAppState>) -> impl IntoResponse {
    let plans = state
        .services
        .catalog
        .available_tiers()
        .into_iter()
        .map(PlanResponse::from)
        .collect();
    Json(PlansResponse { plans })
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhooks
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/paypal
///
/// Answers 200 once the event is verified and queued, whatever processing
/// later decides. Only verification and queueing problems produce non-2xx.
pub async fn handle_paypal_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let headers = WebhookHeaders::from_pairs(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    );

    let event_id = state.ingestor.ingest(&body, &headers).await?;
    Ok(Json(WebhookAcceptedResponse {
        event_id,
        status: "accepted".to_string(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Operations
// ════════════════════════════════════════════════════════════════════════════════

/// GET /metrics - Prometheus text exposition.
pub async fn metrics(State(state): State<BillingAppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .services
        .metrics
        .encode()
        .map_err(|e| BillingError::Infrastructure(format!("metrics encoding failed: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
