//! Request and response bodies for the billing endpoints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::application::orders::{CaptureOutcome, CreatedPaymentOrder, FeeSource};
use crate::application::subscriptions::PlanChangeOutcome;
use crate::domain::foundation::{AppointmentId, Timestamp};
use crate::domain::payment::{OrderStatus, PaymentOrder};
use crate::domain::plan::{BillingCycle, CyclePrices, PlanTier, PlanTierDetails, TierLimits};
use crate::domain::subscription::CancellationOutcome;

// ════════════════════════════════════════════════════════════════════════════════
// Orders
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/tenants/:tenant_id/orders
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(default)]
    pub service_id: Option<Uuid>,
    pub booked_slot: String,
    /// Defaults to the service fee when a service is given, else the doctor's.
    #[serde(default)]
    pub fee_source: Option<FeeSource>,
}

impl CreateOrderRequest {
    pub fn resolved_fee_source(&self) -> FeeSource {
        self.fee_source.unwrap_or(if self.service_id.is_some() {
            FeeSource::Service
        } else {
            FeeSource::Doctor
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub approval_url: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
}

impl From<CreatedPaymentOrder> for CreateOrderResponse {
    fn from(created: CreatedPaymentOrder) -> Self {
        Self {
            order_id: created.order_id,
            approval_url: created.approval_url,
            amount_minor: created.amount.amount_minor(),
            currency: created.amount.currency().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureResultKind {
    Captured,
    AlreadyCaptured,
    RequiresReconciliation,
}

/// Body of a non-declined capture. Declines are answered with 402.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResponse {
    pub order_id: String,
    pub result: CaptureResultKind,
    pub status: OrderStatus,
    pub capture_id: Option<String>,
    pub appointment_id: Option<AppointmentId>,
}

impl CaptureResponse {
    fn from_order(order: &PaymentOrder, result: CaptureResultKind, appointment_id: Option<AppointmentId>) -> Self {
        Self {
            order_id: order.order_id.clone(),
            result,
            status: order.status,
            capture_id: order.capture_id.clone(),
            appointment_id: appointment_id.or(order.appointment_id),
        }
    }

    /// `None` for a declined capture.
    pub fn from_outcome(outcome: &CaptureOutcome) -> Option<Self> {
        match outcome {
            CaptureOutcome::Captured { order, appointment_id } => {
                Some(Self::from_order(order, CaptureResultKind::Captured, *appointment_id))
            }
            CaptureOutcome::AlreadyCaptured(order) => {
                Some(Self::from_order(order, CaptureResultKind::AlreadyCaptured, None))
            }
            CaptureOutcome::RequiresReconciliation(order) => {
                Some(Self::from_order(order, CaptureResultKind::RequiresReconciliation, None))
            }
            CaptureOutcome::Declined { .. } => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub tier: PlanTier,
    #[serde(default = "default_cycle")]
    pub cycle: BillingCycle,
}

fn default_cycle() -> BillingCycle {
    BillingCycle::Monthly
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanChangeRequest {
    pub tier: PlanTier,
    /// Apply now instead of at the end of the current period.
    #[serde(default)]
    pub immediate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanChangeResponse {
    pub tier: PlanTier,
    pub applied: bool,
    pub effective_date: Option<Timestamp>,
}

impl From<PlanChangeOutcome> for PlanChangeResponse {
    fn from(outcome: PlanChangeOutcome) -> Self {
        match outcome {
            PlanChangeOutcome::Applied(tier) => Self {
                tier,
                applied: true,
                effective_date: None,
            },
            PlanChangeOutcome::Scheduled { tier, effective_date } => Self {
                tier,
                applied: false,
                effective_date: Some(effective_date),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelSubscriptionRequest {
    /// Omit to cancel at the end of the current period.
    #[serde(default)]
    pub effective_date: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelSubscriptionResponse {
    pub canceled: bool,
    pub effective_date: Option<Timestamp>,
}

impl From<CancellationOutcome> for CancelSubscriptionResponse {
    fn from(outcome: CancellationOutcome) -> Self {
        match outcome {
            CancellationOutcome::Immediate => Self {
                canceled: true,
                effective_date: None,
            },
            CancellationOutcome::Scheduled(date) => Self {
                canceled: false,
                effective_date: Some(date),
            },
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Catalog
// ════════════════════════════════════════════════════════════════════════════════

/// Public view of a tier. Gateway plan ids stay internal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub tier: PlanTier,
    pub display_name: String,
    pub prices: BTreeMap<String, CyclePrices>,
    pub features: Vec<String>,
    pub limits: TierLimits,
}

impl From<PlanTierDetails> for PlanResponse {
    fn from(details: PlanTierDetails) -> Self {
        Self {
            tier: details.tier,
            display_name: details.display_name,
            prices: details.prices,
            features: details.features,
            limits: details.limits,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlansResponse {
    pub plans: Vec<PlanResponse>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhooks and operations
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAcceptedResponse {
    pub event_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
