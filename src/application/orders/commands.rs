//! Order commands and outcomes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AppointmentId, DoctorId, Money, PatientId, ServiceId, TenantId};
use crate::domain::payment::PaymentOrder;

/// Where the consultation fee comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeSource {
    /// The booked service's fee.
    Service,
    /// The doctor's own virtual consultation fee.
    Doctor,
    /// The clinic-wide default consultation fee.
    ClinicDefault,
}

#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub tenant_id: TenantId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub service_id: Option<ServiceId>,
    pub booked_slot: String,
    pub fee_source: FeeSource,
}

#[derive(Debug, Clone)]
pub struct CreatedPaymentOrder {
    pub order_id: String,
    pub approval_url: Option<String>,
    pub amount: Money,
}

/// Result of a direct capture request.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// This call captured the payment and ran the booking side effect.
    Captured {
        order: PaymentOrder,
        appointment_id: Option<AppointmentId>,
    },
    /// Another caller (direct or webhook) completed the order first.
    AlreadyCaptured(PaymentOrder),
    /// The gateway declined the payment. The order is FAILED.
    Declined { order: PaymentOrder, reason: String },
    /// The gateway captured money for an order already marked FAILED.
    RequiresReconciliation(PaymentOrder),
}

/// Capture data carried by a `PAYMENT.CAPTURE.COMPLETED` webhook.
#[derive(Debug, Clone)]
pub struct WebhookPayment {
    pub order_id: String,
    pub capture_id: Option<String>,
    pub payer_email: Option<String>,
    pub payer_name: Option<String>,
    pub raw_payload: serde_json::Value,
}

/// Result of applying a capture webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookPaymentOutcome {
    /// The order was completed (or its side effect resumed) by this delivery.
    Processed { appointment_id: Option<AppointmentId> },
    /// The order already has its appointment.
    AlreadyProcessed,
    /// Another handler holds a fresh side-effect claim.
    SideEffectInProgress,
    /// The gateway captured money for a FAILED order; a human must look.
    RequiresReconciliation,
    /// No order with this gateway id is known here.
    UnknownOrder,
}
