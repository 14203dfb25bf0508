//! PaymentOrder aggregate.
//!
//! One row per gateway order. The amount is fixed at creation: there is no
//! setter, and storage adapters rebuild orders through [`PaymentOrder::restore`].

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AppointmentId, DoctorId, DomainError, ErrorCode, Money, PatientId, PaymentOrderId, ServiceId,
    StateMachine, TenantId, Timestamp,
};

use super::OrderStatus;

/// What an order pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    VirtualConsultation,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::VirtualConsultation => "VIRTUAL_CONSULTATION",
        }
    }
}

/// Booking context carried from order creation to the appointment side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeeContext {
    pub doctor_id: DoctorId,
    pub service_id: Option<ServiceId>,
    /// Slot text exactly as the patient chose it.
    pub booked_slot: String,
}

/// Capture metadata recorded when an order completes.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureDetails {
    pub capture_id: Option<String>,
    pub payer_email: Option<String>,
    pub payer_name: Option<String>,
    pub raw_payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOrder {
    pub id: PaymentOrderId,
    /// Gateway-assigned order id. Unique.
    pub order_id: String,
    pub tenant_id: TenantId,
    pub patient_id: PatientId,
    pub payee: PayeeContext,
    pub order_type: OrderType,
    amount: Money,
    pub status: OrderStatus,
    pub capture_id: Option<String>,
    pub payer_email: Option<String>,
    pub payer_name: Option<String>,
    pub raw_payload: Option<serde_json::Value>,
    pub failure_reason: Option<String>,
    /// Set once the appointment exists; doubles as the side-effect-applied marker.
    pub appointment_id: Option<AppointmentId>,
    /// When a handler took ownership of creating the appointment.
    pub side_effect_claimed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl PaymentOrder {
    /// Creates a pending order for a consultation fee.
    pub fn create(
        order_id: impl Into<String>,
        tenant_id: TenantId,
        patient_id: PatientId,
        payee: PayeeContext,
        amount: Money,
    ) -> Result<Self, DomainError> {
        let order_id = order_id.into();
        if order_id.trim().is_empty() {
            return Err(DomainError::validation("order_id", "Gateway order id is required"));
        }
        if amount.amount_minor() <= 0 {
            return Err(DomainError::validation("amount", "Order amount must be positive"));
        }

        let now = Timestamp::now();
        Ok(Self::restore(
            PaymentOrderId::new(),
            order_id,
            tenant_id,
            patient_id,
            payee,
            amount,
            now,
        ))
    }

    /// Rebuilds a pending order shell from storage; callers then fill the
    /// remaining public fields from the stored row.
    pub fn restore(
        id: PaymentOrderId,
        order_id: String,
        tenant_id: TenantId,
        patient_id: PatientId,
        payee: PayeeContext,
        amount: Money,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            order_id,
            tenant_id,
            patient_id,
            payee,
            order_type: OrderType::VirtualConsultation,
            amount,
            status: OrderStatus::Pending,
            capture_id: None,
            payer_email: None,
            payer_name: None,
            raw_payload: None,
            failure_reason: None,
            appointment_id: None,
            side_effect_claimed_at: None,
            created_at,
            updated_at: created_at,
            completed_at: None,
        }
    }

    pub fn amount(&self) -> &Money {
        &self.amount
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == OrderStatus::Completed
    }

    /// True once the appointment for this payment exists.
    pub fn has_appointment(&self) -> bool {
        self.appointment_id.is_some()
    }

    /// Moves PENDING to COMPLETED and takes the side-effect claim.
    pub fn complete(&mut self, details: CaptureDetails, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Completed)?;
        self.capture_id = details.capture_id;
        self.payer_email = details.payer_email;
        self.payer_name = details.payer_name;
        self.raw_payload = Some(details.raw_payload);
        self.side_effect_claimed_at = Some(now);
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        self.updated_at = now;
        Ok(())
    }

    /// A completed order whose appointment is missing and whose claim is
    /// absent or older than `timeout` may be picked up by another handler.
    pub fn side_effect_reclaimable(&self, now: Timestamp, timeout: Duration) -> bool {
        if !self.is_completed() || self.has_appointment() {
            return false;
        }
        match self.side_effect_claimed_at {
            None => true,
            Some(claimed) => now.duration_since(&claimed) >= timeout,
        }
    }

    fn transition_to(&mut self, target: OrderStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition order {} from {} to {}",
                    self.order_id, self.status, target
                ),
            )
            .with_detail("current", self.status.as_str())
            .with_detail("attempted", target.as_str())
        })?;
        Ok(())
    }
}
