//! Notification port. Fire-and-forget: callers log failures and move on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AppointmentId, DomainError, Money, TenantId, Timestamp};

/// Confirmation sent to the patient after a paid booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentConfirmation {
    pub tenant_id: TenantId,
    pub appointment_id: AppointmentId,
    pub recipient_email: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub clinic_name: String,
    pub starts_at: Timestamp,
    pub amount_paid: Money,
}

/// Broadcast to clinic staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffNotice {
    pub tenant_id: TenantId,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_appointment_confirmation(&self, confirmation: &AppointmentConfirmation) -> Result<(), DomainError>;

    async fn broadcast_to_staff(&self, notice: &StaffNotice) -> Result<(), DomainError>;
}
