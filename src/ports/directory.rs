//! Clinic directory port: patients, doctors, services, clinic settings, and
//! appointment creation, owned by a separate service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AppointmentId, DoctorId, DomainError, Money, PatientId, PaymentOrderId, ServiceId, TenantId,
    Timestamp,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub full_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub full_name: String,
    /// Per-doctor virtual consultation fee, minor units of the settlement currency.
    pub consultation_fee: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicService {
    pub id: ServiceId,
    pub name: String,
    pub fee: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicSettings {
    pub clinic_name: String,
    /// Currency prices are shown in. Charges always settle in the configured
    /// settlement currency.
    pub display_currency: String,
    pub default_consultation_fee: Option<i64>,
}

/// Appointment to create after a successful payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub tenant_id: TenantId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub service_id: Option<ServiceId>,
    pub starts_at: Timestamp,
    /// Set when the requested slot could not be read and a fallback was used.
    pub needs_schedule_review: bool,
    pub payment_order_id: PaymentOrderId,
    pub gateway_order_id: String,
    pub amount_paid: Money,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub starts_at: Timestamp,
}

#[async_trait]
pub trait ClinicDirectory: Send + Sync {
    async fn find_patient(&self, tenant_id: &TenantId, id: &PatientId) -> Result<Option<Patient>, DomainError>;

    async fn find_doctor(&self, tenant_id: &TenantId, id: &DoctorId) -> Result<Option<Doctor>, DomainError>;

    async fn find_service(&self, tenant_id: &TenantId, id: &ServiceId) -> Result<Option<ClinicService>, DomainError>;

    async fn clinic_settings(&self, tenant_id: &TenantId) -> Result<ClinicSettings, DomainError>;

    async fn create_appointment(&self, appointment: NewAppointment) -> Result<Appointment, DomainError>;
}
