//! Clinic directory over HTTP.
//!
//! Routes are tenant-scoped: `/tenants/{tenant_id}/patients/{id}` and so on.

use async_trait::async_trait;

use super::http::ServiceClient;
use crate::config::CollaboratorsConfig;
use crate::domain::foundation::{DoctorId, DomainError, PatientId, ServiceId, TenantId};
use crate::ports::{
    Appointment, ClinicDirectory, ClinicService, ClinicSettings, Doctor, NewAppointment, Patient,
};

pub struct HttpDirectoryClient {
    client: ServiceClient,
}

impl HttpDirectoryClient {
    pub fn new(config: &CollaboratorsConfig) -> Result<Self, DomainError> {
        Ok(Self {
            client: ServiceClient::new("directory", &config.directory_url, config.request_timeout())?,
        })
    }
}

#[async_trait]
impl ClinicDirectory for HttpDirectoryClient {
    async fn find_patient(&self, tenant_id: &TenantId, id: &PatientId) -> Result<Option<Patient>, DomainError> {
        self.client
            .get_optional(&format!("/tenants/{}/patients/{}", tenant_id, id))
            .await
    }

    async fn find_doctor(&self, tenant_id: &TenantId, id: &DoctorId) -> Result<Option<Doctor>, DomainError> {
        self.client
            .get_optional(&format!("/tenants/{}/doctors/{}", tenant_id, id))
            .await
    }

    async fn find_service(&self, tenant_id: &TenantId, id: &ServiceId) -> Result<Option<ClinicService>, DomainError> {
        self.client
            .get_optional(&format!("/tenants/{}/services/{}", tenant_id, id))
            .await
    }

    async fn clinic_settings(&self, tenant_id: &TenantId) -> Result<ClinicSettings, DomainError> {
        self.client.get(&format!("/tenants/{}/settings", tenant_id)).await
    }

    async fn create_appointment(&self, appointment: NewAppointment) -> Result<Appointment, DomainError> {
        let path = format!("/tenants/{}/appointments", appointment.tenant_id);
        let created: Appointment = self.client.post(&path, &appointment).await?;
        tracing::info!(
            tenant_id = %appointment.tenant_id,
            appointment_id = %created.id,
            gateway_order_id = %appointment.gateway_order_id,
            "appointment created"
        );
        Ok(created)
    }
}
