//! In-memory clinic directory with failure injection for appointment creation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::domain::foundation::{
    AppointmentId, DoctorId, DomainError, ErrorCode, PatientId, ServiceId, TenantId,
};
use crate::ports::{
    Appointment, ClinicDirectory, ClinicService, ClinicSettings, Doctor, NewAppointment, Patient,
};

pub struct InMemoryClinicDirectory {
    patients: RwLock<HashMap<PatientId, Patient>>,
    doctors: RwLock<HashMap<DoctorId, Doctor>>,
    services: RwLock<HashMap<ServiceId, ClinicService>>,
    settings: RwLock<ClinicSettings>,
    appointments: RwLock<Vec<NewAppointment>>,
    fail_appointments: AtomicBool,
}

impl Default for InMemoryClinicDirectory {
    fn default() -> Self {
        Self {
            patients: RwLock::new(HashMap::new()),
            doctors: RwLock::new(HashMap::new()),
            services: RwLock::new(HashMap::new()),
            settings: RwLock::new(ClinicSettings {
                clinic_name: "Test Clinic".to_string(),
                display_currency: "USD".to_string(),
                default_consultation_fee: None,
            }),
            appointments: RwLock::new(Vec::new()),
            fail_appointments: AtomicBool::new(false),
        }
    }
}

impl InMemoryClinicDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_patient(&self, patient: Patient) {
        self.patients.write().await.insert(patient.id, patient);
    }

    pub async fn add_doctor(&self, doctor: Doctor) {
        self.doctors.write().await.insert(doctor.id, doctor);
    }

    pub async fn add_service(&self, service: ClinicService) {
        self.services.write().await.insert(service.id, service);
    }

    pub async fn set_settings(&self, settings: ClinicSettings) {
        *self.settings.write().await = settings;
    }

    pub fn fail_appointment_creation(&self, fail: bool) {
        self.fail_appointments.store(fail, Ordering::SeqCst);
    }

    pub async fn appointments(&self) -> Vec<NewAppointment> {
        self.appointments.read().await.clone()
    }
}

#[async_trait]
impl ClinicDirectory for InMemoryClinicDirectory {
    async fn find_patient(&self, _tenant_id: &TenantId, id: &PatientId) -> Result<Option<Patient>, DomainError> {
        Ok(self.patients.read().await.get(id).cloned())
    }

    async fn find_doctor(&self, _tenant_id: &TenantId, id: &DoctorId) -> Result<Option<Doctor>, DomainError> {
        Ok(self.doctors.read().await.get(id).cloned())
    }

    async fn find_service(&self, _tenant_id: &TenantId, id: &ServiceId) -> Result<Option<ClinicService>, DomainError> {
        Ok(self.services.read().await.get(id).cloned())
    }

    async fn clinic_settings(&self, _tenant_id: &TenantId) -> Result<ClinicSettings, DomainError> {
        Ok(self.settings.read().await.clone())
    }

    async fn create_appointment(&self, appointment: NewAppointment) -> Result<Appointment, DomainError> {
        if self.fail_appointments.load(Ordering::SeqCst) {
            return Err(DomainError::new(ErrorCode::ExternalServiceError, "Directory unavailable"));
        }
        let created = Appointment {
            id: AppointmentId::new(),
            starts_at: appointment.starts_at,
        };
        self.appointments.write().await.push(appointment);
        Ok(created)
    }
}
