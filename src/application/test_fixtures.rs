//! Fully wired in-memory billing engine for service-level tests.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::orders::{CreateOrderCommand, FeeSource};
use super::{BillingMetrics, BillingServices, BillingSettings};
use crate::adapters::catalog::PlanTierCatalog;
use crate::adapters::memory::InMemoryBilling;
use crate::adapters::paypal::MockPaymentGateway;
use crate::domain::foundation::{DoctorId, PatientId, TenantId};
use crate::domain::webhook::WebhookEnvelope;
use crate::ports::{Doctor, Patient};

pub(crate) struct TestBilling {
    pub kit: InMemoryBilling,
    pub gateway: MockPaymentGateway,
    pub services: BillingServices,
    pub tenant_id: TenantId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
}

impl TestBilling {
    pub async fn new() -> Self {
        Self::with_gateway(MockPaymentGateway::new()).await
    }

    pub async fn with_gateway(gateway: MockPaymentGateway) -> Self {
        Self::build(InMemoryBilling::new(), gateway).await
    }

    pub async fn build(kit: InMemoryBilling, gateway: MockPaymentGateway) -> Self {
        let catalog = Arc::new(PlanTierCatalog::embedded(Duration::from_secs(60)).unwrap());
        let metrics = Arc::new(BillingMetrics::new().unwrap());
        let services = BillingServices::build(
            kit.ports(Arc::new(gateway.clone()), catalog),
            metrics,
            BillingSettings::default(),
        );

        let patient_id = PatientId::new();
        let doctor_id = DoctorId::new();
        kit.directory
            .add_patient(Patient {
                id: patient_id,
                full_name: "Ada Patient".to_string(),
                email: Some("ada@example.com".to_string()),
            })
            .await;
        kit.directory
            .add_doctor(Doctor {
                id: doctor_id,
                full_name: "Dr. Grey".to_string(),
                consultation_fee: Some(12000),
            })
            .await;

        Self {
            kit,
            gateway,
            services,
            tenant_id: TenantId::new(),
            patient_id,
            doctor_id,
        }
    }

    pub fn order_command(&self) -> CreateOrderCommand {
        CreateOrderCommand {
            tenant_id: self.tenant_id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            service_id: None,
            booked_slot: "2026-11-02T09:30:00Z".to_string(),
            fee_source: FeeSource::Doctor,
        }
    }

    pub async fn create_order(&self) -> String {
        self.services.orders.create_order(self.order_command()).await.unwrap().order_id
    }
}

pub(crate) fn envelope(id: &str, event_type: &str, resource: serde_json::Value) -> WebhookEnvelope {
    WebhookEnvelope {
        id: id.to_string(),
        event_type: event_type.to_string(),
        create_time: Some("2026-10-01T10:00:00Z".to_string()),
        resource_type: None,
        summary: None,
        resource,
    }
}

pub(crate) fn capture_completed(event_id: &str, order_id: &str) -> WebhookEnvelope {
    envelope(
        event_id,
        "PAYMENT.CAPTURE.COMPLETED",
        json!({
            "id": format!("CAP-{}", order_id),
            "status": "COMPLETED",
            "amount": {"value": "120.00", "currency_code": "USD"},
            "supplementary_data": {"related_ids": {"order_id": order_id}}
        }),
    )
}
