//! Notification service over HTTP.

use async_trait::async_trait;

use super::http::ServiceClient;
use crate::config::CollaboratorsConfig;
use crate::domain::foundation::DomainError;
use crate::ports::{AppointmentConfirmation, NotificationSender, StaffNotice};

pub struct HttpNotificationSender {
    client: ServiceClient,
}

impl HttpNotificationSender {
    pub fn new(config: &CollaboratorsConfig) -> Result<Self, DomainError> {
        Ok(Self {
            client: ServiceClient::new("notifications", &config.notification_url, config.request_timeout())?,
        })
    }
}

#[async_trait]
impl NotificationSender for HttpNotificationSender {
    async fn send_appointment_confirmation(&self, confirmation: &AppointmentConfirmation) -> Result<(), DomainError> {
        self.client
            .post_ignoring_body(
                &format!("/tenants/{}/notifications/appointment-confirmation", confirmation.tenant_id),
                confirmation,
            )
            .await
    }

    async fn broadcast_to_staff(&self, notice: &StaffNotice) -> Result<(), DomainError> {
        self.client
            .post_ignoring_body(&format!("/tenants/{}/notifications/staff", notice.tenant_id), notice)
            .await
    }
}
