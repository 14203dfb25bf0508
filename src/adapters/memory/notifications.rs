//! Notification sender that records messages instead of sending them.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{AppointmentConfirmation, NotificationSender, StaffNotice};

#[derive(Default)]
pub struct RecordingNotificationSender {
    confirmations: RwLock<Vec<AppointmentConfirmation>>,
    notices: RwLock<Vec<StaffNotice>>,
    failing: AtomicBool,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails while set.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn confirmations(&self) -> Vec<AppointmentConfirmation> {
        self.confirmations.read().await.clone()
    }

    pub async fn staff_notices(&self) -> Vec<StaffNotice> {
        self.notices.read().await.clone()
    }

    fn check(&self) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::new(ErrorCode::ExternalServiceError, "Notification service unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send_appointment_confirmation(&self, confirmation: &AppointmentConfirmation) -> Result<(), DomainError> {
        self.check()?;
        self.confirmations.write().await.push(confirmation.clone());
        Ok(())
    }

    async fn broadcast_to_staff(&self, notice: &StaffNotice) -> Result<(), DomainError> {
        self.check()?;
        self.notices.write().await.push(notice.clone());
        Ok(())
    }
}
