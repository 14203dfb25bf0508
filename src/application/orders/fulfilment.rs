//! Appointment side effect of a completed payment.
//!
//! Runs only for the caller that owns the order's side-effect claim. Nothing
//! here can undo the recorded payment: appointment failures are alerted and
//! release the claim for a webhook retry or the recovery sweep. Notification
//! failures are logged and alerted.

use std::sync::Arc;

use crate::application::monitoring::BillingMonitor;
use crate::domain::foundation::{AppointmentId, Timestamp};
use crate::domain::payment::{BookedSlot, PaymentOrder};
use crate::ports::{
    AppointmentConfirmation, ClinicDirectory, NewAppointment, NotificationSender,
    PaymentOrderRepository, StaffNotice,
};

pub const PAYMENT_METHOD: &str = "paypal";

pub struct AppointmentFulfilment {
    orders: Arc<dyn PaymentOrderRepository>,
    directory: Arc<dyn ClinicDirectory>,
    notifier: Arc<dyn NotificationSender>,
    monitor: Arc<BillingMonitor>,
}

impl AppointmentFulfilment {
    pub fn new(
        orders: Arc<dyn PaymentOrderRepository>,
        directory: Arc<dyn ClinicDirectory>,
        notifier: Arc<dyn NotificationSender>,
        monitor: Arc<BillingMonitor>,
    ) -> Self {
        Self {
            orders,
            directory,
            notifier,
            monitor,
        }
    }

    /// Create the appointment for a paid order and notify patient and staff.
    /// Returns the appointment id, or `None` when the appointment could not
    /// be created.
    pub async fn create_appointment_from_payment(&self, order: &PaymentOrder) -> Option<AppointmentId> {
        let now = Timestamp::now();
        let slot = BookedSlot::parse_or_fallback(&order.payee.booked_slot, now);
        if slot.needs_schedule_review {
            tracing::warn!(
                order_id = %order.order_id,
                booked_slot = %order.payee.booked_slot,
                "Booked slot unreadable, using fallback time"
            );
            self.monitor
                .schedule_fallback(
                    &order.order_id,
                    &order.payee.booked_slot,
                    &slot.starts_at.as_datetime().to_rfc3339(),
                )
                .await;
        }

        let appointment = match self
            .directory
            .create_appointment(NewAppointment {
                tenant_id: order.tenant_id,
                patient_id: order.patient_id,
                doctor_id: order.payee.doctor_id,
                service_id: order.payee.service_id,
                starts_at: slot.starts_at,
                needs_schedule_review: slot.needs_schedule_review,
                payment_order_id: order.id,
                gateway_order_id: order.order_id.clone(),
                amount_paid: order.amount().clone(),
                payment_method: PAYMENT_METHOD.to_string(),
            })
            .await
        {
            Ok(appointment) => appointment,
            Err(e) => {
                tracing::error!(order_id = %order.order_id, error = %e, "Appointment creation failed after payment");
                self.monitor
                    .appointment_creation_failed(&order.order_id, order.capture_id.as_deref(), &e.to_string())
                    .await;
                if let Err(release_err) = self.orders.release_side_effect_claim(&order.order_id).await {
                    tracing::error!(order_id = %order.order_id, error = %release_err, "Failed to release side-effect claim");
                }
                return None;
            }
        };

        if let Err(e) = self.orders.attach_appointment(&order.order_id, appointment.id, now).await {
            // The claim stays held so a redelivery cannot book a second slot
            // before it goes stale.
            tracing::error!(
                order_id = %order.order_id,
                appointment_id = %appointment.id,
                error = %e,
                "Failed to attach appointment to order"
            );
        }

        tracing::info!(
            order_id = %order.order_id,
            appointment_id = %appointment.id,
            needs_schedule_review = slot.needs_schedule_review,
            "Appointment created from payment"
        );

        self.notify(order, appointment.id, slot.starts_at).await;
        Some(appointment.id)
    }

    async fn notify(&self, order: &PaymentOrder, appointment_id: AppointmentId, starts_at: Timestamp) {
        let tenant_id = &order.tenant_id;
        let patient = self.directory.find_patient(tenant_id, &order.patient_id).await.ok().flatten();
        let doctor = self.directory.find_doctor(tenant_id, &order.payee.doctor_id).await.ok().flatten();
        let clinic_name = self
            .directory
            .clinic_settings(tenant_id)
            .await
            .map(|s| s.clinic_name)
            .unwrap_or_default();

        let patient_name = patient
            .as_ref()
            .map(|p| p.full_name.clone())
            .or_else(|| order.payer_name.clone())
            .unwrap_or_else(|| "Patient".to_string());
        let doctor_name = doctor.map(|d| d.full_name).unwrap_or_else(|| "your doctor".to_string());
        let recipient = patient.and_then(|p| p.email).or_else(|| order.payer_email.clone());

        match recipient {
            Some(recipient_email) => {
                let confirmation = AppointmentConfirmation {
                    tenant_id: *tenant_id,
                    appointment_id,
                    recipient_email,
                    patient_name: patient_name.clone(),
                    doctor_name: doctor_name.clone(),
                    clinic_name,
                    starts_at,
                    amount_paid: order.amount().clone(),
                };
                if let Err(e) = self.notifier.send_appointment_confirmation(&confirmation).await {
                    tracing::warn!(order_id = %order.order_id, error = %e, "Patient confirmation not sent");
                    self.monitor.notification_failed("patient_confirmation", &order.order_id, &e.to_string()).await;
                }
            }
            None => tracing::warn!(order_id = %order.order_id, "No email for patient confirmation"),
        }

        let notice = StaffNotice {
            tenant_id: *tenant_id,
            subject: "New paid virtual consultation".to_string(),
            body: format!(
                "{} booked a virtual consultation with {} at {} ({} paid).",
                patient_name,
                doctor_name,
                starts_at.as_datetime().to_rfc3339(),
                order.amount()
            ),
        };
        if let Err(e) = self.notifier.broadcast_to_staff(&notice).await {
            tracing::warn!(order_id = %order.order_id, error = %e, "Staff broadcast not sent");
            self.monitor.notification_failed("staff_broadcast", &order.order_id, &e.to_string()).await;
        }
    }
}
