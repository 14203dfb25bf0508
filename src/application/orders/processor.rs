//! OrderPaymentProcessor - one-time consultation payments.
//!
//! Two paths complete an order: the patient's browser returning from the
//! gateway (`capture_order`) and the gateway's capture webhook
//! (`process_webhook_payment`). Both funnel through the repository's
//! conditional PENDING -> COMPLETED update, and only the caller whose update
//! applied creates the appointment.

use std::sync::Arc;

use super::commands::{
    CaptureOutcome, CreateOrderCommand, CreatedPaymentOrder, FeeSource, WebhookPayment,
    WebhookPaymentOutcome,
};
use super::fulfilment::AppointmentFulfilment;
use crate::application::monitoring::BillingMonitor;
use crate::application::BillingError;
use crate::domain::foundation::{Currency, Money, TenantId, Timestamp};
use crate::domain::ledger::{PaymentTransaction, TransactionKind, TransactionOutcome};
use crate::domain::payment::{CaptureDetails, OrderStatus, PayeeContext, PaymentOrder};
use crate::ports::{
    ClinicDirectory, CreateOrderRequest, PaymentGateway, PaymentOrderRepository,
    PaymentTransactionLog, TransitionOutcome,
};

#[derive(Debug, Clone)]
pub struct OrderProcessorSettings {
    pub settlement_currency: Currency,
    pub side_effect_claim_timeout: chrono::Duration,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
}

pub struct OrderPaymentProcessor {
    orders: Arc<dyn PaymentOrderRepository>,
    transactions: Arc<dyn PaymentTransactionLog>,
    gateway: Arc<dyn PaymentGateway>,
    directory: Arc<dyn ClinicDirectory>,
    fulfilment: Arc<AppointmentFulfilment>,
    monitor: Arc<BillingMonitor>,
    settings: OrderProcessorSettings,
}

impl OrderPaymentProcessor {
    pub fn new(
        orders: Arc<dyn PaymentOrderRepository>,
        transactions: Arc<dyn PaymentTransactionLog>,
        gateway: Arc<dyn PaymentGateway>,
        directory: Arc<dyn ClinicDirectory>,
        fulfilment: Arc<AppointmentFulfilment>,
        monitor: Arc<BillingMonitor>,
        settings: OrderProcessorSettings,
    ) -> Self {
        Self {
            orders,
            transactions,
            gateway,
            directory,
            fulfilment,
            monitor,
            settings,
        }
    }

    /// Price the consultation, open a gateway order, and store it PENDING.
    #[tracing::instrument(skip(self, cmd), fields(tenant_id = %cmd.tenant_id))]
    pub async fn create_order(&self, cmd: CreateOrderCommand) -> Result<CreatedPaymentOrder, BillingError> {
        let tenant_id = cmd.tenant_id;
        self.directory
            .find_patient(&tenant_id, &cmd.patient_id)
            .await?
            .ok_or_else(|| BillingError::not_found("patient", cmd.patient_id))?;
        let doctor = self
            .directory
            .find_doctor(&tenant_id, &cmd.doctor_id)
            .await?
            .ok_or_else(|| BillingError::not_found("doctor", cmd.doctor_id))?;
        let service = match cmd.service_id {
            Some(service_id) => Some(
                self.directory
                    .find_service(&tenant_id, &service_id)
                    .await?
                    .ok_or_else(|| BillingError::not_found("service", service_id))?,
            ),
            None => None,
        };

        let fee = match cmd.fee_source {
            FeeSource::Service => match &service {
                Some(service) => service.fee,
                None => return Err(BillingError::validation("service_id", "A service is required to price by service fee")),
            },
            FeeSource::Doctor => doctor.consultation_fee,
            FeeSource::ClinicDefault => self.directory.clinic_settings(&tenant_id).await?.default_consultation_fee,
        };
        let fee = fee.ok_or_else(|| BillingError::validation("fee", "No consultation fee is configured"))?;
        // Always charged in the settlement currency, whatever the clinic displays.
        let amount = Money::positive(fee, self.settings.settlement_currency.clone())
            .map_err(|e| BillingError::validation("fee", e.to_string()))?;

        let idempotency_key = format!(
            "order:{}:{}:{}:{}:{}",
            tenant_id, cmd.patient_id, cmd.doctor_id, cmd.booked_slot, amount
        );
        let created = self
            .gateway
            .create_order(
                &tenant_id,
                CreateOrderRequest {
                    amount: amount.clone(),
                    reference_id: cmd.patient_id.to_string(),
                    description: format!("Virtual consultation with {}", doctor.full_name),
                    custom_id: tenant_id.to_string(),
                    idempotency_key,
                    return_url: self.settings.return_url.clone(),
                    cancel_url: self.settings.cancel_url.clone(),
                },
            )
            .await?;

        let order = PaymentOrder::create(
            created.order_id.clone(),
            tenant_id,
            cmd.patient_id,
            PayeeContext {
                doctor_id: cmd.doctor_id,
                service_id: cmd.service_id,
                booked_slot: cmd.booked_slot,
            },
            amount.clone(),
        )?;
        self.orders.insert(&order).await?;

        tracing::info!(order_id = %order.order_id, amount = %amount, "Payment order created");
        Ok(CreatedPaymentOrder {
            order_id: created.order_id,
            approval_url: created.approval_url,
            amount,
        })
    }

    /// Capture an approved order on the patient's return from the gateway.
    #[tracing::instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn capture_order(&self, tenant_id: &TenantId, order_id: &str) -> Result<CaptureOutcome, BillingError> {
        let order = self
            .orders
            .find_by_order_id(order_id)
            .await?
            .filter(|o| &o.tenant_id == tenant_id)
            .ok_or_else(|| BillingError::not_found("payment order", order_id))?;

        match order.status {
            OrderStatus::Completed => {
                tracing::debug!(order_id, "Order already captured");
                return Ok(CaptureOutcome::AlreadyCaptured(order));
            }
            OrderStatus::Failed => {
                return Err(BillingError::invalid_state(OrderStatus::Failed.as_str(), "capture"));
            }
            OrderStatus::Pending => {}
        }

        let result = match self.gateway.capture_order(tenant_id, order_id).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(order_id, error = %e, "Capture failed at gateway");
                self.orders.fail_if_pending(order_id, &e.to_string(), Timestamp::now()).await?;
                self.record_transaction(
                    PaymentTransaction::new(
                        *tenant_id,
                        TransactionKind::OrderCapture,
                        TransactionOutcome::Failed,
                        order_id,
                        Timestamp::now(),
                    )
                    .with_amount(order.amount().clone()),
                )
                .await;
                self.monitor.gateway_call_failed("capture_order", order_id, &e.to_string()).await;
                return Err(e.into());
            }
        };

        if !result.success {
            let reason = result.status.clone();
            self.record_transaction(
                PaymentTransaction::new(
                    *tenant_id,
                    TransactionKind::OrderCapture,
                    TransactionOutcome::Declined,
                    order_id,
                    Timestamp::now(),
                )
                .with_amount(order.amount().clone())
                .with_raw_payload(result.raw_response.clone()),
            )
            .await;
            return match self.orders.fail_if_pending(order_id, &reason, Timestamp::now()).await? {
                TransitionOutcome::Applied(order) => {
                    tracing::info!(order_id, reason = %reason, "Payment declined");
                    Ok(CaptureOutcome::Declined { order, reason })
                }
                TransitionOutcome::Unchanged(order) if order.is_completed() => Ok(CaptureOutcome::AlreadyCaptured(order)),
                TransitionOutcome::Unchanged(order) => Ok(CaptureOutcome::Declined { order, reason }),
                TransitionOutcome::NotFound => Err(BillingError::not_found("payment order", order_id)),
            };
        }

        let details = CaptureDetails {
            capture_id: result.capture_id.clone(),
            payer_email: result.payer_email.clone(),
            payer_name: result.payer_name.clone(),
            raw_payload: result.raw_response.clone(),
        };
        match self.orders.complete_if_pending(order_id, &details, Timestamp::now()).await? {
            TransitionOutcome::Applied(order) => {
                self.record_capture_success(&order).await;
                let appointment_id = self.fulfilment.create_appointment_from_payment(&order).await;
                Ok(CaptureOutcome::Captured { order, appointment_id })
            }
            TransitionOutcome::Unchanged(order) if order.is_completed() => Ok(CaptureOutcome::AlreadyCaptured(order)),
            TransitionOutcome::Unchanged(order) => {
                self.monitor
                    .capture_reconciliation_required(order_id, result.capture_id.as_deref())
                    .await;
                Ok(CaptureOutcome::RequiresReconciliation(order))
            }
            TransitionOutcome::NotFound => Err(BillingError::not_found("payment order", order_id)),
        }
    }

    /// Apply a `PAYMENT.CAPTURE.COMPLETED` webhook. Safe to call any number
    /// of times, concurrently with `capture_order`.
    #[tracing::instrument(skip(self, payment), fields(order_id = %payment.order_id))]
    pub async fn process_webhook_payment(&self, payment: WebhookPayment) -> Result<WebhookPaymentOutcome, BillingError> {
        let Some(order) = self.orders.find_by_order_id(&payment.order_id).await? else {
            tracing::warn!("Capture webhook for unknown order");
            return Ok(WebhookPaymentOutcome::UnknownOrder);
        };

        let order = if order.is_pending() {
            let details = CaptureDetails {
                capture_id: payment.capture_id.clone(),
                payer_email: payment.payer_email.clone(),
                payer_name: payment.payer_name.clone(),
                raw_payload: payment.raw_payload.clone(),
            };
            match self.orders.complete_if_pending(&payment.order_id, &details, Timestamp::now()).await? {
                TransitionOutcome::Applied(order) => {
                    self.record_capture_success(&order).await;
                    let appointment_id = self.fulfilment.create_appointment_from_payment(&order).await;
                    return Ok(WebhookPaymentOutcome::Processed { appointment_id });
                }
                TransitionOutcome::Unchanged(order) => order,
                TransitionOutcome::NotFound => return Ok(WebhookPaymentOutcome::UnknownOrder),
            }
        } else {
            order
        };

        match order.status {
            OrderStatus::Completed if order.has_appointment() => Ok(WebhookPaymentOutcome::AlreadyProcessed),
            OrderStatus::Completed => {
                let now = Timestamp::now();
                let stale_before = now.add(-self.settings.side_effect_claim_timeout);
                match self.orders.reclaim_side_effect(&payment.order_id, now, stale_before).await? {
                    Some(order) => {
                        tracing::info!("Resuming appointment side effect");
                        let appointment_id = self.fulfilment.create_appointment_from_payment(&order).await;
                        Ok(WebhookPaymentOutcome::Processed { appointment_id })
                    }
                    None => Ok(WebhookPaymentOutcome::SideEffectInProgress),
                }
            }
            OrderStatus::Failed => {
                tracing::error!(capture_id = ?payment.capture_id, "Gateway captured payment for a FAILED order");
                self.monitor
                    .capture_reconciliation_required(&payment.order_id, payment.capture_id.as_deref())
                    .await;
                Ok(WebhookPaymentOutcome::RequiresReconciliation)
            }
            OrderStatus::Pending => Ok(WebhookPaymentOutcome::SideEffectInProgress),
        }
    }

    /// Book appointments for paid orders whose side effect failed or was
    /// abandoned. Returns how many were booked.
    pub async fn resume_unfulfilled(&self, now: Timestamp, limit: u32) -> Result<usize, BillingError> {
        let stale_before = now.add(-self.settings.side_effect_claim_timeout);
        let candidates = self.orders.find_unfulfilled(stale_before, limit).await?;
        let mut booked = 0;
        for candidate in candidates {
            // Another handler may have claimed it since the listing.
            let Some(order) = self.orders.reclaim_side_effect(&candidate.order_id, now, stale_before).await? else {
                continue;
            };
            tracing::info!(order_id = %order.order_id, "Recovering appointment for paid order");
            if self.fulfilment.create_appointment_from_payment(&order).await.is_some() {
                booked += 1;
            }
        }
        Ok(booked)
    }

    /// Apply a `PAYMENT.CAPTURE.DENIED` webhook.
    pub async fn process_webhook_denial(&self, order_id: &str, reason: &str) -> Result<bool, BillingError> {
        match self.orders.fail_if_pending(order_id, reason, Timestamp::now()).await? {
            TransitionOutcome::Applied(order) => {
                tracing::info!(order_id, reason, "Capture denied by gateway");
                self.record_transaction(
                    PaymentTransaction::new(
                        order.tenant_id,
                        TransactionKind::OrderCapture,
                        TransactionOutcome::Declined,
                        order_id,
                        Timestamp::now(),
                    )
                    .with_amount(order.amount().clone()),
                )
                .await;
                Ok(true)
            }
            TransitionOutcome::Unchanged(_) | TransitionOutcome::NotFound => Ok(false),
        }
    }

    async fn record_capture_success(&self, order: &PaymentOrder) {
        let mut transaction = PaymentTransaction::new(
            order.tenant_id,
            TransactionKind::OrderCapture,
            TransactionOutcome::Succeeded,
            order.order_id.clone(),
            order.completed_at.unwrap_or_else(Timestamp::now),
        )
        .with_external_id(order.capture_id.clone())
        .with_amount(order.amount().clone());
        if let Some(payload) = &order.raw_payload {
            transaction = transaction.with_raw_payload(payload.clone());
        }
        self.record_transaction(transaction).await;
        tracing::info!(order_id = %order.order_id, capture_id = ?order.capture_id, "Payment captured");
    }

    async fn record_transaction(&self, transaction: PaymentTransaction) {
        if let Err(e) = self.transactions.record(&transaction).await {
            tracing::warn!(reference = %transaction.reference, error = %e, "Failed to record payment transaction");
        }
    }
}
