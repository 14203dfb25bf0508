//! Payment order persistence port.
//!
//! The conditional status updates here are the single decision point for
//! capture idempotency: whichever caller's `complete_if_pending` returns
//! [`TransitionOutcome::Applied`] owns the appointment side effect.

use async_trait::async_trait;

use crate::domain::foundation::{AppointmentId, DomainError, Timestamp};
use crate::domain::payment::{CaptureDetails, PaymentOrder};

/// Result of a conditional status update.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// This call moved the order; carries the updated order.
    Applied(PaymentOrder),
    /// The order was not PENDING; carries it as found.
    Unchanged(PaymentOrder),
    NotFound,
}

#[async_trait]
pub trait PaymentOrderRepository: Send + Sync {
    /// Insert a new order. Fails with `OrderAlreadyExists` on a duplicate gateway order id.
    async fn insert(&self, order: &PaymentOrder) -> Result<(), DomainError>;

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<PaymentOrder>, DomainError>;

    /// Atomically PENDING → COMPLETED, recording capture details and taking
    /// the side-effect claim at `now`.
    async fn complete_if_pending(
        &self,
        order_id: &str,
        details: &CaptureDetails,
        now: Timestamp,
    ) -> Result<TransitionOutcome, DomainError>;

    /// Atomically PENDING → FAILED.
    async fn fail_if_pending(
        &self,
        order_id: &str,
        reason: &str,
        now: Timestamp,
    ) -> Result<TransitionOutcome, DomainError>;

    /// Take over a COMPLETED order's side effect when no appointment exists
    /// and the previous claim is missing or older than `stale_before`.
    /// Returns the order if the claim was acquired.
    async fn reclaim_side_effect(
        &self,
        order_id: &str,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<Option<PaymentOrder>, DomainError>;

    /// COMPLETED orders with no appointment whose claim is missing or older
    /// than `stale_before`, oldest first.
    async fn find_unfulfilled(&self, stale_before: Timestamp, limit: u32) -> Result<Vec<PaymentOrder>, DomainError>;

    /// Drop the side-effect claim so a later delivery can retry.
    async fn release_side_effect_claim(&self, order_id: &str) -> Result<(), DomainError>;

    /// Record the appointment; once set, the side effect is done.
    async fn attach_appointment(
        &self,
        order_id: &str,
        appointment_id: AppointmentId,
        now: Timestamp,
    ) -> Result<(), DomainError>;
}
