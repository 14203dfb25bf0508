//! In-memory payment order repository.
//!
//! Every conditional transition runs under one write lock, which gives the
//! same single-winner guarantee as the conditional UPDATE in Postgres.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, Timestamp};
use crate::domain::payment::{CaptureDetails, PaymentOrder};
use crate::ports::{PaymentOrderRepository, TransitionOutcome};

#[derive(Default)]
pub struct InMemoryPaymentOrderRepository {
    orders: RwLock<HashMap<String, PaymentOrder>>,
}

impl InMemoryPaymentOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<PaymentOrder> {
        self.orders.read().await.values().cloned().collect()
    }
}

fn not_found(order_id: &str) -> DomainError {
    DomainError::new(ErrorCode::OrderNotFound, format!("Payment order {} not found", order_id))
        .with_detail("id", order_id)
}

#[async_trait]
impl PaymentOrderRepository for InMemoryPaymentOrderRepository {
    async fn insert(&self, order: &PaymentOrder) -> Result<(), DomainError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.order_id) {
            return Err(DomainError::new(
                ErrorCode::OrderAlreadyExists,
                format!("Payment order {} already exists", order.order_id),
            ));
        }
        orders.insert(order.order_id.clone(), order.clone());
        Ok(())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<PaymentOrder>, DomainError> {
        Ok(self.orders.read().await.get(order_id).cloned())
    }

    async fn complete_if_pending(
        &self,
        order_id: &str,
        details: &CaptureDetails,
        now: Timestamp,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(order_id) else {
            return Ok(TransitionOutcome::NotFound);
        };
        if !order.is_pending() {
            return Ok(TransitionOutcome::Unchanged(order.clone()));
        }
        order.complete(details.clone(), now)?;
        Ok(TransitionOutcome::Applied(order.clone()))
    }

    async fn fail_if_pending(
        &self,
        order_id: &str,
        reason: &str,
        now: Timestamp,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(order_id) else {
            return Ok(TransitionOutcome::NotFound);
        };
        if !order.is_pending() {
            return Ok(TransitionOutcome::Unchanged(order.clone()));
        }
        order.fail(reason, now)?;
        Ok(TransitionOutcome::Applied(order.clone()))
    }

    async fn reclaim_side_effect(
        &self,
        order_id: &str,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<Option<PaymentOrder>, DomainError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(order_id).ok_or_else(|| not_found(order_id))?;
        if !order.side_effect_reclaimable(now, now.duration_since(&stale_before)) {
            return Ok(None);
        }
        order.side_effect_claimed_at = Some(now);
        order.updated_at = now;
        Ok(Some(order.clone()))
    }

    async fn find_unfulfilled(&self, stale_before: Timestamp, limit: u32) -> Result<Vec<PaymentOrder>, DomainError> {
        let orders = self.orders.read().await;
        let mut found: Vec<PaymentOrder> = orders
            .values()
            .filter(|o| o.is_completed() && !o.has_appointment())
            .filter(|o| o.side_effect_claimed_at.map_or(true, |claimed| claimed <= stale_before))
            .cloned()
            .collect();
        found.sort_by_key(|o| o.created_at);
        found.truncate(limit as usize);
        Ok(found)
    }

    async fn release_side_effect_claim(&self, order_id: &str) -> Result<(), DomainError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(order_id).ok_or_else(|| not_found(order_id))?;
        if !order.has_appointment() {
            order.side_effect_claimed_at = None;
        }
        Ok(())
    }

    async fn attach_appointment(
        &self,
        order_id: &str,
        appointment_id: AppointmentId,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(order_id).ok_or_else(|| not_found(order_id))?;
        order.appointment_id = Some(appointment_id);
        order.updated_at = now;
        Ok(())
    }
}
