//! Subscription aggregate - a clinic tenant's recurring plan.
//!
//! Status changes go through [`SubscriptionStatus`]. Plan changes and
//! cancellations can be deferred to a future date; nothing here reads the
//! clock, callers pass `now`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, StateMachine, SubscriptionId, TenantId, Timestamp,
};
use crate::domain::plan::{BillingCycle, PlanTier};

use super::SubscriptionStatus;

/// A tier change that takes effect on `effective_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPlanChange {
    pub tier: PlanTier,
    pub effective_date: Timestamp,
}

/// A cancellation requested now that takes effect later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledCancellation {
    pub requested_at: Timestamp,
    pub effective_date: Timestamp,
}

/// Display-safe description of the payment method on file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodSummary {
    pub method_type: String,
    /// Masked account, e.g. last four digits or an obfuscated email.
    pub mask: Option<String>,
}

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationOutcome {
    Immediate,
    Scheduled(Timestamp),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub tenant_id: TenantId,
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub plan_tier: PlanTier,
    pub billing_cycle: BillingCycle,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub pending_plan_change: Option<PendingPlanChange>,
    pub cancellation: Option<ScheduledCancellation>,
    pub payment_method: Option<PaymentMethodSummary>,
    pub last_payment_at: Option<Timestamp>,
    pub failed_payment_count: u32,
    /// Optimistic concurrency token, bumped by the repository on every update.
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub canceled_at: Option<Timestamp>,
}

impl Subscription {
    /// A subscription the gateway created and the tenant still has to approve.
    pub fn create_pending(
        tenant_id: TenantId,
        provider_subscription_id: impl Into<String>,
        plan_tier: PlanTier,
        billing_cycle: BillingCycle,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let provider_subscription_id = provider_subscription_id.into();
        if provider_subscription_id.trim().is_empty() {
            return Err(DomainError::validation(
                "provider_subscription_id",
                "Gateway subscription id is required",
            ));
        }

        Ok(Self {
            id: SubscriptionId::new(),
            tenant_id,
            provider_subscription_id,
            status: SubscriptionStatus::PendingApproval,
            plan_tier,
            billing_cycle,
            current_period_start: None,
            current_period_end: None,
            pending_plan_change: None,
            cancellation: None,
            payment_method: None,
            last_payment_at: None,
            failed_payment_count: 0,
            version: 0,
            created_at: now,
            updated_at: now,
            canceled_at: None,
        })
    }

    pub fn is_canceled(&self) -> bool {
        self.status == SubscriptionStatus::Canceled
    }

    pub fn has_access(&self) -> bool {
        self.status.has_access()
    }

    /// True while a cancellation is scheduled but not yet effective.
    pub fn cancellation_pending(&self, now: Timestamp) -> bool {
        !self.is_canceled()
            && self
                .cancellation
                .map(|c| c.effective_date.is_after(&now))
                .unwrap_or(false)
    }

    /// Tenant approved the subscription, or the gateway re-activated it.
    pub fn activate(&mut self, now: Timestamp, next_billing: Option<Timestamp>) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        let start = self.current_period_start.unwrap_or(now);
        self.current_period_start = Some(start);
        self.current_period_end = Some(next_billing.unwrap_or_else(|| self.period_end_from(start)));
        self.failed_payment_count = 0;
        self.updated_at = now;
        Ok(())
    }

    /// A recurring payment cleared: start the next period.
    pub fn record_renewal_payment(
        &mut self,
        paid_at: Timestamp,
        next_billing: Option<Timestamp>,
    ) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        // The first charge after approval confirms the activated period.
        // Every later charge pays for the period after the stored one, even
        // when the gateway bills a little before the boundary.
        let (start, expected_end) = match (self.last_payment_at, self.current_period_start, self.current_period_end) {
            (None, Some(start), Some(end)) if end.is_after(&paid_at) => (start, end),
            (_, _, Some(end)) => (end, self.period_end_from(end)),
            _ => (paid_at, self.period_end_from(paid_at)),
        };
        let end = next_billing.filter(|next| next.is_after(&start)).unwrap_or(expected_end);
        self.current_period_start = Some(start);
        self.current_period_end = Some(end);
        self.last_payment_at = Some(paid_at);
        self.failed_payment_count = 0;
        self.updated_at = paid_at;
        Ok(())
    }

    /// Replaces the payment method on file. Returns whether it changed.
    pub fn record_payment_method(&mut self, method: PaymentMethodSummary, now: Timestamp) -> bool {
        if self.payment_method.as_ref() == Some(&method) {
            return false;
        }
        self.payment_method = Some(method);
        self.updated_at = now;
        true
    }

    pub fn mark_past_due(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::PastDue)?;
        self.failed_payment_count += 1;
        self.updated_at = now;
        Ok(())
    }

    pub fn suspend(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Suspended)?;
        self.updated_at = now;
        Ok(())
    }

    /// Cancels immediately. Any deferred plan change is dropped.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Canceled)?;
        self.pending_plan_change = None;
        self.canceled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn change_plan_now(&mut self, tier: PlanTier, now: Timestamp) -> Result<(), DomainError> {
        self.ensure_not_canceled("change plan")?;
        self.plan_tier = tier;
        self.pending_plan_change = None;
        self.updated_at = now;
        Ok(())
    }

    /// Defers a tier change to the end of the current period, or one billing
    /// cycle from now when the period end is unknown or already past.
    pub fn schedule_plan_change(&mut self, tier: PlanTier, now: Timestamp) -> Result<Timestamp, DomainError> {
        self.ensure_not_canceled("schedule plan change")?;
        let effective_date = match self.current_period_end {
            Some(end) if end.is_after(&now) => end,
            _ => now.add_months(self.billing_cycle.months()),
        };
        self.pending_plan_change = Some(PendingPlanChange { tier, effective_date });
        self.updated_at = now;
        Ok(effective_date)
    }

    /// Applies the pending tier once its date has passed. Returns the new tier.
    pub fn promote_due_plan_change(&mut self, now: Timestamp) -> Option<PlanTier> {
        let pending = self.pending_plan_change?;
        if self.is_canceled() || pending.effective_date.is_after(&now) {
            return None;
        }
        self.plan_tier = pending.tier;
        self.pending_plan_change = None;
        self.updated_at = now;
        Some(pending.tier)
    }

    /// Records a cancellation request. Defaults to the end of the current
    /// period; a date that is not in the future cancels right away.
    pub fn schedule_cancellation(
        &mut self,
        effective_date: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<CancellationOutcome, DomainError> {
        self.ensure_not_canceled("cancel")?;
        let effective_date = effective_date.or(self.current_period_end).unwrap_or(now);
        self.cancellation = Some(ScheduledCancellation {
            requested_at: now,
            effective_date,
        });

        if effective_date.is_after(&now) {
            self.updated_at = now;
            Ok(CancellationOutcome::Scheduled(effective_date))
        } else {
            self.cancel(now)?;
            Ok(CancellationOutcome::Immediate)
        }
    }

    /// Flips to CANCELED once a scheduled cancellation's date has passed.
    pub fn apply_due_cancellation(&mut self, now: Timestamp) -> Result<bool, DomainError> {
        match self.cancellation {
            Some(c) if !self.is_canceled() && !c.effective_date.is_after(&now) => {
                self.cancel(now)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// JSON snapshot for audit before/after columns.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn period_end_from(&self, start: Timestamp) -> Timestamp {
        start.add_months(self.billing_cycle.months())
    }

    fn ensure_not_canceled(&self, action: &str) -> Result<(), DomainError> {
        if self.is_canceled() {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot {} on a canceled subscription", action),
            )
            .with_detail("current", self.status.as_str())
            .with_detail("attempted", action));
        }
        Ok(())
    }

    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription {} from {} to {}",
                    self.provider_subscription_id, self.status, target
                ),
            )
            .with_detail("current", self.status.as_str())
            .with_detail("attempted", target.as_str())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
    }

    fn pending() -> Subscription {
        Subscription::create_pending(
            TenantId::new(),
            "I-BW452GLLEP1G",
            PlanTier::Basic,
            BillingCycle::Monthly,
            at(2024, 1, 1),
        )
        .unwrap()
    }

    fn active() -> Subscription {
        let mut sub = pending();
        sub.activate(at(2024, 1, 1), None).unwrap();
        sub
    }

    #[test]
    fn create_pending_requires_provider_id() {
        let result = Subscription::create_pending(
            TenantId::new(),
            "",
            PlanTier::Basic,
            BillingCycle::Monthly,
            at(2024, 1, 1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn activate_opens_first_period() {
        let sub = active();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.current_period_start, Some(at(2024, 1, 1)));
        assert_eq!(sub.current_period_end, Some(at(2024, 2, 1)));
    }

    #[test]
    fn activate_prefers_gateway_next_billing_time() {
        let mut sub = pending();
        sub.activate(at(2024, 1, 1), Some(at(2024, 1, 31))).unwrap();
        assert_eq!(sub.current_period_end, Some(at(2024, 1, 31)));
    }

    #[test]
    fn renewal_rolls_period_forward_from_previous_end() {
        let mut sub = active();
        sub.record_renewal_payment(at(2024, 2, 1), None).unwrap();
        assert_eq!(sub.current_period_start, Some(at(2024, 2, 1)));
        assert_eq!(sub.current_period_end, Some(at(2024, 3, 1)));
        assert_eq!(sub.last_payment_at, Some(at(2024, 2, 1)));
    }

    #[test]
    fn first_charge_confirms_activated_period() {
        let mut sub = active();
        sub.record_renewal_payment(at(2024, 1, 1), None).unwrap();
        assert_eq!(sub.current_period_start, Some(at(2024, 1, 1)));
        assert_eq!(sub.current_period_end, Some(at(2024, 2, 1)));
    }

    #[test]
    fn renewal_billed_before_period_end_still_extends() {
        let mut sub = active();
        sub.record_renewal_payment(at(2024, 1, 1), None).unwrap();
        let early = Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 2, 1, 11, 0, 0).unwrap());

        sub.record_renewal_payment(early, None).unwrap();

        assert_eq!(sub.current_period_start, Some(at(2024, 2, 1)));
        assert_eq!(sub.current_period_end, Some(at(2024, 3, 1)));
        assert_eq!(
            sub.schedule_cancellation(None, at(2024, 2, 2)).unwrap(),
            CancellationOutcome::Scheduled(at(2024, 3, 1))
        );
    }

    #[test]
    fn renewal_uses_gateway_next_billing_time() {
        let mut sub = active();
        sub.record_renewal_payment(at(2024, 2, 1), Some(at(2024, 3, 2))).unwrap();
        assert_eq!(sub.current_period_end, Some(at(2024, 3, 2)));
    }

    #[test]
    fn renewal_recovers_past_due() {
        let mut sub = active();
        sub.mark_past_due(at(2024, 2, 1)).unwrap();
        assert_eq!(sub.failed_payment_count, 1);

        sub.record_renewal_payment(at(2024, 2, 3), None).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.failed_payment_count, 0);
    }

    #[test]
    fn pending_approval_cannot_be_suspended() {
        let mut sub = pending();
        let err = sub.suspend(at(2024, 1, 2)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert_eq!(sub.status, SubscriptionStatus::PendingApproval);
    }

    #[test]
    fn scheduled_plan_change_waits_for_period_end() {
        let mut sub = active();
        let effective = sub.schedule_plan_change(PlanTier::Professional, at(2024, 1, 10)).unwrap();
        assert_eq!(effective, at(2024, 2, 1));
        assert_eq!(sub.plan_tier, PlanTier::Basic);

        assert_eq!(sub.promote_due_plan_change(at(2024, 1, 31)), None);
        assert_eq!(sub.plan_tier, PlanTier::Basic);

        assert_eq!(sub.promote_due_plan_change(at(2024, 2, 1)), Some(PlanTier::Professional));
        assert_eq!(sub.plan_tier, PlanTier::Professional);
        assert!(sub.pending_plan_change.is_none());
    }

    #[test]
    fn plan_change_without_known_period_defers_one_cycle() {
        let mut sub = pending();
        let effective = sub.schedule_plan_change(PlanTier::Enterprise, at(2024, 1, 5)).unwrap();
        assert_eq!(effective, at(2024, 2, 5));
    }

    #[test]
    fn immediate_plan_change_clears_pending_change() {
        let mut sub = active();
        sub.schedule_plan_change(PlanTier::Professional, at(2024, 1, 10)).unwrap();
        sub.change_plan_now(PlanTier::Enterprise, at(2024, 1, 11)).unwrap();
        assert_eq!(sub.plan_tier, PlanTier::Enterprise);
        assert!(sub.pending_plan_change.is_none());
    }

    #[test]
    fn scheduled_cancellation_keeps_access_until_effective_date() {
        let mut sub = active();
        let outcome = sub.schedule_cancellation(None, at(2024, 1, 10)).unwrap();
        assert_eq!(outcome, CancellationOutcome::Scheduled(at(2024, 2, 1)));
        assert!(sub.has_access());
        assert!(sub.cancellation_pending(at(2024, 1, 20)));

        assert!(!sub.apply_due_cancellation(at(2024, 1, 31)).unwrap());
        assert!(sub.apply_due_cancellation(at(2024, 2, 1)).unwrap());
        assert!(sub.is_canceled());
        assert!(!sub.has_access());
    }

    #[test]
    fn cancellation_dated_in_the_past_is_immediate() {
        let mut sub = active();
        let outcome = sub.schedule_cancellation(Some(at(2024, 1, 9)), at(2024, 1, 10)).unwrap();
        assert_eq!(outcome, CancellationOutcome::Immediate);
        assert!(sub.is_canceled());
        assert_eq!(sub.canceled_at, Some(at(2024, 1, 10)));
    }

    #[test]
    fn cancel_drops_pending_plan_change() {
        let mut sub = active();
        sub.schedule_plan_change(PlanTier::Professional, at(2024, 1, 10)).unwrap();
        sub.cancel(at(2024, 1, 11)).unwrap();
        assert!(sub.pending_plan_change.is_none());
    }

    #[test]
    fn canceled_subscription_rejects_plan_changes() {
        let mut sub = active();
        sub.cancel(at(2024, 1, 11)).unwrap();
        assert!(sub.change_plan_now(PlanTier::Enterprise, at(2024, 1, 12)).is_err());
        assert!(sub.schedule_cancellation(None, at(2024, 1, 12)).is_err());
    }

    #[test]
    fn snapshot_serializes_status_in_wire_form() {
        let snapshot = active().snapshot();
        assert_eq!(snapshot["status"], "ACTIVE");
        assert_eq!(snapshot["plan_tier"], "basic");
    }
}
