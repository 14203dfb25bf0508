//! Subscription commands, outcomes, and the tenant-facing read view.

use serde::Serialize;

use crate::domain::foundation::{TenantId, Timestamp};
use crate::domain::plan::{BillingCycle, PlanTier, TierLimits};
use crate::domain::subscription::{PaymentMethodSummary, Subscription, SubscriptionStatus};

#[derive(Debug, Clone)]
pub struct CreateSubscriptionCommand {
    pub tenant_id: TenantId,
    pub tier: PlanTier,
    pub cycle: BillingCycle,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedSubscriptionView {
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub approval_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanChangeOutcome {
    Applied(PlanTier),
    Scheduled { tier: PlanTier, effective_date: Timestamp },
}

/// What a webhook did to a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEventOutcome {
    Applied { subscription_id: String, status: SubscriptionStatus },
    /// The gateway cancelled, but a scheduled cancellation keeps access
    /// until its effective date.
    CancellationDeferred { subscription_id: String, until: Timestamp },
    /// Nothing to do; the reason is kept in the webhook event log.
    Ignored(String),
}

/// Counts from one reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub plan_changes_promoted: usize,
    pub cancellations_applied: usize,
    pub failures: usize,
}

/// Tenant-facing subscription state.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub plan_tier: PlanTier,
    pub billing_cycle: BillingCycle,
    pub has_access: bool,
    pub current_period_end: Option<Timestamp>,
    pub pending_plan_tier: Option<PlanTier>,
    pub pending_plan_effective_date: Option<Timestamp>,
    pub cancellation_effective_date: Option<Timestamp>,
    pub payment_method: Option<PaymentMethodSummary>,
    pub features: Vec<String>,
    pub limits: Option<TierLimits>,
}

impl SubscriptionView {
    pub fn new(subscription: &Subscription, features: Vec<String>, limits: Option<TierLimits>) -> Self {
        Self {
            subscription_id: subscription.provider_subscription_id.clone(),
            status: subscription.status,
            plan_tier: subscription.plan_tier,
            billing_cycle: subscription.billing_cycle,
            has_access: subscription.has_access(),
            current_period_end: subscription.current_period_end,
            pending_plan_tier: subscription.pending_plan_change.map(|p| p.tier),
            pending_plan_effective_date: subscription.pending_plan_change.map(|p| p.effective_date),
            cancellation_effective_date: subscription
                .cancellation
                .filter(|_| !subscription.is_canceled())
                .map(|c| c.effective_date),
            payment_method: subscription.payment_method.clone(),
            features,
            limits,
        }
    }
}
