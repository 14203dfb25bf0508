//! Plan catalog port. Read-only, in-process, and synchronous.

use crate::domain::foundation::{Currency, Money};
use crate::domain::plan::{BillingCycle, PlanTier, PlanTierDetails, TierLimits};

pub trait PlanCatalog: Send + Sync {
    fn tier_details(&self, tier: PlanTier) -> Option<PlanTierDetails>;

    /// Tiers in catalog order (cheapest first).
    fn available_tiers(&self) -> Vec<PlanTierDetails>;

    fn provider_plan_id(&self, tier: PlanTier, cycle: BillingCycle) -> Option<String> {
        self.tier_details(tier)
            .map(|d| d.provider_plan_ids.for_cycle(cycle).to_string())
    }

    /// Reverse lookup of a gateway plan id, used when webhooks report a
    /// plan change made on the gateway side.
    fn resolve_tier_by_provider_plan_id(&self, plan_id: &str) -> Option<(PlanTier, BillingCycle)> {
        self.available_tiers()
            .into_iter()
            .find_map(|d| d.cycle_for_plan_id(plan_id).map(|c| (d.tier, c)))
    }

    fn price(&self, tier: PlanTier, cycle: BillingCycle, currency: &Currency) -> Option<Money> {
        self.tier_details(tier).and_then(|d| d.price(cycle, currency))
    }

    fn features(&self, tier: PlanTier) -> Vec<String> {
        self.tier_details(tier).map(|d| d.features).unwrap_or_default()
    }

    fn limits(&self, tier: PlanTier) -> Option<TierLimits> {
        self.tier_details(tier).map(|d| d.limits)
    }
}
