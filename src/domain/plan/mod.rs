//! Plan module - subscription tiers and what each one includes.

mod details;
mod tier;

pub use details::{CyclePrices, PlanTierDetails, ProviderPlanIds, TierLimits, UNLIMITED};
pub use tier::{BillingCycle, PlanTier};
