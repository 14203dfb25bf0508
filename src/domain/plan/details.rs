//! Plan tier details: provider plan ids, prices, features, and limits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::{Currency, Money};

use super::{BillingCycle, PlanTier};

/// Marker for "no limit" in [`TierLimits`].
pub const UNLIMITED: i64 = -1;

/// Gateway plan ids for each billing cycle of a tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPlanIds {
    pub monthly: String,
    pub annual: String,
}

impl ProviderPlanIds {
    pub fn for_cycle(&self, cycle: BillingCycle) -> &str {
        match cycle {
            BillingCycle::Monthly => &self.monthly,
            BillingCycle::Annual => &self.annual,
        }
    }
}

/// Price per billing cycle, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclePrices {
    pub monthly: i64,
    pub annual: i64,
}

impl CyclePrices {
    pub fn for_cycle(&self, cycle: BillingCycle) -> i64 {
        match cycle {
            BillingCycle::Monthly => self.monthly,
            BillingCycle::Annual => self.annual,
        }
    }
}

/// Usage limits. `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub max_staff: i64,
    pub max_patients: i64,
    pub max_doctors: i64,
}

impl TierLimits {
    pub fn is_unlimited(limit: i64) -> bool {
        limit == UNLIMITED
    }

    /// Whether `current` existing items leave room for one more under `limit`.
    pub fn allows_another(limit: i64, current: i64) -> bool {
        Self::is_unlimited(limit) || current < limit
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTierDetails {
    pub tier: PlanTier,
    pub display_name: String,
    pub provider_plan_ids: ProviderPlanIds,
    /// Keyed by upper-case ISO currency code.
    pub prices: BTreeMap<String, CyclePrices>,
    #[serde(default)]
    pub features: Vec<String>,
    pub limits: TierLimits,
}

impl PlanTierDetails {
    pub fn price(&self, cycle: BillingCycle, currency: &Currency) -> Option<Money> {
        self.prices
            .get(currency.as_str())
            .map(|p| Money::new(p.for_cycle(cycle), currency.clone()))
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Which cycle, if any, this tier sells under `plan_id`.
    pub fn cycle_for_plan_id(&self, plan_id: &str) -> Option<BillingCycle> {
        if self.provider_plan_ids.monthly == plan_id {
            Some(BillingCycle::Monthly)
        } else if self.provider_plan_ids.annual == plan_id {
            Some(BillingCycle::Annual)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn professional() -> PlanTierDetails {
        let mut prices = BTreeMap::new();
        prices.insert("USD".to_string(), CyclePrices { monthly: 9900, annual: 99000 });
        PlanTierDetails {
            tier: PlanTier::Professional,
            display_name: "Professional".to_string(),
            provider_plan_ids: ProviderPlanIds {
                monthly: "P-PRO-M".to_string(),
                annual: "P-PRO-A".to_string(),
            },
            prices,
            features: vec!["telehealth".to_string()],
            limits: TierLimits { max_staff: 25, max_patients: UNLIMITED, max_doctors: 10 },
        }
    }

    #[test]
    fn price_is_looked_up_by_currency_and_cycle() {
        let usd = Currency::new("USD").unwrap();
        assert_eq!(professional().price(BillingCycle::Annual, &usd).unwrap().amount_minor(), 99000);
        assert!(professional().price(BillingCycle::Monthly, &Currency::new("EUR").unwrap()).is_none());
    }

    #[test]
    fn cycle_for_plan_id_matches_either_cycle() {
        assert_eq!(professional().cycle_for_plan_id("P-PRO-A"), Some(BillingCycle::Annual));
        assert_eq!(professional().cycle_for_plan_id("P-BASIC-M"), None);
    }

    #[test]
    fn unlimited_limit_always_allows_another() {
        let limits = professional().limits;
        assert!(TierLimits::allows_another(limits.max_patients, 1_000_000));
        assert!(TierLimits::allows_another(limits.max_doctors, 9));
        assert!(!TierLimits::allows_another(limits.max_doctors, 10));
    }
}
