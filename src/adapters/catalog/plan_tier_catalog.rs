//! Plan tier catalog backed by a moka cache.
//!
//! The table itself is small and read-mostly. Lookups go through a
//! concurrent TTL cache keyed by query, and every key carries the table
//! generation so a reload can never be shadowed by a value computed from the
//! previous table.

use moka::sync::Cache;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;

use crate::domain::plan::{BillingCycle, PlanTier, PlanTierDetails};
use crate::ports::PlanCatalog;

/// Catalog shipped with the binary.
pub const DEFAULT_PLANS_YAML: &str = include_str!("../../../config/plans.yaml");

const MAX_CACHED_QUERIES: u64 = 1_000;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read plan catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse plan catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid plan catalog: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    tiers: Vec<PlanTierDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Query {
    Tier(PlanTier),
    All,
    PlanId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    generation: u64,
    query: Query,
}

#[derive(Debug, Clone)]
enum Cached {
    Tier(Option<PlanTierDetails>),
    All(Vec<PlanTierDetails>),
    Resolved(Option<(PlanTier, BillingCycle)>),
}

pub struct PlanTierCatalog {
    table: RwLock<Arc<Vec<PlanTierDetails>>>,
    generation: AtomicU64,
    cache: Cache<CacheKey, Cached>,
}

impl PlanTierCatalog {
    pub fn new(tiers: Vec<PlanTierDetails>, ttl: Duration) -> Result<Self, CatalogError> {
        validate(&tiers)?;
        Ok(Self {
            table: RwLock::new(Arc::new(sorted(tiers))),
            generation: AtomicU64::new(0),
            cache: Cache::builder()
                .max_capacity(MAX_CACHED_QUERIES)
                .time_to_live(ttl)
                .build(),
        })
    }

    /// The catalog compiled into the binary.
    pub fn embedded(ttl: Duration) -> Result<Self, CatalogError> {
        Self::from_yaml_str(DEFAULT_PLANS_YAML, ttl)
    }

    pub fn from_yaml_str(yaml: &str, ttl: Duration) -> Result<Self, CatalogError> {
        Self::new(parse(yaml)?, ttl)
    }

    pub fn from_path(path: impl AsRef<Path>, ttl: Duration) -> Result<Self, CatalogError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml, ttl)
    }

    /// Swap in a new table. Invalid tables are rejected and the current one
    /// stays in place.
    pub fn reload(&self, tiers: Vec<PlanTierDetails>) -> Result<(), CatalogError> {
        validate(&tiers)?;
        {
            let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
            *table = Arc::new(sorted(tiers));
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        self.cache.invalidate_all();
        tracing::info!("Plan catalog reloaded");
        Ok(())
    }

    pub fn reload_from_path(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let yaml = std::fs::read_to_string(path)?;
        self.reload(parse(&yaml)?)
    }

    fn snapshot(&self) -> (u64, Arc<Vec<PlanTierDetails>>) {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        (self.generation.load(Ordering::SeqCst), table.clone())
    }

    fn lookup(&self, query: Query, compute: impl FnOnce(&[PlanTierDetails]) -> Cached) -> Cached {
        let (generation, table) = self.snapshot();
        let key = CacheKey { generation, query };
        self.cache.get_with(key, || compute(&table))
    }
}

impl PlanCatalog for PlanTierCatalog {
    fn tier_details(&self, tier: PlanTier) -> Option<PlanTierDetails> {
        match self.lookup(Query::Tier(tier), |table| {
            Cached::Tier(table.iter().find(|d| d.tier == tier).cloned())
        }) {
            Cached::Tier(details) => details,
            _ => None,
        }
    }

    fn available_tiers(&self) -> Vec<PlanTierDetails> {
        match self.lookup(Query::All, |table| Cached::All(table.to_vec())) {
            Cached::All(tiers) => tiers,
            _ => Vec::new(),
        }
    }

    fn resolve_tier_by_provider_plan_id(&self, plan_id: &str) -> Option<(PlanTier, BillingCycle)> {
        match self.lookup(Query::PlanId(plan_id.to_string()), |table| {
            Cached::Resolved(
                table
                    .iter()
                    .find_map(|d| d.cycle_for_plan_id(plan_id).map(|c| (d.tier, c))),
            )
        }) {
            Cached::Resolved(resolved) => resolved,
            _ => None,
        }
    }
}

fn parse(yaml: &str) -> Result<Vec<PlanTierDetails>, CatalogError> {
    let file: CatalogFile = serde_yaml::from_str(yaml)?;
    Ok(file.tiers)
}

fn sorted(mut tiers: Vec<PlanTierDetails>) -> Vec<PlanTierDetails> {
    tiers.sort_by_key(|d| d.tier);
    tiers
}

fn validate(tiers: &[PlanTierDetails]) -> Result<(), CatalogError> {
    if tiers.is_empty() {
        return Err(CatalogError::Invalid("catalog defines no tiers".to_string()));
    }

    let mut seen_tiers = HashSet::new();
    let mut seen_plan_ids = HashSet::new();
    for details in tiers {
        if !seen_tiers.insert(details.tier) {
            return Err(CatalogError::Invalid(format!("tier {} defined twice", details.tier)));
        }
        for cycle in [BillingCycle::Monthly, BillingCycle::Annual] {
            let plan_id = details.provider_plan_ids.for_cycle(cycle);
            if plan_id.trim().is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "tier {} has no {} plan id",
                    details.tier,
                    cycle.as_str()
                )));
            }
            if !seen_plan_ids.insert(plan_id.to_string()) {
                return Err(CatalogError::Invalid(format!("plan id {} is used twice", plan_id)));
            }
        }
        if details.prices.is_empty() {
            return Err(CatalogError::Invalid(format!("tier {} has no prices", details.tier)));
        }
        for (currency, prices) in &details.prices {
            if prices.monthly <= 0 || prices.annual <= 0 {
                return Err(CatalogError::Invalid(format!(
                    "tier {} has a non-positive {} price",
                    details.tier, currency
                )));
            }
        }
    }
    Ok(())
}
