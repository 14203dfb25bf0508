//! Plan tier catalog loaded from YAML and served through a moka cache.

mod plan_tier_catalog;

pub use plan_tier_catalog::{CatalogError, PlanTierCatalog, DEFAULT_PLANS_YAML};
