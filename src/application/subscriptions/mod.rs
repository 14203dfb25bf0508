//! Subscription Lifecycle Manager.

mod commands;
mod manager;

pub use commands::{
    CreateSubscriptionCommand, CreatedSubscriptionView, PlanChangeOutcome, ReconcileReport,
    SubscriptionEventOutcome, SubscriptionView,
};
pub use manager::{SubscriptionLifecycleManager, SubscriptionSettings};
