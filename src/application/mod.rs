//! Application layer - billing services orchestrating domain and ports.
//!
//! - `orders`: one-time consultation payments
//! - `subscriptions`: tenant plan subscriptions
//! - `webhooks`: verified gateway events, queued and dispatched once
//! - `monitoring`: metrics, success-rate sweeps, immediate alerts
//! - `scheduler`: the periodic jobs

mod errors;
pub mod monitoring;
pub mod orders;
pub mod scheduler;
mod services;
pub mod subscriptions;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use errors::BillingError;
pub use monitoring::{BillingMetrics, BillingMonitor};
pub use scheduler::{BillingScheduler, SchedulerIntervals};
pub use services::{BillingPorts, BillingServices, BillingSettings};
