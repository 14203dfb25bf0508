//! Billing metrics, success-rate alerting, and gateway call metering.

mod metered_gateway;
mod metrics;
mod monitor;

pub use metered_gateway::MeteredGateway;
pub use metrics::{success_rate, BillingMetrics, MetricsSnapshot, Outcomes, GATEWAY_OPERATIONS};
pub use monitor::BillingMonitor;
