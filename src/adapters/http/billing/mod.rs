//! HTTP adapter for billing endpoints.
//!
//! - `POST /api/tenants/:tenant_id/orders` - Create a consultation payment order
//! - `POST /api/tenants/:tenant_id/orders/:order_id/capture` - Capture it
//! - `GET|POST /api/tenants/:tenant_id/subscription` - Read or open a subscription
//! - `POST /api/tenants/:tenant_id/subscription/plan-change`
//! - `POST /api/tenants/:tenant_id/subscription/cancel`
//! - `GET /api/plans` - Plan catalog
//! - `POST /webhooks/paypal` - Gateway webhooks
//! - `GET /metrics`, `GET /health`

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::BillingAppState;
pub use routes::{billing_router, billing_routes};
