//! HTTP adapters - REST API implementations.

pub mod billing;
pub mod error;

pub use billing::{billing_router, billing_routes, BillingAppState};
pub use error::{ApiError, ErrorResponse};
