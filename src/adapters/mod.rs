//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing core to external systems:
//! - `paypal` - Gateway REST client, token cache, retry policy
//! - `postgres` - sqlx repositories for orders, subscriptions, ledger, webhooks
//! - `memory` - In-memory ports for tests and local runs
//! - `catalog` - Plan tier catalog backed by a moka cache
//! - `collaborators` - Directory and notification services over HTTP
//! - `alerting` - Alert sinks
//! - `http` - axum REST API and webhook endpoint

pub mod alerting;
pub mod catalog;
pub mod collaborators;
pub mod http;
pub mod memory;
pub mod paypal;
pub mod postgres;
