//! PayPal gateway adapter.
//!
//! - `PayPalClient` - REST client implementing `PaymentGateway`
//! - `MockPaymentGateway` - scripted gateway for tests and local runs

mod client;
mod credentials;
mod mock;
mod retry;
mod token;
mod wire;

#[cfg(test)]
pub(crate) mod fake;

pub use client::PayPalClient;
pub use credentials::CredentialResolver;
pub use mock::MockPaymentGateway;
pub use retry::{with_retry, RetryPolicy};
pub use token::TokenCache;
