//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, money, timestamps, errors)
//! - `payment` - One-off consultation payment orders
//! - `subscription` - Tenant subscription lifecycle
//! - `plan` - Plan tiers, prices, and limits
//! - `ledger` - Append-only audit and transaction records
//! - `webhook` - Gateway webhook envelopes and event kinds

pub mod foundation;
pub mod ledger;
pub mod payment;
pub mod plan;
pub mod subscription;
pub mod webhook;
