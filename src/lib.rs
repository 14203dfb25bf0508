//! Clinic Billing - payment and subscription lifecycle engine for a
//! multi-tenant clinic platform.
//!
//! Patients pay for virtual consultations through one-time gateway orders;
//! clinics pay for their plan through recurring gateway subscriptions. The
//! crate follows a hexagonal layout: `domain` holds the billing model,
//! `ports` the contracts, `adapters` the PayPal, PostgreSQL, and HTTP
//! implementations, and `application` the services that tie them together.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
