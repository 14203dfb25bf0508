//! Ledger module - append-only billing records.

mod audit;
mod transaction;

pub use audit::{AuditAction, BillingAuditLogEntry, SYSTEM_ACTOR, WEBHOOK_ACTOR};
pub use transaction::{PaymentTransaction, TransactionKind, TransactionOutcome};
