//! Append-only ledger ports: billing audit log and payment transactions.
//!
//! Neither port exposes update or delete.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::ledger::{BillingAuditLogEntry, PaymentTransaction};

#[async_trait]
pub trait BillingAuditLog: Send + Sync {
    async fn append(&self, entry: &BillingAuditLogEntry) -> Result<(), DomainError>;

    /// Entries for a tenant, oldest first.
    async fn list_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<BillingAuditLogEntry>, DomainError>;
}

#[async_trait]
pub trait PaymentTransactionLog: Send + Sync {
    async fn record(&self, transaction: &PaymentTransaction) -> Result<(), DomainError>;

    /// Transactions for a gateway order or subscription id, oldest first.
    async fn list_for_reference(&self, reference: &str) -> Result<Vec<PaymentTransaction>, DomainError>;
}
