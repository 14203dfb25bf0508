//! In-memory audit log and transaction log. Append-only.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::ledger::{BillingAuditLogEntry, PaymentTransaction};
use crate::ports::{BillingAuditLog, PaymentTransactionLog};

#[derive(Default)]
pub struct InMemoryBillingAuditLog {
    entries: RwLock<Vec<BillingAuditLogEntry>>,
}

impl InMemoryBillingAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl BillingAuditLog for InMemoryBillingAuditLog {
    async fn append(&self, entry: &BillingAuditLogEntry) -> Result<(), DomainError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn list_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<BillingAuditLogEntry>, DomainError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| &e.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryPaymentTransactionLog {
    transactions: RwLock<Vec<PaymentTransaction>>,
}

impl InMemoryPaymentTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentTransactionLog for InMemoryPaymentTransactionLog {
    async fn record(&self, transaction: &PaymentTransaction) -> Result<(), DomainError> {
        self.transactions.write().await.push(transaction.clone());
        Ok(())
    }

    async fn list_for_reference(&self, reference: &str) -> Result<Vec<PaymentTransaction>, DomainError> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .filter(|t| t.reference == reference)
            .cloned()
            .collect())
    }
}
