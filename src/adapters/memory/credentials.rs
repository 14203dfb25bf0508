//! Tenant credential store held in memory.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, TenantId};
use crate::ports::{GatewayCredentials, TenantCredentialStore};

#[derive(Default)]
pub struct InMemoryTenantCredentialStore {
    credentials: RwLock<HashMap<TenantId, GatewayCredentials>>,
}

impl InMemoryTenantCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, tenant_id: TenantId, credentials: GatewayCredentials) {
        self.credentials.write().await.insert(tenant_id, credentials);
    }
}

#[async_trait]
impl TenantCredentialStore for InMemoryTenantCredentialStore {
    async fn find(&self, tenant_id: &TenantId) -> Result<Option<GatewayCredentials>, DomainError> {
        Ok(self.credentials.read().await.get(tenant_id).cloned())
    }
}
