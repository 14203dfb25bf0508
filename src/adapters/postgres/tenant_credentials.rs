//! Tenant gateway credentials stored in PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, TenantId};
use crate::ports::{GatewayCredentials, TenantCredentialStore};

pub struct PostgresTenantCredentialStore {
    pool: PgPool,
}

impl PostgresTenantCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantCredentialStore for PostgresTenantCredentialStore {
    async fn find(&self, tenant_id: &TenantId) -> Result<Option<GatewayCredentials>, DomainError> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT client_id, client_secret FROM tenant_gateway_credentials WHERE tenant_id = $1",
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("load tenant gateway credentials", e))?;

        Ok(row.map(|(client_id, client_secret)| GatewayCredentials::new(client_id, client_secret)))
    }
}
