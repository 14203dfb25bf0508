//! Tenant-scoped gateway credentials.
//!
//! A tenant may bring its own gateway account; when it has none, the
//! platform's global credentials are used.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::foundation::{DomainError, TenantId};

#[derive(Clone)]
pub struct GatewayCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl GatewayCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
        }
    }
}

impl std::fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
pub trait TenantCredentialStore: Send + Sync {
    async fn find(&self, tenant_id: &TenantId) -> Result<Option<GatewayCredentials>, DomainError>;
}
