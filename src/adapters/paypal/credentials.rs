//! Resolves which gateway account a call runs under.

use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::GatewayConfig;
use crate::domain::foundation::TenantId;
use crate::ports::{GatewayCredentials, GatewayError, TenantCredentialStore};

/// Tenant-scoped credentials win over the platform's global account.
pub struct CredentialResolver {
    global: Option<GatewayCredentials>,
    tenants: Option<Arc<dyn TenantCredentialStore>>,
}

impl CredentialResolver {
    pub fn new(global: Option<GatewayCredentials>, tenants: Option<Arc<dyn TenantCredentialStore>>) -> Self {
        Self { global, tenants }
    }

    pub fn from_config(config: &GatewayConfig, tenants: Option<Arc<dyn TenantCredentialStore>>) -> Self {
        let global = match (&config.client_id, &config.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.expose_secret().is_empty() => {
                Some(GatewayCredentials::new(id.clone(), secret.expose_secret().clone()))
            }
            _ => None,
        };
        Self::new(global, tenants)
    }

    pub async fn for_tenant(&self, tenant_id: &TenantId) -> Result<GatewayCredentials, GatewayError> {
        if let Some(store) = &self.tenants {
            let found = store.find(tenant_id).await.map_err(|e| {
                tracing::error!(tenant_id = %tenant_id, error = %e, "Tenant credential lookup failed");
                GatewayError::network(format!("credential lookup failed: {}", e))
            })?;
            if let Some(credentials) = found {
                return Ok(credentials);
            }
        }
        self.global.clone().ok_or_else(|| {
            GatewayError::configuration(format!(
                "no gateway credentials configured for tenant {}",
                tenant_id
            ))
        })
    }

    /// Platform credentials, used where no tenant is known (webhook verification).
    pub fn platform(&self) -> Result<GatewayCredentials, GatewayError> {
        self.global
            .clone()
            .ok_or_else(|| GatewayError::configuration("platform gateway credentials are not configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryTenantCredentialStore;
    use crate::ports::GatewayErrorCode;
    use secrecy::SecretString;

    fn config_with_global() -> GatewayConfig {
        GatewayConfig {
            client_id: Some("platform-client".to_string()),
            client_secret: Some(SecretString::new("platform-secret".to_string())),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn tenant_credentials_override_global() {
        let store = Arc::new(InMemoryTenantCredentialStore::new());
        let tenant = TenantId::new();
        store
            .insert(tenant, GatewayCredentials::new("tenant-client", "tenant-secret"))
            .await;
        let resolver = CredentialResolver::from_config(&config_with_global(), Some(store));

        let resolved = resolver.for_tenant(&tenant).await.unwrap();
        assert_eq!(resolved.client_id, "tenant-client");

        let other = resolver.for_tenant(&TenantId::new()).await.unwrap();
        assert_eq!(other.client_id, "platform-client");
    }

    #[tokio::test]
    async fn missing_credentials_are_a_configuration_error() {
        let resolver = CredentialResolver::from_config(&GatewayConfig::default(), None);

        let err = resolver.for_tenant(&TenantId::new()).await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::Configuration);
        assert!(!err.retryable);
        assert!(resolver.platform().is_err());
    }

    #[test]
    fn blank_secret_does_not_count_as_configured() {
        let config = GatewayConfig {
            client_id: Some("platform-client".to_string()),
            client_secret: Some(SecretString::new(String::new())),
            ..Default::default()
        };
        assert!(CredentialResolver::from_config(&config, None).platform().is_err());
    }
}
