//! OAuth access-token cache.
//!
//! One slot per credential set (keyed by client id). Each slot sits behind
//! its own async mutex, so concurrent callers that find an expiring token
//! wait for a single refresh and then share its result. A rotated secret
//! replaces the slot along with the token minted under the old one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::wire::TokenResponse;
use crate::ports::{GatewayCredentials, GatewayError};

const TOKEN_PATH: &str = "/v1/oauth2/token";

struct CachedToken {
    access_token: SecretString,
    expires_at: Instant,
}

impl CachedToken {
    fn is_usable(&self, margin: Duration) -> bool {
        Instant::now() + margin < self.expires_at
    }
}

struct TokenSlot {
    credentials: GatewayCredentials,
    token: Mutex<Option<CachedToken>>,
}

pub struct TokenCache {
    http: reqwest::Client,
    base_url: String,
    refresh_margin: Duration,
    slots: Mutex<HashMap<String, Arc<TokenSlot>>>,
}

impl TokenCache {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, refresh_margin: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            refresh_margin,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Bearer token for the credential set, fetching a new one when the
    /// cached token is missing or inside the refresh margin.
    pub async fn access_token(&self, credentials: &GatewayCredentials) -> Result<SecretString, GatewayError> {
        let slot = self.slot(credentials).await;
        let mut token = slot.token.lock().await;
        if let Some(cached) = token.as_ref().filter(|t| t.is_usable(self.refresh_margin)) {
            return Ok(cached.access_token.clone());
        }

        let fresh = self.fetch(&slot.credentials).await?;
        let access_token = fresh.access_token.clone();
        *token = Some(fresh);
        Ok(access_token)
    }

    /// Drop a token the gateway rejected so the next call fetches anew.
    pub async fn invalidate(&self, client_id: &str) {
        let slot = self.slots.lock().await.get(client_id).cloned();
        if let Some(slot) = slot {
            *slot.token.lock().await = None;
        }
    }

    /// Refresh every cached token that expires within `horizon` plus the
    /// refresh margin. Returns how many tokens were replaced.
    pub async fn refresh_expiring(&self, horizon: Duration) -> Result<usize, GatewayError> {
        let slots: Vec<Arc<TokenSlot>> = self.slots.lock().await.values().cloned().collect();
        let mut refreshed = 0;
        for slot in slots {
            let mut token = slot.token.lock().await;
            let due = token
                .as_ref()
                .map_or(true, |t| !t.is_usable(self.refresh_margin + horizon));
            if due {
                *token = Some(self.fetch(&slot.credentials).await?);
                refreshed += 1;
            }
        }
        Ok(refreshed)
    }

    async fn slot(&self, credentials: &GatewayCredentials) -> Arc<TokenSlot> {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get(&credentials.client_id) {
            if slot.credentials.client_secret.expose_secret() == credentials.client_secret.expose_secret() {
                return slot.clone();
            }
            tracing::info!(client_id = %credentials.client_id, "Gateway client secret rotated, dropping cached token");
        }
        let slot = Arc::new(TokenSlot {
            credentials: credentials.clone(),
            token: Mutex::new(None),
        });
        slots.insert(credentials.client_id.clone(), slot.clone());
        slot
    }

    async fn fetch(&self, credentials: &GatewayCredentials) -> Result<CachedToken, GatewayError> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        let response = self
            .http
            .post(&url)
            .basic_auth(&credentials.client_id, Some(credentials.client_secret.expose_secret()))
            .header("Accept", "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(super::client::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, client_id = %credentials.client_id, "Gateway token request rejected");
            return Err(GatewayError::from_status(
                status.as_u16(),
                format!("token request failed: {}", body),
            ));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::invalid_response(format!("token response: {}", e)))?;

        tracing::debug!(client_id = %credentials.client_id, expires_in = token.expires_in, "Gateway access token refreshed");
        Ok(CachedToken {
            access_token: SecretString::new(token.access_token),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::paypal::fake::FakeGateway;

    fn credentials() -> GatewayCredentials {
        GatewayCredentials::new("platform-client", "platform-secret")
    }

    #[tokio::test]
    async fn token_is_fetched_once_and_reused() {
        let fake = FakeGateway::start().await;
        let cache = TokenCache::new(reqwest::Client::new(), fake.base_url(), Duration::from_secs(300));

        let first = cache.access_token(&credentials()).await.unwrap();
        let second = cache.access_token(&credentials()).await.unwrap();

        assert_eq!(first.expose_secret(), second.expose_secret());
        assert_eq!(fake.token_requests(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let fake = FakeGateway::start().await;
        let cache = Arc::new(TokenCache::new(
            reqwest::Client::new(),
            fake.base_url(),
            Duration::from_secs(300),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.access_token(&credentials()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(fake.token_requests(), 1);
    }

    #[tokio::test]
    async fn token_inside_margin_is_refetched() {
        let fake = FakeGateway::start().await;
        fake.set_token_lifetime(200);
        let cache = TokenCache::new(reqwest::Client::new(), fake.base_url(), Duration::from_secs(300));

        cache.access_token(&credentials()).await.unwrap();
        cache.access_token(&credentials()).await.unwrap();

        assert_eq!(fake.token_requests(), 2);
    }

    #[tokio::test]
    async fn each_credential_set_has_its_own_token() {
        let fake = FakeGateway::start().await;
        let cache = TokenCache::new(reqwest::Client::new(), fake.base_url(), Duration::from_secs(300));

        let platform = cache.access_token(&credentials()).await.unwrap();
        let tenant = cache
            .access_token(&GatewayCredentials::new("tenant-client", "tenant-secret"))
            .await
            .unwrap();

        assert_ne!(platform.expose_secret(), tenant.expose_secret());
        assert_eq!(fake.token_requests(), 2);
    }

    #[tokio::test]
    async fn rotated_secret_fetches_a_new_token_with_it() {
        let fake = FakeGateway::start().await;
        let cache = TokenCache::new(reqwest::Client::new(), fake.base_url(), Duration::from_secs(300));

        let before = cache.access_token(&credentials()).await.unwrap();
        let rotated = GatewayCredentials::new("platform-client", "rotated-secret");
        let after = cache.access_token(&rotated).await.unwrap();
        cache.access_token(&rotated).await.unwrap();

        assert_ne!(before.expose_secret(), after.expose_secret());
        assert_eq!(fake.token_requests(), 2);
        let authorizations = fake.token_authorizations();
        assert_ne!(authorizations[0], authorizations[1]);
    }

    #[tokio::test]
    async fn rejected_credentials_surface_authentication_error() {
        let fake = FakeGateway::start().await;
        fake.reject_tokens();
        let cache = TokenCache::new(reqwest::Client::new(), fake.base_url(), Duration::from_secs(300));

        let err = cache
            .access_token(&GatewayCredentials::new("platform-client", "wrong"))
            .await
            .unwrap_err();

        assert_eq!(err.code, crate::ports::GatewayErrorCode::Authentication);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn refresh_expiring_replaces_tokens_inside_horizon() {
        let fake = FakeGateway::start().await;
        fake.set_token_lifetime(3_600);
        let cache = TokenCache::new(reqwest::Client::new(), fake.base_url(), Duration::from_secs(300));
        cache.access_token(&credentials()).await.unwrap();

        assert_eq!(cache.refresh_expiring(Duration::from_secs(60)).await.unwrap(), 0);
        assert_eq!(cache.refresh_expiring(Duration::from_secs(3_600)).await.unwrap(), 1);
        assert_eq!(fake.token_requests(), 2);
    }

    #[tokio::test]
    async fn invalidated_token_is_refetched() {
        let fake = FakeGateway::start().await;
        let cache = TokenCache::new(reqwest::Client::new(), fake.base_url(), Duration::from_secs(300));

        cache.access_token(&credentials()).await.unwrap();
        cache.invalidate("platform-client").await;
        cache.access_token(&credentials()).await.unwrap();

        assert_eq!(fake.token_requests(), 2);
    }
}
