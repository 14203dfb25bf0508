//! Thin JSON client shared by the collaborator adapters.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode};

pub(super) struct ServiceClient {
    service: &'static str,
    base_url: String,
    http: reqwest::Client,
}

impl ServiceClient {
    pub(super) fn new(service: &'static str, base_url: &str, timeout: Duration) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            DomainError::new(
                ErrorCode::ConfigurationError,
                format!("Failed to build {} client: {}", service, e),
            )
        })?;

        Ok(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn unavailable(&self, err: impl std::fmt::Display) -> DomainError {
        tracing::warn!(service = self.service, error = %err, "collaborator call failed");
        DomainError::new(
            ErrorCode::ExternalServiceError,
            format!("{} request failed: {}", self.service, err),
        )
        .with_detail("service", self.service)
    }

    /// GET a resource; a 404 reads as `None`.
    pub(super) async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, DomainError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(self.unavailable(format!("GET {} returned {}", path, response.status())));
        }

        response.json().await.map(Some).map_err(|e| self.unavailable(e))
    }

    pub(super) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DomainError> {
        self.get_optional(path)
            .await?
            .ok_or_else(|| self.unavailable(format!("GET {} returned 404", path)))
    }

    pub(super) async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DomainError> {
        let response = self.send_post(path, body).await?;
        response.json().await.map_err(|e| self.unavailable(e))
    }

    /// POST where the response body is not needed.
    pub(super) async fn post_ignoring_body<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), DomainError> {
        self.send_post(path, body).await.map(|_| ())
    }

    async fn send_post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response, DomainError> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        if !response.status().is_success() {
            return Err(self.unavailable(format!("POST {} returned {}", path, response.status())));
        }
        Ok(response)
    }
}
