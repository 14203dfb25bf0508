//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Cannot bind to {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Gateway base URL must be an http(s) URL")]
    InvalidGatewayUrl,

    #[error("Gateway retry policy is invalid: {0}")]
    InvalidRetryPolicy(&'static str),

    #[error("Invalid settlement currency: {0}")]
    InvalidCurrency(String),

    #[error("Redirect URL must be an http(s) URL: {0}")]
    InvalidRedirectUrl(&'static str),

    #[error("Webhook worker count must be between 2 and 5")]
    InvalidWorkerCount,

    #[error("Webhook queue capacity must be positive")]
    InvalidQueueCapacity,

    #[error("Alert threshold must be between 0 and 100: {0}")]
    InvalidThreshold(&'static str),

    #[error("Interval must be positive: {0}")]
    InvalidInterval(&'static str),

    #[error("Collaborator URL must be an http(s) URL: {0}")]
    InvalidCollaboratorUrl(&'static str),
}

pub(crate) fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
