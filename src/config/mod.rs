//! Application configuration module
//!
//! Configuration is loaded from environment variables with the
//! `CLINIC_BILLING` prefix using the `config` and `dotenvy` crates. Nested
//! values are separated by a double underscore.
//!
//! # Example
//!
//! ```no_run
//! use clinic_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod alerting;
mod billing;
mod collaborators;
mod database;
mod error;
mod gateway;
mod scheduler;
mod server;
mod webhooks;

pub use alerting::AlertingConfig;
pub use billing::BillingConfig;
pub use collaborators::CollaboratorsConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::{GatewayConfig, GatewayMode, LIVE_BASE_URL, SANDBOX_BASE_URL};
pub use scheduler::SchedulerConfig;
pub use server::{Environment, ServerConfig};
pub use webhooks::WebhookConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`], which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub billing: BillingConfig,

    #[serde(default)]
    pub webhooks: WebhookConfig,

    #[serde(default)]
    pub alerting: AlertingConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    pub collaborators: CollaboratorsConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// - `CLINIC_BILLING__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CLINIC_BILLING__GATEWAY__CLIENT_ID=...` -> `gateway.client_id = ...`
    ///
    /// A `.env` file is read first when present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CLINIC_BILLING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gateway.validate(&self.server.environment)?;
        self.billing.validate()?;
        self.webhooks.validate()?;
        self.alerting.validate()?;
        self.scheduler.validate()?;
        self.collaborators.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "CLINIC_BILLING__DATABASE__URL",
        "CLINIC_BILLING__COLLABORATORS__DIRECTORY_URL",
        "CLINIC_BILLING__COLLABORATORS__NOTIFICATION_URL",
        "CLINIC_BILLING__SERVER__PORT",
        "CLINIC_BILLING__SERVER__ENVIRONMENT",
        "CLINIC_BILLING__GATEWAY__MODE",
        "CLINIC_BILLING__GATEWAY__CLIENT_ID",
        "CLINIC_BILLING__WEBHOOKS__WORKERS",
        "CLINIC_BILLING__BILLING__SETTLEMENT_CURRENCY",
    ];

    fn set_minimal_env() {
        env::set_var("CLINIC_BILLING__DATABASE__URL", "postgresql://test@localhost/billing");
        env::set_var("CLINIC_BILLING__COLLABORATORS__DIRECTORY_URL", "http://localhost:8081");
        env::set_var("CLINIC_BILLING__COLLABORATORS__NOTIFICATION_URL", "http://localhost:8082");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.database.url, "postgresql://test@localhost/billing");
        assert_eq!(config.collaborators.directory_url, "http://localhost:8081");
    }

    #[test]
    fn test_defaults_validate() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.gateway.mode, GatewayMode::Sandbox);
        assert_eq!(config.webhooks.workers, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CLINIC_BILLING__SERVER__PORT", "3000");
        env::set_var("CLINIC_BILLING__GATEWAY__MODE", "live");
        env::set_var("CLINIC_BILLING__BILLING__SETTLEMENT_CURRENCY", "EUR");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.gateway.base_url(), LIVE_BASE_URL);
        assert_eq!(config.billing.settlement_currency, "EUR");
    }

    #[test]
    fn test_production_without_gateway_credentials_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CLINIC_BILLING__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_database_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("CLINIC_BILLING__COLLABORATORS__DIRECTORY_URL", "http://localhost:8081");
        env::set_var("CLINIC_BILLING__COLLABORATORS__NOTIFICATION_URL", "http://localhost:8082");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }
}
