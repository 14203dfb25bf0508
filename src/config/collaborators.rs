//! Directory and notification service endpoints

use serde::Deserialize;
use std::time::Duration;

use super::error::{is_http_url, ValidationError};

#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorsConfig {
    pub directory_url: String,

    pub notification_url: String,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl CollaboratorsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.directory_url.is_empty() {
            return Err(ValidationError::MissingRequired("COLLABORATORS_DIRECTORY_URL"));
        }
        if !is_http_url(&self.directory_url) {
            return Err(ValidationError::InvalidCollaboratorUrl("directory_url"));
        }
        if self.notification_url.is_empty() {
            return Err(ValidationError::MissingRequired("COLLABORATORS_NOTIFICATION_URL"));
        }
        if !is_http_url(&self.notification_url) {
            return Err(ValidationError::InvalidCollaboratorUrl("notification_url"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(directory: &str, notification: &str) -> CollaboratorsConfig {
        CollaboratorsConfig {
            directory_url: directory.to_string(),
            notification_url: notification.to_string(),
            request_timeout_secs: 10,
        }
    }

    #[test]
    fn http_urls_pass() {
        assert!(config("http://directory:8081", "https://notify.internal").validate().is_ok());
    }

    #[test]
    fn missing_directory_is_reported() {
        assert!(matches!(
            config("", "http://notify").validate(),
            Err(ValidationError::MissingRequired("COLLABORATORS_DIRECTORY_URL"))
        ));
    }

    #[test]
    fn non_http_notification_url_is_rejected() {
        assert!(matches!(
            config("http://directory", "amqp://notify").validate(),
            Err(ValidationError::InvalidCollaboratorUrl("notification_url"))
        ));
    }
}
