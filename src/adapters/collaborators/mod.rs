//! HTTP adapters for the clinic services billing depends on but does not own.
//!
//! - `HttpDirectoryClient` - patients, doctors, services, appointments
//! - `HttpNotificationSender` - patient confirmations and staff notices

mod directory;
mod http;
mod notifications;

pub use directory::HttpDirectoryClient;
pub use notifications::HttpNotificationSender;
