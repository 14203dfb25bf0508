//! Webhook module - inbound gateway notifications.

mod event;

pub use event::{GatewayEventKind, WebhookEnvelope};
