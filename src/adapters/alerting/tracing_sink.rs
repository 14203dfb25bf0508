//! Emits alerts as structured log events.
//!
//! Log shipping picks these up by `alert_kind`; CRITICAL and HIGH go out at
//! `error`, the rest at `warn`.

use async_trait::async_trait;

use crate::ports::{Alert, AlertSeverity, AlertSink};

#[derive(Debug, Clone, Default)]
pub struct TracingAlertSink;

impl TracingAlertSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn raise(&self, alert: Alert) {
        let context = serde_json::to_string(&alert.context).unwrap_or_default();
        match alert.severity {
            AlertSeverity::Critical | AlertSeverity::High => tracing::error!(
                alert_kind = alert.kind.as_str(),
                severity = alert.severity.as_str(),
                context = %context,
                raised_at = %alert.raised_at.as_datetime().to_rfc3339(),
                "{}",
                alert.message
            ),
            AlertSeverity::Medium | AlertSeverity::Low => tracing::warn!(
                alert_kind = alert.kind.as_str(),
                severity = alert.severity.as_str(),
                context = %context,
                raised_at = %alert.raised_at.as_datetime().to_rfc3339(),
                "{}",
                alert.message
            ),
        }
    }
}
