//! In-memory alert sink that keeps every alert, for tests and local runs.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::ports::{Alert, AlertKind, AlertSink};

#[derive(Debug, Clone, Default)]
pub struct RecordingAlertSink {
    alerts: Arc<Mutex<Vec<Alert>>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<AlertKind> {
        self.alerts().into_iter().map(|a| a.kind).collect()
    }

    pub fn count_of(&self, kind: AlertKind) -> usize {
        self.alerts().iter().filter(|a| a.kind == kind).count()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn raise(&self, alert: Alert) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(alert);
        }
    }
}
