//! Append-only billing audit trail.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuditEntryId, SubscriptionId, TenantId, Timestamp};

/// Who caused a billing change.
pub const SYSTEM_ACTOR: &str = "system";
pub const WEBHOOK_ACTOR: &str = "gateway-webhook";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    SubscriptionCreated,
    SubscriptionActivated,
    SubscriptionRenewed,
    SubscriptionPastDue,
    SubscriptionSuspended,
    SubscriptionCanceled,
    SubscriptionUpdated,
    PlanChangeScheduled,
    PlanChanged,
    CancellationScheduled,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::SubscriptionCreated => "SUBSCRIPTION_CREATED",
            AuditAction::SubscriptionActivated => "SUBSCRIPTION_ACTIVATED",
            AuditAction::SubscriptionRenewed => "SUBSCRIPTION_RENEWED",
            AuditAction::SubscriptionPastDue => "SUBSCRIPTION_PAST_DUE",
            AuditAction::SubscriptionSuspended => "SUBSCRIPTION_SUSPENDED",
            AuditAction::SubscriptionCanceled => "SUBSCRIPTION_CANCELED",
            AuditAction::SubscriptionUpdated => "SUBSCRIPTION_UPDATED",
            AuditAction::PlanChangeScheduled => "PLAN_CHANGE_SCHEDULED",
            AuditAction::PlanChanged => "PLAN_CHANGED",
            AuditAction::CancellationScheduled => "CANCELLATION_SCHEDULED",
        }
    }
}

/// One immutable audit row. There is no update path for these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingAuditLogEntry {
    pub id: AuditEntryId,
    pub tenant_id: TenantId,
    pub subscription_id: Option<SubscriptionId>,
    pub actor: String,
    pub action: AuditAction,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub occurred_at: Timestamp,
}

impl BillingAuditLogEntry {
    pub fn record(
        tenant_id: TenantId,
        subscription_id: Option<SubscriptionId>,
        actor: impl Into<String>,
        action: AuditAction,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
        occurred_at: Timestamp,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            tenant_id,
            subscription_id,
            actor: actor.into(),
            action,
            before,
            after,
            occurred_at,
        }
    }
}
