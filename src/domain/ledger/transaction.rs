//! Payment transaction ledger rows.
//!
//! Every capture outcome and every recurring payment event lands here,
//! including declines, so finance can reconcile against the gateway.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, TenantId, Timestamp, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    OrderCapture,
    SubscriptionPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionOutcome {
    Succeeded,
    Declined,
    Failed,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::OrderCapture => "ORDER_CAPTURE",
            TransactionKind::SubscriptionPayment => "SUBSCRIPTION_PAYMENT",
        }
    }
}

impl TransactionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionOutcome::Succeeded => "SUCCEEDED",
            TransactionOutcome::Declined => "DECLINED",
            TransactionOutcome::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: TransactionId,
    pub tenant_id: TenantId,
    pub kind: TransactionKind,
    pub outcome: TransactionOutcome,
    /// Gateway order id or gateway subscription id.
    pub reference: String,
    /// Capture id or sale id, when the gateway returned one.
    pub external_id: Option<String>,
    pub amount: Option<Money>,
    pub raw_payload: Option<serde_json::Value>,
    pub recorded_at: Timestamp,
}

impl PaymentTransaction {
    pub fn new(
        tenant_id: TenantId,
        kind: TransactionKind,
        outcome: TransactionOutcome,
        reference: impl Into<String>,
        recorded_at: Timestamp,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            tenant_id,
            kind,
            outcome,
            reference: reference.into(),
            external_id: None,
            amount: None,
            raw_payload: None,
            recorded_at,
        }
    }

    pub fn with_external_id(mut self, id: Option<String>) -> Self {
        self.external_id = id;
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_raw_payload(mut self, payload: serde_json::Value) -> Self {
        self.raw_payload = Some(payload);
        self
    }
}
