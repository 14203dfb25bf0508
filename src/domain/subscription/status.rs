//! Subscription status state machine.
//!
//! PENDING_APPROVAL → ACTIVE → {PAST_DUE, SUSPENDED} → CANCELED, with
//! recovery back to ACTIVE and ACTIVE → ACTIVE as a renewal.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Created at the gateway; the tenant has not approved it yet.
    PendingApproval,

    /// Paid and current.
    Active,

    /// A renewal payment failed; the gateway is retrying.
    /// Access continues during the retry window.
    PastDue,

    /// The gateway gave up retrying or an operator suspended billing. No access.
    Suspended,

    /// Terminal.
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::PendingApproval => "PENDING_APPROVAL",
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::PastDue => "PAST_DUE",
            SubscriptionStatus::Suspended => "SUSPENDED",
            SubscriptionStatus::Canceled => "CANCELED",
        }
    }

    /// Returns true if this status grants access to paid features.
    pub fn has_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::PastDue)
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From PENDING_APPROVAL
            (PendingApproval, Active)
                | (PendingApproval, Canceled)
            // From ACTIVE
                | (Active, Active) // Renewal
                | (Active, PastDue)
                | (Active, Suspended)
                | (Active, Canceled)
            // From PAST_DUE
                | (PastDue, Active)
                | (PastDue, Suspended)
                | (PastDue, Canceled)
            // From SUSPENDED
                | (Suspended, Active)
                | (Suspended, Canceled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            PendingApproval => vec![Active, Canceled],
            Active => vec![Active, PastDue, Suspended, Canceled],
            PastDue => vec![Active, Suspended, Canceled],
            Suspended => vec![Active, Canceled],
            Canceled => vec![],
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING_APPROVAL" | "APPROVAL_PENDING" => Ok(SubscriptionStatus::PendingApproval),
            "ACTIVE" => Ok(SubscriptionStatus::Active),
            "PAST_DUE" => Ok(SubscriptionStatus::PastDue),
            "SUSPENDED" => Ok(SubscriptionStatus::Suspended),
            "CANCELED" | "CANCELLED" | "EXPIRED" => Ok(SubscriptionStatus::Canceled),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}
