//! Payment order status state machine.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a one-off payment order.
///
/// An order moves out of `Pending` exactly once and never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created at the gateway, awaiting payer approval and capture.
    Pending,

    /// Funds captured. The appointment side effect may still be outstanding.
    Completed,

    /// Capture declined or errored. Persisted immediately and never rolled back.
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Failed => "FAILED",
        }
    }
}

impl StateMachine for OrderStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OrderStatus::*;
        matches!((self, target), (Pending, Completed) | (Pending, Failed))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderStatus::*;
        match self {
            Pending => vec![Completed, Failed],
            Completed | Failed => vec![],
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "FAILED" => Ok(OrderStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "order_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_transition_to_completed() {
        assert!(OrderStatus::Pending.can_transition_to(&OrderStatus::Completed));
    }

    #[test]
    fn pending_can_transition_to_failed() {
        assert!(OrderStatus::Pending.can_transition_to(&OrderStatus::Failed));
    }

    #[test]
    fn failed_cannot_transition_to_completed() {
        assert!(!OrderStatus::Failed.can_transition_to(&OrderStatus::Completed));
    }

    #[test]
    fn completed_and_failed_are_terminal() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn status_round_trips_through_its_text_form() {
        for status in [OrderStatus::Pending, OrderStatus::Completed, OrderStatus::Failed] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("REFUNDED".parse::<OrderStatus>().is_err());
    }
}
