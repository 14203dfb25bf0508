//! State machine trait for status enums.
//!
//! Gives payment order and subscription statuses one way to validate
//! transitions before an aggregate changes state.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// ```ignore
/// let next = OrderStatus::Pending.transition_to(OrderStatus::Completed)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum RefundStatus {
        Requested,
        Approved,
        Settled,
        Rejected,
    }

    impl StateMachine for RefundStatus {
        fn can_transition_to(&self, target: &Self) -> bool {
            use RefundStatus::*;
            matches!(
                (self, target),
                (Requested, Approved) | (Requested, Rejected) | (Approved, Settled)
            )
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use RefundStatus::*;
            match self {
                Requested => vec![Approved, Rejected],
                Approved => vec![Settled],
                Settled | Rejected => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        assert_eq!(
            RefundStatus::Requested.transition_to(RefundStatus::Approved),
            Ok(RefundStatus::Approved)
        );
    }

    #[test]
    fn transition_to_reports_both_states_on_failure() {
        let err = RefundStatus::Requested
            .transition_to(RefundStatus::Settled)
            .unwrap_err();
        assert!(err.to_string().contains("Requested"));
        assert!(err.to_string().contains("Settled"));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(RefundStatus::Settled.is_terminal());
        assert!(RefundStatus::Rejected.is_terminal());
        assert!(!RefundStatus::Approved.is_terminal());
    }
}
