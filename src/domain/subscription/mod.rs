//! Subscription module - tenant plan lifecycle.

mod aggregate;
mod status;

pub use aggregate::{
    CancellationOutcome, PaymentMethodSummary, PendingPlanChange, ScheduledCancellation,
    Subscription,
};
pub use status::SubscriptionStatus;
