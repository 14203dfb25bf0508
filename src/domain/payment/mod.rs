//! Payment module - one-off consultation payment orders.
//!
//! - `OrderStatus` - PENDING → COMPLETED | FAILED, once
//! - `PaymentOrder` - the aggregate, with an immutable amount
//! - `BookedSlot` - requested appointment time, with a flagged fallback

mod order;
mod slot;
mod status;

pub use order::{CaptureDetails, OrderType, PayeeContext, PaymentOrder};
pub use slot::{BookedSlot, FALLBACK_OFFSET_HOURS};
pub use status::OrderStatus;
