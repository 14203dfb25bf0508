//! Order Payment Processor - one-time consultation payments with capture
//! idempotency across the direct and webhook paths.

mod commands;
mod fulfilment;
mod processor;

pub use commands::{
    CaptureOutcome, CreateOrderCommand, CreatedPaymentOrder, FeeSource, WebhookPayment,
    WebhookPaymentOutcome,
};
pub use fulfilment::{AppointmentFulfilment, PAYMENT_METHOD};
pub use processor::{OrderPaymentProcessor, OrderProcessorSettings};
