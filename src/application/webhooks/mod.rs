//! Webhook ingestion: signature verification, the bounded worker pool, and
//! event-id idempotent dispatch.

mod dispatcher;
mod ingestor;
mod worker_pool;

pub use dispatcher::{DispatchOutcome, WebhookDispatcher};
pub use ingestor::{WebhookError, WebhookIngestor};
pub use worker_pool::{QueueClosed, WebhookQueue, WebhookWorkerPool};
