//! Batch sequencing and callback delivery.

mod batch;
mod client;
mod types;

pub use batch::{batch_count, plan_batches};
pub use client::CallbackClient;
pub use types::{BatchEnvelope, DeliveryError, DeliverySummary, EnvelopeIds};
