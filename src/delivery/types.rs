use crate::chunk::Chunk;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Correlation identifiers copied into every envelope of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeIds<'a> {
    /// Caller's strategy batch identifier.
    pub strategies_batch_id: &'a str,
    /// Caller's document identifier.
    pub doc_id: &'a str,
    /// Caller's trace identifier.
    pub trace_id: &'a str,
}

/// One callback delivery unit, borrowing its slice of the chunk list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEnvelope<'a> {
    /// Caller's strategy batch identifier.
    pub strategies_batch_id: &'a str,
    /// Caller's document identifier.
    pub doc_id: &'a str,
    /// Caller's trace identifier.
    pub trace_id: &'a str,
    /// Zero-based position in the sequence.
    pub batch_index: usize,
    /// Number of envelopes in the sequence.
    pub total_batches: usize,
    /// `true` only on the final envelope.
    pub last_batch: bool,
    /// Chunks carried by this envelope, in order.
    pub chunk_data: &'a [Chunk],
}

/// Outcome of a fully delivered chunk list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliverySummary {
    /// Envelopes POSTed.
    pub batches_sent: usize,
    /// Chunks carried across all envelopes.
    pub chunks_sent: usize,
}

/// Failures raised while planning or sending callback batches.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Batch size must be at least one.
    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,
    /// Callback POST failed before a response arrived.
    #[error("Callback batch {batch_index} failed: {source}")]
    Http {
        /// Index of the batch that failed.
        batch_index: usize,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },
    /// Callback endpoint answered with a non-success status.
    #[error("Callback batch {batch_index} rejected ({status}): {body}")]
    UnexpectedStatus {
        /// Index of the batch that failed.
        batch_index: usize,
        /// HTTP status returned.
        status: StatusCode,
        /// Response body, best effort.
        body: String,
    },
}

impl DeliveryError {
    /// Index of the batch that failed, when the failure was tied to one.
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            Self::InvalidBatchSize => None,
            Self::Http { batch_index, .. } | Self::UnexpectedStatus { batch_index, .. } => {
                Some(*batch_index)
            }
        }
    }
}
