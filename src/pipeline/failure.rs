//! Failure sink for errors raised after the caller was acknowledged.
//!
//! Those errors cannot reach the caller any more, so each one is logged as a structured
//! `tracing::error!` event and kept in a bounded in-memory dead-letter log exposed by
//! `GET /failures`.

use super::types::PipelineStage;
use crate::chunk::current_timestamp_rfc3339;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One failed background run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    /// Correlation id of the submission.
    pub trace_id: String,
    /// Caller's document identifier.
    pub doc_id: String,
    /// Callback URL that would have received the batches.
    pub callback_url: String,
    /// Step that failed.
    pub stage: PipelineStage,
    /// Rendered error.
    pub error: String,
    /// Batch index for delivery failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_index: Option<usize>,
    /// When the failure was recorded (RFC 3339).
    pub occurred_at: String,
}

impl FailureRecord {
    /// Record stamped with the current time.
    pub fn new(
        trace_id: impl Into<String>,
        doc_id: impl Into<String>,
        callback_url: impl Into<String>,
        stage: PipelineStage,
        error: impl Into<String>,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            doc_id: doc_id.into(),
            callback_url: callback_url.into(),
            stage,
            error: error.into(),
            batch_index: None,
            occurred_at: current_timestamp_rfc3339(),
        }
    }

    /// Attach the failing batch index.
    pub fn with_batch_index(mut self, batch_index: Option<usize>) -> Self {
        self.batch_index = batch_index;
        self
    }
}

/// Destination for post-acknowledgment failures.
pub trait FailureSink: Send + Sync {
    /// Record one failure.
    fn record(&self, failure: FailureRecord);

    /// Most recent failures, oldest first.
    fn recent(&self) -> Vec<FailureRecord>;
}

/// Bounded dead-letter log; the oldest record is evicted when full.
pub struct DeadLetterLog {
    capacity: usize,
    records: Mutex<VecDeque<FailureRecord>>,
}

impl DeadLetterLog {
    /// Log keeping at most `capacity` records. A capacity of zero only logs.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }
}

impl FailureSink for DeadLetterLog {
    fn record(&self, failure: FailureRecord) {
        tracing::error!(
            trace_id = %failure.trace_id,
            doc_id = %failure.doc_id,
            callback_url = %failure.callback_url,
            stage = ?failure.stage,
            batch_index = ?failure.batch_index,
            error = %failure.error,
            "Pipeline run failed after acknowledgment"
        );
        if self.capacity == 0 {
            return;
        }

        let mut records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(failure);
    }

    fn recent(&self) -> Vec<FailureRecord> {
        let records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.iter().cloned().collect()
    }
}
