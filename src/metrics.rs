use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing intake and pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    submissions_accepted: AtomicU64,
    submissions_rejected: AtomicU64,
    pipelines_succeeded: AtomicU64,
    pipelines_failed: AtomicU64,
    batches_delivered: AtomicU64,
    chunks_delivered: AtomicU64,
    units_skipped: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submission acknowledged and scheduled.
    pub fn record_accepted(&self) {
        self.submissions_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a submission refused before acknowledgment.
    pub fn record_rejected(&self) {
        self.submissions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run that delivered every batch.
    pub fn record_success(&self, batches: u64, chunks: u64, skipped: u64) {
        self.pipelines_succeeded.fetch_add(1, Ordering::Relaxed);
        self.batches_delivered.fetch_add(batches, Ordering::Relaxed);
        self.chunks_delivered.fetch_add(chunks, Ordering::Relaxed);
        self.units_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    /// Record a run that stopped on an error.
    pub fn record_failure(&self) {
        self.pipelines_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submissions_accepted: self.submissions_accepted.load(Ordering::Relaxed),
            submissions_rejected: self.submissions_rejected.load(Ordering::Relaxed),
            pipelines_succeeded: self.pipelines_succeeded.load(Ordering::Relaxed),
            pipelines_failed: self.pipelines_failed.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            chunks_delivered: self.chunks_delivered.load(Ordering::Relaxed),
            units_skipped: self.units_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Submissions acknowledged with 202.
    pub submissions_accepted: u64,
    /// Submissions refused with a 4xx before scheduling.
    pub submissions_rejected: u64,
    /// Background runs that delivered every batch.
    pub pipelines_succeeded: u64,
    /// Background runs that failed in extraction or delivery.
    pub pipelines_failed: u64,
    /// Callback batches accepted by callers.
    pub batches_delivered: u64,
    /// Chunks carried by delivered batches.
    pub chunks_delivered: u64,
    /// Units dropped by chunk validation.
    pub units_skipped: u64,
}
