//! Background pipeline: orchestration, chunk normalization, scheduling, and failure
//! reporting.

mod failure;
mod normalize;
mod scheduler;
mod service;
mod types;

pub use failure::{DeadLetterLog, FailureRecord, FailureSink};
pub use normalize::{EMPTY_TEXT, NormalizedChunks, UNTITLED_DOCUMENT, normalize, normalize_at};
pub use scheduler::Scheduler;
pub use service::{IntakeApi, PipelineService};
pub use types::{PipelineError, PipelineOutcome, PipelineStage};
