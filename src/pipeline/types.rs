use crate::delivery::DeliveryError;
use crate::extraction::ExtractionError;
use crate::request::RequestError;
use serde::Serialize;
use thiserror::Error;

/// Step of the background run where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Request validation inside the run.
    Request,
    /// Strategy resolution or execution.
    Extraction,
    /// Callback batch delivery.
    Delivery,
}

/// Errors that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Submission failed validation.
    #[error(transparent)]
    Request(#[from] RequestError),
    /// Strategy could not be resolved or failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// A callback batch failed.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl PipelineError {
    /// Stage the error belongs to.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Request(_) => PipelineStage::Request,
            Self::Extraction(_) => PipelineStage::Extraction,
            Self::Delivery(_) => PipelineStage::Delivery,
        }
    }
}

/// Result of a pipeline run that delivered every batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// Correlation id of the submission.
    pub trace_id: String,
    /// Strategy that extracted the units.
    pub strategy: String,
    /// Units returned by the strategy.
    pub units: usize,
    /// Units dropped by chunk validation.
    pub skipped: usize,
    /// Chunks delivered.
    pub chunks: usize,
    /// Callback batches delivered.
    pub batches: usize,
}
