use super::failure::{DeadLetterLog, FailureRecord, FailureSink};
use super::normalize::{NormalizedChunks, normalize};
use super::scheduler::Scheduler;
use super::types::{PipelineError, PipelineOutcome};
use crate::config::Config;
use crate::delivery::CallbackClient;
use crate::extraction::StrategyRegistry;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::request::{FieldSchema, RawRequest, RequestContext, RequestError, RequestNormalizer};
use reqwest::Client;
use std::sync::Arc;
use tracing::Instrument;

/// Operations the intake surface needs from the pipeline.
pub trait IntakeApi: Send + Sync {
    /// Check the load-bearing headers of a submission.
    fn validate(&self, request: &RawRequest) -> Result<(), RequestError>;

    /// Validate and queue a submission for background processing.
    fn schedule(&self, request: RawRequest) -> Result<(), RequestError>;

    /// Count a submission refused before acknowledgment.
    fn record_rejected(&self);

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;

    /// Most recent post-acknowledgment failures.
    fn recent_failures(&self) -> Vec<FailureRecord>;
}

struct PipelineInner {
    normalizer: RequestNormalizer,
    registry: StrategyRegistry,
    callbacks: CallbackClient,
    batch_size: usize,
    metrics: PipelineMetrics,
    failures: Arc<dyn FailureSink>,
}

/// Request normalization → extraction → chunk normalization → callback delivery.
#[derive(Clone)]
pub struct PipelineService {
    inner: Arc<PipelineInner>,
    scheduler: Scheduler,
}

impl PipelineService {
    /// Assemble a service from its parts.
    pub fn new(
        normalizer: RequestNormalizer,
        registry: StrategyRegistry,
        callbacks: CallbackClient,
        batch_size: usize,
        concurrency: usize,
        failures: Arc<dyn FailureSink>,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                normalizer,
                registry,
                callbacks,
                batch_size,
                metrics: PipelineMetrics::new(),
                failures,
            }),
            scheduler: Scheduler::new(concurrency),
        }
    }

    /// Build the service from configuration, sharing one HTTP client between source fetches
    /// and callbacks.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("chunkrelay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        tracing::debug!(
            batch_size = config.batch_size,
            concurrency = config.pipeline_concurrency,
            page_tokens = config.page_token_budget,
            "Initializing pipeline service"
        );
        Ok(Self::new(
            RequestNormalizer::new(config.field_mappings.clone(), FieldSchema::standard()),
            StrategyRegistry::from_config(config, client.clone()),
            CallbackClient::from_config(config, client),
            config.batch_size,
            config.pipeline_concurrency,
            Arc::new(DeadLetterLog::new(config.dead_letter_capacity)),
        ))
    }

    /// Run one submission to completion on the current task.
    ///
    /// Validation errors are returned without touching the failure sink; extraction and
    /// delivery errors are also recorded there.
    pub async fn run(&self, request: RawRequest) -> Result<PipelineOutcome, PipelineError> {
        self.inner.normalizer.validate(&request)?;
        let context = self.inner.normalizer.process(request);
        let span = pipeline_span(&context);
        self.inner.execute(&context).instrument(span).await
    }

    /// Resolve once every scheduled run has finished.
    pub async fn wait_idle(&self) {
        self.scheduler.wait_idle().await;
    }

    /// Number of scheduled runs not yet finished.
    pub fn in_flight(&self) -> usize {
        self.scheduler.in_flight()
    }
}

impl IntakeApi for PipelineService {
    fn validate(&self, request: &RawRequest) -> Result<(), RequestError> {
        self.inner.normalizer.validate(request)
    }

    fn schedule(&self, request: RawRequest) -> Result<(), RequestError> {
        self.inner.normalizer.validate(&request)?;
        let context = self.inner.normalizer.process(request);
        let span = pipeline_span(&context);
        tracing::info!(
            trace_id = %context.trace_id(),
            content_type = context.content_type_tag(),
            "Submission accepted"
        );
        self.inner.metrics.record_accepted();

        let inner = self.inner.clone();
        self.scheduler.spawn(span, async move {
            // Outcome and errors are already logged and recorded by `execute`.
            let _ = inner.execute(&context).await;
        });
        Ok(())
    }

    fn record_rejected(&self) {
        self.inner.metrics.record_rejected();
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    fn recent_failures(&self) -> Vec<FailureRecord> {
        self.inner.failures.recent()
    }
}

impl PipelineInner {
    async fn execute(&self, context: &RequestContext) -> Result<PipelineOutcome, PipelineError> {
        match self.process(context).await {
            Ok(outcome) => {
                self.metrics.record_success(
                    outcome.batches as u64,
                    outcome.chunks as u64,
                    outcome.skipped as u64,
                );
                tracing::info!(
                    strategy = %outcome.strategy,
                    units = outcome.units,
                    chunks = outcome.chunks,
                    skipped = outcome.skipped,
                    batches = outcome.batches,
                    "Pipeline run completed"
                );
                Ok(outcome)
            }
            Err(error) => {
                self.metrics.record_failure();
                let batch_index = match &error {
                    PipelineError::Delivery(delivery) => delivery.batch_index(),
                    _ => None,
                };
                self.failures.record(
                    FailureRecord::new(
                        context.trace_id(),
                        context.document_id(),
                        context.callback_url(),
                        error.stage(),
                        error.to_string(),
                    )
                    .with_batch_index(batch_index),
                );
                Err(error)
            }
        }
    }

    async fn process(&self, context: &RequestContext) -> Result<PipelineOutcome, PipelineError> {
        let units = self.registry.dispatch(context).await?;
        let unit_count = units.len();
        let NormalizedChunks { chunks, skipped } = normalize(units, context);
        let summary = self
            .callbacks
            .deliver(context, &chunks, self.batch_size)
            .await?;

        Ok(PipelineOutcome {
            trace_id: context.trace_id().to_string(),
            strategy: context.content_type_tag().to_string(),
            units: unit_count,
            skipped,
            chunks: summary.chunks_sent,
            batches: summary.batches_sent,
        })
    }
}

fn pipeline_span(context: &RequestContext) -> tracing::Span {
    tracing::info_span!(
        "pipeline",
        trace_id = %context.trace_id(),
        doc_id = %context.document_id(),
    )
}
