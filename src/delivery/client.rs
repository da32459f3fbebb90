//! HTTP delivery of sequenced batches to the caller's callback URL.

use super::batch::plan_batches;
use super::types::{BatchEnvelope, DeliveryError, DeliverySummary, EnvelopeIds};
use crate::chunk::Chunk;
use crate::config::Config;
use crate::request::RequestContext;
use reqwest::Client;

/// POSTs batch envelopes, one at a time and in index order.
///
/// The first failed batch aborts the sequence: later batches are never attempted and earlier
/// ones are not rolled back, so a consumer can observe a truncated sequence.
#[derive(Clone)]
pub struct CallbackClient {
    pub(crate) client: Client,
    pub(crate) api_key: Option<String>,
    pub(crate) api_key_header: String,
}

impl CallbackClient {
    /// Client sending `api_key` (when set) under `api_key_header`.
    pub fn new(client: Client, api_key: Option<String>, api_key_header: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|value| !value.is_empty()),
            api_key_header: api_key_header.into(),
        }
    }

    /// Client configured from the callback settings.
    ///
    /// A missing `CALLBACK_API_KEY` is logged at warn level: callbacks still go out, but
    /// without the key header.
    pub fn from_config(config: &Config, client: Client) -> Self {
        let callbacks = Self::new(
            client,
            config.callback_api_key.clone(),
            config.callback_api_key_header.clone(),
        );
        if callbacks.has_api_key() {
            tracing::debug!(header = %callbacks.api_key_header, "Initialized callback client");
        } else {
            tracing::warn!(
                header = %callbacks.api_key_header,
                "CALLBACK_API_KEY is not set; callbacks will be sent unauthenticated"
            );
        }
        callbacks
    }

    /// Whether callback POSTs carry the API key header.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Deliver `chunks` to the context's callback URL in batches of `batch_size`.
    ///
    /// Zero chunks means zero POSTs and a successful, empty summary.
    pub async fn deliver(
        &self,
        context: &RequestContext,
        chunks: &[Chunk],
        batch_size: usize,
    ) -> Result<DeliverySummary, DeliveryError> {
        let ids = EnvelopeIds {
            strategies_batch_id: context.strategy_batch_id(),
            doc_id: context.document_id(),
            trace_id: context.trace_id(),
        };
        let batches = plan_batches(ids, chunks, batch_size)?;
        if batches.is_empty() {
            tracing::info!(trace_id = %context.trace_id(), "No chunks to deliver");
            return Ok(DeliverySummary::default());
        }

        let mut summary = DeliverySummary::default();
        for envelope in &batches {
            self.send(context.callback_url(), envelope).await?;
            summary.batches_sent += 1;
            summary.chunks_sent += envelope.chunk_data.len();
        }

        tracing::info!(
            trace_id = %context.trace_id(),
            batches = summary.batches_sent,
            chunks = summary.chunks_sent,
            "Delivered all callback batches"
        );
        Ok(summary)
    }

    async fn send(&self, url: &str, envelope: &BatchEnvelope<'_>) -> Result<(), DeliveryError> {
        let batch_index = envelope.batch_index;
        let mut request = self.client.post(url).json(envelope);
        if let Some(api_key) = &self.api_key {
            request = request.header(self.api_key_header.as_str(), api_key);
        }

        let response = request.send().await.map_err(|source| {
            let error = DeliveryError::Http {
                batch_index,
                source,
            };
            tracing::error!(
                error = %error,
                trace_id = envelope.trace_id,
                "Callback request failed"
            );
            error
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(
                trace_id = envelope.trace_id,
                batch_index,
                total_batches = envelope.total_batches,
                chunks = envelope.chunk_data.len(),
                last_batch = envelope.last_batch,
                "Callback batch delivered"
            );
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            let error = DeliveryError::UnexpectedStatus {
                batch_index,
                status,
                body,
            };
            tracing::error!(
                error = %error,
                trace_id = envelope.trace_id,
                "Callback request failed"
            );
            Err(error)
        }
    }
}
