//! Extraction strategies and the registry that dispatches to them.
//!
//! A strategy turns one [`RequestContext`] into raw [`ExtractedUnit`]s (usually one per page
//! or record). Strategies are selected by the submission's content-type tag:
//!
//! - built-in kinds `file`, `web`, `data`, and `faq`;
//! - any tag on the native or third-party ingestion connector allow-lists, served by the
//!   generic [`ConnectorStrategy`];
//! - anything else fails with [`ExtractionError::UnsupportedContentType`].
//!
//! Strategies never mutate the context and never talk to the callback endpoint.

pub mod connector;
pub mod data;
pub mod faq;
mod fetch;
pub mod file;
pub mod registry;
pub(crate) mod text;
pub mod web;

pub use connector::{ConnectorFamily, ConnectorStrategy};
pub use data::DataStrategy;
pub use faq::FaqStrategy;
pub use file::FileStrategy;
pub use registry::{StrategyFactory, StrategyRegistry};
pub use web::WebStrategy;

use crate::request::RequestContext;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while selecting or running an extraction strategy.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Tag matched no built-in kind and no allow-listed connector.
    #[error("Unsupported content type for extraction: {0}")]
    UnsupportedContentType(String),
    /// Strategy could not find the input it needs on the request.
    #[error("{strategy} extraction has no source: {detail}")]
    MissingSource {
        /// Strategy that failed.
        strategy: String,
        /// What was missing.
        detail: String,
    },
    /// Network request for a source document failed before a response arrived.
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        /// URL that was requested.
        url: String,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },
    /// Source document endpoint answered with a non-success status.
    #[error("Unexpected response fetching {url} ({status}): {body}")]
    UnexpectedStatus {
        /// URL that was requested.
        url: String,
        /// HTTP status returned.
        status: StatusCode,
        /// Response body, best effort.
        body: String,
    },
    /// Document bytes could not be decoded.
    #[error("Failed to decode {format} document: {detail}")]
    Decode {
        /// Format that was being decoded.
        format: &'static str,
        /// Decoder diagnostic.
        detail: String,
    },
}

/// One raw result produced by a strategy, typically a page or a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedUnit {
    /// Extracted text.
    pub text: String,
    /// 1-based position reported by the source, when it has one.
    pub ordinal_index: Option<u32>,
    /// URL the unit was read from.
    pub source_url: Option<String>,
    /// Strategy-specific metadata merged into the chunk metadata.
    pub meta: Map<String, Value>,
}

impl ExtractedUnit {
    /// Unit carrying only text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attach the source ordinal.
    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal_index = Some(ordinal);
        self
    }

    /// Attach the source URL, ignoring blanks.
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.trim().is_empty() {
            self.source_url = Some(url);
        }
        self
    }

    /// Attach one metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Capability implemented by every extraction strategy.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Tag this instance serves (`file`, `web`, a connector name, ...).
    fn name(&self) -> &str;

    /// Extract raw units from the submission.
    async fn execute(
        &self,
        context: &RequestContext,
    ) -> Result<Vec<ExtractedUnit>, ExtractionError>;
}
