//! Request normalization: raw transport data to a canonical [`RequestContext`].

mod context;
pub mod mapping;
pub mod schema;

pub use context::RequestContext;
pub use mapping::{FieldMappings, Source};
pub use schema::{FieldKind, FieldSchema, FieldSpec, Lookup};

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Canonical header fields that must be present before a pipeline may be scheduled.
pub const REQUIRED_HEADERS: [&str; 2] = ["traceId", "callbackUrl"];

/// Errors raised while accepting an inbound submission.
#[derive(Debug, Error)]
pub enum RequestError {
    /// One or more load-bearing headers were missing or blank.
    #[error("Missing required headers ({})", .0.join(", "))]
    MissingHeaders(Vec<String>),
    /// Content type was neither JSON nor multipart form data.
    #[error("Content-Type must be application/json or multipart/form-data")]
    UnsupportedMediaType,
    /// Body could not be read or decoded as a JSON object.
    #[error("Invalid JSON data: {0}")]
    InvalidJson(String),
    /// Multipart stream could not be parsed.
    #[error("Error parsing form data: {0}")]
    InvalidMultipart(String),
}

/// File part received through multipart form data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-supplied file name.
    pub file_name: String,
    /// Declared MIME type, when the client sent one.
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Transport-level pieces of one submission before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    /// Header values keyed by lower-cased header name.
    pub headers: HashMap<String, String>,
    /// JSON body or multipart text fields.
    pub body: Map<String, Value>,
    /// Multipart file parts keyed by field name.
    pub files: HashMap<String, Vec<UploadedFile>>,
}

/// Converts raw transport data into a [`RequestContext`] using the configured mappings.
#[derive(Debug, Clone)]
pub struct RequestNormalizer {
    mappings: Arc<FieldMappings>,
    schema: Arc<FieldSchema>,
}

impl RequestNormalizer {
    /// Build a normalizer over a mapping table and field schema.
    pub fn new(mappings: FieldMappings, schema: FieldSchema) -> Self {
        Self {
            mappings: Arc::new(mappings),
            schema: Arc::new(schema),
        }
    }

    /// Mapping table in use.
    pub fn mappings(&self) -> &FieldMappings {
        &self.mappings
    }

    /// Check that every load-bearing header is present, naming the transport keys that are not.
    pub fn validate(&self, request: &RawRequest) -> Result<(), RequestError> {
        let missing: Vec<String> = REQUIRED_HEADERS
            .iter()
            .map(|canonical| {
                self.mappings
                    .transport_key(Source::Headers, canonical)
                    .unwrap_or(*canonical)
                    .to_ascii_lowercase()
            })
            .filter(|key| {
                request
                    .headers
                    .get(key)
                    .is_none_or(|value| value.trim().is_empty())
            })
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RequestError::MissingHeaders(missing))
        }
    }

    /// Normalize one submission. Never fails; required fields are checked by [`Self::validate`].
    pub fn process(&self, request: RawRequest) -> RequestContext {
        RequestContext::new(request, self.mappings.clone(), self.schema.clone())
    }
}

impl Default for RequestNormalizer {
    fn default() -> Self {
        Self::new(FieldMappings::default(), FieldSchema::standard())
    }
}
