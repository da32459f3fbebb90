//! Addressable view over one submission.

use super::mapping::{FieldMappings, Source};
use super::schema::{FieldSchema, FieldSpec, Lookup};
use super::{RawRequest, UploadedFile};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Canonical field holding the nested document metadata object.
const DOCUMENT_META: &str = "documentMeta";
/// Nested metadata keys tried at the third tier, in order.
const NESTED_META_KEYS: [&str; 2] = ["metaData", "meta_data"];

/// Canonical view of a single submission, produced by
/// [`RequestNormalizer::process`](super::RequestNormalizer::process).
///
/// The identifiers the pipeline needs on every run are resolved once at construction; every
/// other field is read on demand through [`RequestContext::get`] and its typed views.
#[derive(Debug, Clone)]
pub struct RequestContext {
    trace_id: String,
    callback_url: String,
    document_id: String,
    stream_id: String,
    strategy_batch_id: String,
    content_type_tag: String,
    raw: RawRequest,
    mappings: Arc<FieldMappings>,
    schema: Arc<FieldSchema>,
}

impl RequestContext {
    pub(crate) fn new(
        raw: RawRequest,
        mappings: Arc<FieldMappings>,
        schema: Arc<FieldSchema>,
    ) -> Self {
        let mut context = Self {
            trace_id: String::new(),
            callback_url: String::new(),
            document_id: String::new(),
            stream_id: String::new(),
            strategy_batch_id: String::new(),
            content_type_tag: String::new(),
            raw,
            mappings,
            schema,
        };
        context.trace_id = context.text("traceId");
        context.callback_url = context.text("callbackUrl");
        context.document_id = context.text("docId");
        context.stream_id = context.text("streamId");
        context.strategy_batch_id = context.text("strategyBatchId");
        context.content_type_tag = context.resolve_content_type_tag();
        context
    }

    /// Caller-supplied correlation id.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Destination for batch deliveries.
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// Caller's document identifier.
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Caller's stream identifier.
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Caller's strategy batch identifier.
    pub fn strategy_batch_id(&self) -> &str {
        &self.strategy_batch_id
    }

    /// Tag that selects the extraction strategy.
    pub fn content_type_tag(&self) -> &str {
        &self.content_type_tag
    }

    /// Raw transport data the context was built from.
    pub fn raw(&self) -> &RawRequest {
        &self.raw
    }

    /// Resolve a canonical field through the schema, returning its default when absent.
    ///
    /// Body fields follow the three-tier fallback (top level, `documentMeta`,
    /// `documentMeta.metaData`). A top-level value that is an array only exposes its first
    /// element here; multi-valued fields lose their tail at this tier.
    pub fn get(&self, name: &str) -> Value {
        let spec = self.schema.spec(name);
        self.lookup(name, &spec).unwrap_or(spec.default)
    }

    /// String view of a field. Numbers and booleans are rendered; composites read as empty.
    pub fn text(&self, name: &str) -> String {
        match self.get(name) {
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => String::new(),
        }
    }

    /// Integer view of a field; unparsable values read as zero.
    pub fn number(&self, name: &str) -> i64 {
        match self.get(name) {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value as i64))
                .unwrap_or(0),
            Value::String(text) => text.trim().parse().unwrap_or(0),
            Value::Bool(flag) => i64::from(flag),
            _ => 0,
        }
    }

    /// Boolean view of a field.
    pub fn flag(&self, name: &str) -> bool {
        match self.get(name) {
            Value::Bool(flag) => flag,
            Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
            Value::Number(number) => number.as_f64().is_some_and(|value| value != 0.0),
            _ => false,
        }
    }

    /// Array view of a field. A scalar is wrapped into a one-element list.
    pub fn list(&self, name: &str) -> Vec<Value> {
        match self.get(name) {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }

    /// Collection view that keeps every element of a mapped top-level array.
    ///
    /// Record lists (`extractedChunks`, `faqs`, `records`) are read through this rather than
    /// [`RequestContext::list`], which inherits the first-element behaviour of `get`.
    pub fn values(&self, name: &str) -> Vec<Value> {
        let top_level = self
            .mappings
            .transport_key(Source::Body, name)
            .and_then(|key| self.raw.body.get(key));
        match top_level {
            Some(Value::Array(items)) => items.clone(),
            _ => self.list(name),
        }
    }

    /// Object view of a field.
    pub fn object(&self, name: &str) -> Map<String, Value> {
        match self.get(name) {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// First uploaded file under a canonical file name.
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        let key = self.mappings.transport_key(Source::Files, name)?;
        self.raw.files.get(key).and_then(|files| files.first())
    }

    fn lookup(&self, name: &str, spec: &FieldSpec) -> Option<Value> {
        match spec.lookup {
            Lookup::Header => self.header_value(name),
            Lookup::Document => self.document_value(name),
        }
    }

    fn header_value(&self, name: &str) -> Option<Value> {
        let key = self
            .mappings
            .transport_key(Lookup::Header.source(), name)?
            .to_ascii_lowercase();
        self.raw
            .headers
            .get(&key)
            .filter(|value| !value.trim().is_empty())
            .map(|value| Value::String(value.trim().to_string()))
    }

    fn document_value(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.top_level(name) {
            return Some(value);
        }

        let meta = self.document_meta()?;
        if let Some(value) = meta.get(name).filter(|value| is_present(value)) {
            return Some(value.clone());
        }

        NESTED_META_KEYS
            .iter()
            .filter_map(|key| meta.get(*key).and_then(Value::as_object))
            .find_map(|nested| nested.get(name).filter(|value| is_present(value)))
            .cloned()
    }

    fn top_level(&self, name: &str) -> Option<Value> {
        let key = self.mappings.transport_key(Source::Body, name)?;
        let value = self.raw.body.get(key)?;
        let value = match value {
            Value::Array(items) => {
                if items.len() > 1 {
                    tracing::debug!(
                        field = name,
                        values = items.len(),
                        "Mapped body field is an array; exposing its first element"
                    );
                }
                items.first()?
            }
            other => other,
        };
        is_present(value).then(|| value.clone())
    }

    fn document_meta(&self) -> Option<&Map<String, Value>> {
        let mapped = self
            .mappings
            .transport_key(Source::Body, DOCUMENT_META)
            .and_then(|key| self.raw.body.get(key));
        let value = mapped.or_else(|| self.raw.body.get(DOCUMENT_META))?;
        match value {
            Value::Object(map) => Some(map),
            Value::Array(items) => items.first().and_then(Value::as_object),
            _ => None,
        }
    }

    fn resolve_content_type_tag(&self) -> String {
        let tag = self.text("contentType").trim().to_string();
        if !tag.is_empty() {
            return tag;
        }
        if self.file("document").is_some() {
            "file".to_string()
        } else {
            "data".to_string()
        }
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    }
}
