//! Raw units → validated chunks.

use crate::chunk::{Chunk, ChunkBuilder, compute_chunk_id, current_timestamp_rfc3339};
use crate::extraction::ExtractedUnit;
use crate::request::RequestContext;
use serde_json::{Map, Value, json};

/// Title used when the submission carries none.
pub const UNTITLED_DOCUMENT: &str = "Untitled Document";
/// Text used when a unit has none, or only whitespace.
pub const EMPTY_TEXT: &str = "empty text";

/// Result of one normalization pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedChunks {
    /// Valid chunks, in unit order.
    pub chunks: Vec<Chunk>,
    /// Units dropped because their chunk failed validation.
    pub skipped: usize,
}

/// Normalize `units` into chunks stamped with the current time.
pub fn normalize(units: Vec<ExtractedUnit>, context: &RequestContext) -> NormalizedChunks {
    normalize_at(units, context, &current_timestamp_rfc3339())
}

/// Normalize `units` into chunks stamped with `timestamp`.
///
/// Output order follows input order. Page numbers come from the unit ordinal, or the 1-based
/// position when the strategy reported none. A unit whose chunk fails validation is skipped
/// with a warning; the rest of the run continues.
pub fn normalize_at(
    units: Vec<ExtractedUnit>,
    context: &RequestContext,
    timestamp: &str,
) -> NormalizedChunks {
    if units.is_empty() {
        tracing::warn!(trace_id = %context.trace_id(), "Extraction produced no units");
        return NormalizedChunks::default();
    }

    let shared = SharedFields::from_context(context);
    let page_count = units.len();
    let mut normalized = NormalizedChunks {
        chunks: Vec::with_capacity(page_count),
        skipped: 0,
    };

    for (position, unit) in units.into_iter().enumerate() {
        let page_number = unit
            .ordinal_index
            .unwrap_or_else(|| u32::try_from(position + 1).unwrap_or(u32::MAX));
        match build_chunk(&shared, unit, position, page_number, page_count, timestamp) {
            Ok(chunk) => normalized.chunks.push(chunk),
            Err(error) => {
                normalized.skipped += 1;
                tracing::warn!(
                    trace_id = %context.trace_id(),
                    position,
                    page_number,
                    error = %error,
                    "Skipping unit that failed chunk validation"
                );
            }
        }
    }

    tracing::debug!(
        trace_id = %context.trace_id(),
        chunks = normalized.chunks.len(),
        skipped = normalized.skipped,
        "Normalized extracted units"
    );
    normalized
}

/// Context fields copied onto every chunk of a submission.
struct SharedFields {
    title: String,
    doc_id: String,
    source_id: String,
    search_index_id: String,
    stream_id: String,
    record_title: String,
    record_url: String,
    source_name: String,
    doc_name: String,
    source_url: String,
    source_type: String,
    source_acl: Vec<String>,
    file_type: String,
    strategy: String,
    custom_fields: Map<String, Value>,
}

impl SharedFields {
    fn from_context(context: &RequestContext) -> Self {
        let title = context.text("title");
        let source_acl = context
            .values("sourceAcl")
            .into_iter()
            .filter_map(|value| match value {
                Value::String(entry) => Some(entry),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect();

        Self {
            title: if title.trim().is_empty() {
                UNTITLED_DOCUMENT.to_string()
            } else {
                title
            },
            doc_id: context.document_id().to_string(),
            source_id: context.text("sourceId"),
            search_index_id: context.text("searchIndexId"),
            stream_id: context.stream_id().to_string(),
            record_title: context.text("recordTitle"),
            record_url: context.text("recordUrl"),
            source_name: context.text("sourceName"),
            doc_name: context.text("docName"),
            source_url: context.text("sourceUrl"),
            source_type: context.text("sourceType"),
            source_acl,
            file_type: context.text("fileType"),
            strategy: context.content_type_tag().to_string(),
            custom_fields: context.object("customFields"),
        }
    }
}

fn build_chunk(
    shared: &SharedFields,
    unit: ExtractedUnit,
    position: usize,
    page_number: u32,
    page_count: usize,
    timestamp: &str,
) -> Result<Chunk, crate::chunk::ValidationError> {
    let text = if unit.text.trim().is_empty() {
        EMPTY_TEXT.to_string()
    } else {
        unit.text
    };
    let unit_url = unit.source_url.unwrap_or_default();

    let mut chunk_meta = unit.meta;
    let record_title = chunk_meta
        .get("recordTitle")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| shared.record_title.clone());
    chunk_meta.insert("pageCount".to_string(), json!(page_count));
    chunk_meta.insert("currentPage".to_string(), json!(page_number));
    chunk_meta.insert("sourceUrl".to_string(), json!(unit_url));

    let record_url = if unit_url.is_empty() {
        shared.record_url.clone()
    } else {
        unit_url.clone()
    };
    let source_url = if shared.source_url.is_empty() {
        unit_url
    } else {
        shared.source_url.clone()
    };

    let chunk_id = compute_chunk_id(&shared.doc_id, page_number, position, &text);
    let mut builder = ChunkBuilder::new()
        .chunk_id(chunk_id)
        .title(shared.title.clone())
        .text(text)
        .doc_id(shared.doc_id.clone())
        .source_id(shared.source_id.clone())
        .search_index_id(shared.search_index_id.clone())
        .stream_id(shared.stream_id.clone())
        .page_number(page_number)
        .record_url(record_url)
        .record_title(record_title)
        .source_name(shared.source_name.clone())
        .doc_name(shared.doc_name.clone())
        .source_url(source_url)
        .source_type(shared.source_type.clone())
        .source_acl(shared.source_acl.clone())
        .file_type(shared.file_type.clone())
        .extraction_strategy(shared.strategy.clone())
        .chunk_meta(chunk_meta)
        .created_on(timestamp)
        .modified_on(timestamp);

    for slot in 1..=5 {
        match shared.custom_fields.get(&format!("cfs{slot}")) {
            Some(Value::String(value)) => builder = builder.custom_string(slot, value.clone()),
            Some(Value::Number(value)) => builder = builder.custom_string(slot, value.to_string()),
            _ => {}
        }
        if let Some(Value::Array(values)) = shared.custom_fields.get(&format!("cfa{slot}")) {
            builder = builder.custom_array(slot, values.clone());
        }
    }

    builder.build()
}
