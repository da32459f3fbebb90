//! `data` strategy: content supplied inline in the submission body.

use super::text::{paged_units, pick_ordinal, pick_text};
use super::{ExtractedUnit, ExtractionError, ExtractionStrategy};
use crate::request::RequestContext;
use async_trait::async_trait;
use serde_json::Value;

const TEXT_FIELDS: [&str; 3] = ["text", "content", "extractedText"];

/// Turns pre-extracted chunks, or an inline text body, into units.
///
/// `extractedChunks` wins when present: each item becomes one unit, in order. Items may be
/// plain strings or objects with `text`/`chunkText`/`content`, `pageNumber`, and
/// `sourceUrl`. Without chunks the first non-blank of `text`, `content`, `extractedText` is
/// split into pages.
pub struct DataStrategy {
    page_tokens: usize,
}

impl DataStrategy {
    /// Strategy splitting inline text with a `page_tokens` budget.
    pub fn new(page_tokens: usize) -> Self {
        Self { page_tokens }
    }
}

#[async_trait]
impl ExtractionStrategy for DataStrategy {
    fn name(&self) -> &str {
        "data"
    }

    async fn execute(
        &self,
        context: &RequestContext,
    ) -> Result<Vec<ExtractedUnit>, ExtractionError> {
        let chunks = context.values("extractedChunks");
        if !chunks.is_empty() {
            return Ok(chunks.iter().filter_map(chunk_unit).collect());
        }

        let text = TEXT_FIELDS
            .iter()
            .map(|field| context.text(field))
            .find(|value| !value.trim().is_empty())
            .unwrap_or_default();
        Ok(paged_units(&text, self.page_tokens))
    }
}

fn chunk_unit(item: &Value) -> Option<ExtractedUnit> {
    match item {
        Value::String(text) => Some(ExtractedUnit::new(text.clone())),
        Value::Object(fields) => {
            let mut unit = ExtractedUnit::new(
                pick_text(fields, &["text", "chunkText", "content"]).unwrap_or_default(),
            );
            unit.ordinal_index = pick_ordinal(fields, &["pageNumber", "page_number", "page"]);
            if let Some(url) = pick_text(fields, &["sourceUrl", "recordUrl", "url"]) {
                unit = unit.with_source_url(url);
            }
            if let Some(Value::Object(meta)) = fields.get("meta") {
                unit.meta.extend(meta.clone());
            }
            Some(unit)
        }
        other => {
            tracing::warn!(kind = %json_kind(other), "Skipping non-object extracted chunk");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RawRequest, RequestNormalizer};
    use serde_json::json;

    fn context(body: Value) -> RequestContext {
        let body = match body {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        RequestNormalizer::default().process(RawRequest {
            body,
            ..RawRequest::default()
        })
    }

    #[tokio::test]
    async fn extracted_chunks_map_one_to_one() {
        let ctx = context(json!({
            "extractedChunks": [
                { "text": "Intro", "pageNumber": 2, "sourceUrl": "https://example.test/a" },
                "Bare string",
                { "chunkText": "Second", "meta": { "section": "B" } },
                42
            ]
        }));
        let units = DataStrategy::new(0).execute(&ctx).await.expect("units");

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].text, "Intro");
        assert_eq!(units[0].ordinal_index, Some(2));
        assert_eq!(
            units[0].source_url.as_deref(),
            Some("https://example.test/a")
        );
        assert_eq!(units[1].text, "Bare string");
        assert_eq!(units[1].ordinal_index, None);
        assert_eq!(units[2].meta["section"], json!("B"));
    }

    #[tokio::test]
    async fn inline_text_is_paged() {
        let ctx = context(json!({ "content": "one two three four five" }));
        let units = DataStrategy::new(2).execute(&ctx).await.expect("units");
        assert_eq!(units.len(), 3);
        assert_eq!(units[2].ordinal_index, Some(3));
    }

    #[tokio::test]
    async fn nothing_to_extract_yields_no_units() {
        let units = DataStrategy::new(0)
            .execute(&context(json!({})))
            .await
            .expect("units");
        assert!(units.is_empty());
    }
}
