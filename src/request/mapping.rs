//! Declarative canonical-name to transport-key table.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Where a canonical field is read from on the inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// HTTP headers (lower-cased names).
    Headers,
    /// JSON body or multipart text fields.
    Body,
    /// Multipart file parts.
    Files,
}

/// Mapping of canonical field names to the keys used on the wire.
///
/// Loaded from `FIELD_MAPPINGS_FILE` when present, so new transport shapes can be supported
/// without touching the pipeline. Canonical names that are missing from a section resolve to
/// nothing at that tier.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FieldMappings {
    /// Header mappings, e.g. `traceId -> x-trace-id`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Body mappings, e.g. `documentMeta -> document_meta`.
    #[serde(default)]
    pub body: BTreeMap<String, String>,
    /// File mappings, e.g. `document -> upload`.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl FieldMappings {
    /// Transport key for a canonical name within one source section.
    pub fn transport_key(&self, source: Source, canonical: &str) -> Option<&str> {
        let table = match source {
            Source::Headers => &self.headers,
            Source::Body => &self.body,
            Source::Files => &self.files,
        };
        table.get(canonical).map(String::as_str)
    }
}

const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("traceId", "x-trace-id"),
    ("callbackUrl", "x-callback-url"),
];

const DEFAULT_BODY: &[(&str, &str)] = &[
    ("documentMeta", "document_meta"),
    ("strategyBatchId", "strategyBatchId"),
    ("docId", "docId"),
    ("streamId", "streamId"),
    ("contentType", "contentType"),
    ("title", "title"),
    ("sourceId", "sourceId"),
    ("searchIndexId", "searchIndexId"),
    ("sourceName", "sourceName"),
    ("sourceType", "sourceType"),
    ("sourceAcl", "sourceAcl"),
    ("docName", "docName"),
    ("recordTitle", "recordTitle"),
    ("recordUrl", "recordUrl"),
    ("sourceUrl", "sourceUrl"),
    ("url", "url"),
    ("downloadUrl", "downloadUrl"),
    ("fileUrl", "fileUrl"),
    ("fileType", "sys_file_type"),
    ("text", "text"),
    ("content", "content"),
    ("extractedText", "extractedText"),
    ("extractedChunks", "extractedChunks"),
    ("faqs", "faqs"),
    ("records", "records"),
];

const DEFAULT_FILES: &[(&str, &str)] = &[("document", "upload")];

impl Default for FieldMappings {
    fn default() -> Self {
        let table = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(canonical, key)| (canonical.to_string(), key.to_string()))
                .collect()
        };
        Self {
            headers: table(DEFAULT_HEADERS),
            body: table(DEFAULT_BODY),
            files: table(DEFAULT_FILES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_required_headers() {
        let mappings = FieldMappings::default();
        assert_eq!(
            mappings.transport_key(Source::Headers, "callbackUrl"),
            Some("x-callback-url")
        );
        assert_eq!(
            mappings.transport_key(Source::Files, "document"),
            Some("upload")
        );
        assert_eq!(mappings.transport_key(Source::Body, "unknownField"), None);
    }

    #[test]
    fn partial_tables_deserialize() {
        let mappings: FieldMappings =
            serde_json::from_str(r#"{ "headers": { "traceId": "x-request-id" } }"#)
                .expect("mappings");
        assert_eq!(
            mappings.transport_key(Source::Headers, "traceId"),
            Some("x-request-id")
        );
        assert!(mappings.body.is_empty());
        assert!(mappings.files.is_empty());
    }
}
