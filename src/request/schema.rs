//! Canonical field schema consulted by [`RequestContext::get`](super::RequestContext::get).
//!
//! Each canonical field declares its kind, the default returned when no tier yields a value,
//! and where it is looked up. Fields missing from the schema are treated as document text
//! fields, so callers can address ad-hoc keys without registering them first.

use super::mapping::Source;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// Declared value kind of a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// String values; defaults to `""`.
    Text,
    /// Numeric values; defaults to `0`.
    Number,
    /// Boolean values; defaults to `false`.
    Flag,
    /// Array values; defaults to `[]`.
    List,
    /// Object values; defaults to `{}`.
    Object,
}

impl FieldKind {
    /// Default value used when a field of this kind is absent at every tier.
    pub fn default_value(self) -> Value {
        match self {
            Self::Text => Value::String(String::new()),
            Self::Number => Value::from(0),
            Self::Flag => Value::Bool(false),
            Self::List => Value::Array(Vec::new()),
            Self::Object => Value::Object(Map::new()),
        }
    }
}

/// Lookup path followed for a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Read from a mapped header.
    Header,
    /// Three-tier body lookup: top level, `documentMeta`, `documentMeta.metaData`.
    Document,
}

impl Lookup {
    pub(crate) fn source(self) -> Source {
        match self {
            Self::Header => Source::Headers,
            Self::Document => Source::Body,
        }
    }
}

/// Schema entry for one canonical field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Declared kind.
    pub kind: FieldKind,
    /// Value returned when every tier misses.
    pub default: Value,
    /// Lookup path.
    pub lookup: Lookup,
}

impl FieldSpec {
    /// Body field of `kind` with the kind's default.
    pub fn document(kind: FieldKind) -> Self {
        Self {
            kind,
            default: kind.default_value(),
            lookup: Lookup::Document,
        }
    }

    fn header() -> Self {
        Self {
            kind: FieldKind::Text,
            default: FieldKind::Text.default_value(),
            lookup: Lookup::Header,
        }
    }

    fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }
}

const TEXT_FIELDS: &[&str] = &[
    "docId",
    "streamId",
    "strategyBatchId",
    "contentType",
    "title",
    "sourceId",
    "searchIndexId",
    "sourceName",
    "sourceType",
    "docName",
    "recordTitle",
    "recordUrl",
    "sourceUrl",
    "url",
    "downloadUrl",
    "fileUrl",
    "fileType",
    "text",
    "content",
    "extractedText",
];

const LIST_FIELDS: &[&str] = &["extractedChunks", "faqs", "records"];

const OBJECT_FIELDS: &[&str] = &["customFields"];

/// Table of canonical fields keyed by canonical name.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    fields: HashMap<String, FieldSpec>,
}

impl FieldSchema {
    /// Schema covering the headers and document fields the built-in strategies read.
    pub fn standard() -> Self {
        let mut fields = HashMap::new();
        fields.insert("traceId".to_string(), FieldSpec::header());
        fields.insert("callbackUrl".to_string(), FieldSpec::header());

        let groups: [(&[&str], FieldKind); 3] = [
            (TEXT_FIELDS, FieldKind::Text),
            (LIST_FIELDS, FieldKind::List),
            (OBJECT_FIELDS, FieldKind::Object),
        ];
        for (names, kind) in groups {
            for name in names {
                fields.insert(name.to_string(), FieldSpec::document(kind));
            }
        }
        fields.insert(
            "sourceAcl".to_string(),
            FieldSpec::document(FieldKind::List).with_default(json!(["*"])),
        );

        Self { fields }
    }

    /// Register or replace a field specification.
    pub fn define(&mut self, name: impl Into<String>, spec: FieldSpec) {
        self.fields.insert(name.into(), spec);
    }

    /// Specification for a canonical field, defaulting to a document text field.
    pub fn spec(&self, name: &str) -> FieldSpec {
        self.fields
            .get(name)
            .cloned()
            .unwrap_or_else(|| FieldSpec::document(FieldKind::Text))
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_default_to_document_text() {
        let schema = FieldSchema::standard();
        let spec = schema.spec("somethingNew");
        assert_eq!(spec.kind, FieldKind::Text);
        assert_eq!(spec.lookup, Lookup::Document);
        assert_eq!(spec.default, json!(""));
    }

    #[test]
    fn source_acl_defaults_to_wildcard() {
        let schema = FieldSchema::standard();
        assert_eq!(schema.spec("sourceAcl").default, json!(["*"]));
        assert_eq!(schema.spec("traceId").lookup, Lookup::Header);
    }

    #[test]
    fn standard_schema_declares_record_lists() {
        let schema = FieldSchema::standard();
        for name in ["extractedChunks", "faqs", "records"] {
            assert_eq!(schema.spec(name).kind, FieldKind::List);
        }
        assert_eq!(schema.spec("customFields").kind, FieldKind::Object);
    }

    #[test]
    fn undeclared_fields_read_as_text() {
        let schema = FieldSchema::standard();
        for name in ["view_count", "unified_xo", "keyPhrases", "pages_info"] {
            assert_eq!(schema.spec(name), FieldSpec::document(FieldKind::Text));
        }
    }

    #[test]
    fn define_overrides_existing_entries() {
        let mut schema = FieldSchema::standard();
        schema.define(
            "sourceAcl",
            FieldSpec {
                kind: FieldKind::List,
                default: json!([]),
                lookup: Lookup::Document,
            },
        );
        assert_eq!(schema.spec("sourceAcl").default, json!([]));
        schema.define("page_count", FieldSpec::document(FieldKind::Number));
        assert_eq!(schema.spec("page_count").default, json!(0));
    }
}
