//! Fluent construction of [`Chunk`] values.

use super::model::{Chunk, ValidationError, current_timestamp_rfc3339};
use serde_json::{Map, Value};

/// Accumulates chunk fields in any order and validates them in [`ChunkBuilder::build`].
///
/// Use one builder per chunk; every setter consumes and returns the builder so no state can
/// carry over into the next chunk.
#[derive(Debug, Default, Clone)]
pub struct ChunkBuilder {
    chunk_id: String,
    title: Option<String>,
    text: Option<String>,
    doc_id: String,
    source_id: String,
    search_index_id: String,
    stream_id: String,
    page_number: u32,
    record_url: String,
    record_title: String,
    source_name: String,
    doc_name: String,
    source_url: String,
    source_type: String,
    source_acl: Vec<String>,
    file_type: String,
    extraction_strategy: String,
    chunk_meta: Map<String, Value>,
    custom_strings: [String; 5],
    custom_arrays: [Vec<Value>; 5],
    created_on: Option<String>,
    modified_on: Option<String>,
}

impl ChunkBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk identifier.
    pub fn chunk_id(mut self, value: impl Into<String>) -> Self {
        self.chunk_id = value.into();
        self
    }

    /// Set the required chunk title.
    pub fn title(mut self, value: impl Into<String>) -> Self {
        self.title = Some(value.into());
        self
    }

    /// Set the required chunk text.
    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.text = Some(value.into());
        self
    }

    /// Set the document identifier.
    pub fn doc_id(mut self, value: impl Into<String>) -> Self {
        self.doc_id = value.into();
        self
    }

    /// Set the source identifier.
    pub fn source_id(mut self, value: impl Into<String>) -> Self {
        self.source_id = value.into();
        self
    }

    /// Set the search index identifier.
    pub fn search_index_id(mut self, value: impl Into<String>) -> Self {
        self.search_index_id = value.into();
        self
    }

    /// Set the stream identifier.
    pub fn stream_id(mut self, value: impl Into<String>) -> Self {
        self.stream_id = value.into();
        self
    }

    /// Set the page number.
    pub fn page_number(mut self, value: u32) -> Self {
        self.page_number = value;
        self
    }

    /// Set the record URL.
    pub fn record_url(mut self, value: impl Into<String>) -> Self {
        self.record_url = value.into();
        self
    }

    /// Set the record title.
    pub fn record_title(mut self, value: impl Into<String>) -> Self {
        self.record_title = value.into();
        self
    }

    /// Set the source display name.
    pub fn source_name(mut self, value: impl Into<String>) -> Self {
        self.source_name = value.into();
        self
    }

    /// Set the document display name.
    pub fn doc_name(mut self, value: impl Into<String>) -> Self {
        self.doc_name = value.into();
        self
    }

    /// Set the source URL.
    pub fn source_url(mut self, value: impl Into<String>) -> Self {
        self.source_url = value.into();
        self
    }

    /// Set the source type.
    pub fn source_type(mut self, value: impl Into<String>) -> Self {
        self.source_type = value.into();
        self
    }

    /// Set the access-control list.
    pub fn source_acl(mut self, value: Vec<String>) -> Self {
        self.source_acl = value;
        self
    }

    /// Set the file type.
    pub fn file_type(mut self, value: impl Into<String>) -> Self {
        self.file_type = value.into();
        self
    }

    /// Record which extraction strategy produced the chunk.
    pub fn extraction_strategy(mut self, value: impl Into<String>) -> Self {
        self.extraction_strategy = value.into();
        self
    }

    /// Replace the metadata map.
    pub fn chunk_meta(mut self, value: Map<String, Value>) -> Self {
        self.chunk_meta = value;
        self
    }

    /// Set generic string slot `1..=5`; other slots are ignored.
    pub fn custom_string(mut self, slot: usize, value: impl Into<String>) -> Self {
        if let Some(target) = slot
            .checked_sub(1)
            .and_then(|index| self.custom_strings.get_mut(index))
        {
            *target = value.into();
        }
        self
    }

    /// Set generic array slot `1..=5`; other slots are ignored.
    pub fn custom_array(mut self, slot: usize, value: Vec<Value>) -> Self {
        if let Some(target) = slot
            .checked_sub(1)
            .and_then(|index| self.custom_arrays.get_mut(index))
        {
            *target = value;
        }
        self
    }

    /// Set the creation timestamp; defaults to the build time.
    pub fn created_on(mut self, value: impl Into<String>) -> Self {
        self.created_on = Some(value.into());
        self
    }

    /// Set the modification timestamp; defaults to the build time.
    pub fn modified_on(mut self, value: impl Into<String>) -> Self {
        self.modified_on = Some(value.into());
        self
    }

    /// Validate the accumulated fields and produce the chunk.
    pub fn build(self) -> Result<Chunk, ValidationError> {
        let chunk_title = self
            .title
            .filter(|value| !value.is_empty())
            .ok_or(ValidationError::MissingTitle)?;
        let chunk_text = self
            .text
            .filter(|value| !value.is_empty())
            .ok_or(ValidationError::MissingText)?;

        let now = match (&self.created_on, &self.modified_on) {
            (Some(_), Some(_)) => String::new(),
            _ => current_timestamp_rfc3339(),
        };
        let created_on = self.created_on.unwrap_or_else(|| now.clone());
        let modified_on = self.modified_on.unwrap_or(now);

        let [cfs1, cfs2, cfs3, cfs4, cfs5] = self.custom_strings;
        let [cfa1, cfa2, cfa3, cfa4, cfa5] = self.custom_arrays;

        Ok(Chunk {
            chunk_id: self.chunk_id,
            chunk_title,
            chunk_text,
            doc_id: self.doc_id,
            source_id: self.source_id,
            search_index_id: self.search_index_id,
            stream_id: self.stream_id,
            page_number: self.page_number,
            record_url: self.record_url,
            record_title: self.record_title,
            source_name: self.source_name,
            doc_name: self.doc_name,
            source_url: self.source_url,
            source_type: self.source_type,
            source_acl: self.source_acl,
            file_type: self.file_type,
            extraction_strategy: self.extraction_strategy,
            chunk_meta: self.chunk_meta,
            cfs1,
            cfs2,
            cfs3,
            cfs4,
            cfs5,
            cfa1,
            cfa2,
            cfa3,
            cfa4,
            cfa5,
            created_on,
            modified_on,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_requires_title() {
        let error = ChunkBuilder::new().text("body").build().unwrap_err();
        assert_eq!(error, ValidationError::MissingTitle);

        let error = ChunkBuilder::new().title("").text("body").build().unwrap_err();
        assert_eq!(error, ValidationError::MissingTitle);
    }

    #[test]
    fn build_requires_text() {
        let error = ChunkBuilder::new().title("Title").build().unwrap_err();
        assert_eq!(error, ValidationError::MissingText);

        let error = ChunkBuilder::new().title("Title").text("").build().unwrap_err();
        assert_eq!(error, ValidationError::MissingText);
    }

    #[test]
    fn whitespace_title_and_text_are_not_empty() {
        let chunk = ChunkBuilder::new()
            .title(" ")
            .text("body")
            .build()
            .expect("whitespace title");
        assert_eq!(chunk.title(), " ");

        let chunk = ChunkBuilder::new()
            .title("Title")
            .text("  \n")
            .build()
            .expect("whitespace text");
        assert_eq!(chunk.text(), "  \n");
    }

    #[test]
    fn minimal_chunk_uses_documented_defaults() {
        let chunk = ChunkBuilder::new()
            .title("Title")
            .text("Body")
            .build()
            .expect("chunk");

        assert_eq!(chunk.title(), "Title");
        assert_eq!(chunk.text(), "Body");
        assert_eq!(chunk.chunk_id(), "");
        assert_eq!(chunk.doc_id(), "");
        assert_eq!(chunk.page_number(), 0);
        assert!(chunk.chunk_meta().is_empty());
        assert!(chunk.source_acl().is_empty());
        assert_eq!(chunk.custom_string(3), Some(""));
        assert_eq!(chunk.custom_array(5), Some(&[][..]));
        assert!(!chunk.created_on().is_empty());
        assert_eq!(chunk.created_on(), chunk.modified_on());
    }

    #[test]
    fn setters_apply_in_any_order() {
        let mut meta = serde_json::Map::new();
        meta.insert("pageCount".into(), json!(3));
        let chunk = ChunkBuilder::new()
            .custom_string(2, "slot-two")
            .custom_array(1, vec![json!("a")])
            .page_number(3)
            .chunk_meta(meta)
            .text("Body")
            .doc_id("doc-1")
            .title("Title")
            .created_on("2025-01-01T00:00:00Z")
            .modified_on("2025-01-02T00:00:00Z")
            .build()
            .expect("chunk");

        assert_eq!(chunk.custom_string(2), Some("slot-two"));
        assert_eq!(chunk.custom_array(1), Some(&[json!("a")][..]));
        assert_eq!(chunk.page_number(), 3);
        assert_eq!(chunk.doc_id(), "doc-1");
        assert_eq!(chunk.chunk_meta()["pageCount"], json!(3));
        assert_eq!(chunk.created_on(), "2025-01-01T00:00:00Z");
        assert_eq!(chunk.modified_on(), "2025-01-02T00:00:00Z");
    }

    #[test]
    fn out_of_range_slots_are_ignored() {
        let chunk = ChunkBuilder::new()
            .custom_string(0, "zero")
            .custom_string(6, "six")
            .custom_array(9, vec![json!(1)])
            .title("Title")
            .text("Body")
            .build()
            .expect("chunk");
        assert!((1..=5).all(|slot| chunk.custom_string(slot) == Some("")));
        assert_eq!(chunk.custom_string(6), None);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let chunk = ChunkBuilder::new()
            .title("Title")
            .text("Body")
            .search_index_id("idx")
            .build()
            .expect("chunk");
        let value = serde_json::to_value(&chunk).expect("json");
        assert_eq!(value["chunkTitle"], "Title");
        assert_eq!(value["chunkText"], "Body");
        assert_eq!(value["searchIndexId"], "idx");
        assert_eq!(value["cfs1"], "");
        assert_eq!(value["cfa1"], json!([]));
        assert!(value.get("createdOn").is_some());
    }
}
