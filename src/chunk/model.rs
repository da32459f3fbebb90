//! Canonical chunk record delivered to callbacks.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;

/// Raised when a chunk is built without its required text fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// `chunkTitle` was absent or blank.
    #[error("chunkTitle is required")]
    MissingTitle,
    /// `chunkText` was absent or blank.
    #[error("chunkText is required")]
    MissingText,
}

/// Validated, transport-ready result unit.
///
/// Chunks are only produced by [`ChunkBuilder::build`](super::ChunkBuilder::build) and expose
/// read-only accessors, so a chunk never changes after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub(super) chunk_id: String,
    pub(super) chunk_title: String,
    pub(super) chunk_text: String,
    pub(super) doc_id: String,
    pub(super) source_id: String,
    pub(super) search_index_id: String,
    pub(super) stream_id: String,
    pub(super) page_number: u32,
    pub(super) record_url: String,
    pub(super) record_title: String,
    pub(super) source_name: String,
    pub(super) doc_name: String,
    pub(super) source_url: String,
    pub(super) source_type: String,
    pub(super) source_acl: Vec<String>,
    pub(super) file_type: String,
    pub(super) extraction_strategy: String,
    pub(super) chunk_meta: Map<String, Value>,
    pub(super) cfs1: String,
    pub(super) cfs2: String,
    pub(super) cfs3: String,
    pub(super) cfs4: String,
    pub(super) cfs5: String,
    pub(super) cfa1: Vec<Value>,
    pub(super) cfa2: Vec<Value>,
    pub(super) cfa3: Vec<Value>,
    pub(super) cfa4: Vec<Value>,
    pub(super) cfa5: Vec<Value>,
    pub(super) created_on: String,
    pub(super) modified_on: String,
}

impl Chunk {
    /// Stable chunk identifier.
    pub fn chunk_id(&self) -> &str {
        &self.chunk_id
    }

    /// Chunk title.
    pub fn title(&self) -> &str {
        &self.chunk_title
    }

    /// Chunk text.
    pub fn text(&self) -> &str {
        &self.chunk_text
    }

    /// Caller's document identifier.
    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    /// Caller's stream identifier.
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// 1-based page position, `0` when unknown.
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// URL of the record the chunk came from.
    pub fn record_url(&self) -> &str {
        &self.record_url
    }

    /// Access-control list copied from the submission.
    pub fn source_acl(&self) -> &[String] {
        &self.source_acl
    }

    /// Free-form metadata.
    pub fn chunk_meta(&self) -> &Map<String, Value> {
        &self.chunk_meta
    }

    /// Generic string slot `1..=5`.
    pub fn custom_string(&self, slot: usize) -> Option<&str> {
        let value = match slot {
            1 => &self.cfs1,
            2 => &self.cfs2,
            3 => &self.cfs3,
            4 => &self.cfs4,
            5 => &self.cfs5,
            _ => return None,
        };
        Some(value)
    }

    /// Generic array slot `1..=5`.
    pub fn custom_array(&self, slot: usize) -> Option<&[Value]> {
        let value = match slot {
            1 => &self.cfa1,
            2 => &self.cfa2,
            3 => &self.cfa3,
            4 => &self.cfa4,
            5 => &self.cfa5,
            _ => return None,
        };
        Some(value)
    }

    /// Creation timestamp (RFC 3339).
    pub fn created_on(&self) -> &str {
        &self.created_on
    }

    /// Modification timestamp (RFC 3339).
    pub fn modified_on(&self) -> &str {
        &self.modified_on
    }
}

/// Deterministic chunk identifier derived from its position and content.
pub fn compute_chunk_id(doc_id: &str, page_number: u32, position: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(doc_id.as_bytes());
    hasher.update(page_number.to_be_bytes());
    hasher.update((position as u64).to_be_bytes());
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Current timestamp formatted for chunk payloads.
pub fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_is_stable_and_position_sensitive() {
        let first = compute_chunk_id("doc", 1, 0, "Hello");
        assert_eq!(first, compute_chunk_id("doc", 1, 0, "Hello"));
        assert_ne!(first, compute_chunk_id("doc", 2, 1, "Hello"));
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }
}
