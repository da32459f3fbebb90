//! `file` strategy: uploaded or downloadable documents.

use super::fetch::fetch_document;
use super::text::{html_to_text, paged_units};
use super::{ExtractedUnit, ExtractionError, ExtractionStrategy};
use crate::request::RequestContext;
use async_trait::async_trait;
use reqwest::Client;

/// Canonical file name carrying an uploaded document.
const DOCUMENT_FILE: &str = "document";
/// Body fields tried, in order, for a downloadable document.
const DOWNLOAD_FIELDS: [&str; 2] = ["downloadUrl", "fileUrl"];
const PAGE_BREAK: char = '\u{000C}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Html,
    Text,
}

impl DocumentKind {
    fn detect(content_type: Option<&str>, file_name: &str, declared: &str) -> Self {
        let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
        let file_name = file_name.to_ascii_lowercase();
        let declared = declared.trim().to_ascii_lowercase();

        if content_type.contains("pdf") || file_name.ends_with(".pdf") || declared == "pdf" {
            Self::Pdf
        } else if content_type.contains("html")
            || file_name.ends_with(".html")
            || file_name.ends_with(".htm")
            || declared == "html"
        {
            Self::Html
        } else {
            Self::Text
        }
    }
}

struct SourceDocument {
    name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
    location: Option<String>,
}

/// Extracts text from an uploaded file, or from one fetched via `downloadUrl` / `fileUrl`.
pub struct FileStrategy {
    client: Client,
    page_tokens: usize,
}

impl FileStrategy {
    /// Strategy using `client` for downloads and `page_tokens` as the page budget.
    pub fn new(client: Client, page_tokens: usize) -> Self {
        Self {
            client,
            page_tokens,
        }
    }

    async fn load(&self, context: &RequestContext) -> Result<SourceDocument, ExtractionError> {
        if let Some(upload) = context.file(DOCUMENT_FILE) {
            return Ok(SourceDocument {
                name: upload.file_name.clone(),
                content_type: upload.content_type.clone(),
                bytes: upload.bytes.clone(),
                location: None,
            });
        }

        let url = DOWNLOAD_FIELDS
            .iter()
            .map(|field| context.text(field))
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| ExtractionError::MissingSource {
                strategy: "file".to_string(),
                detail: "no uploaded document and no downloadUrl or fileUrl".to_string(),
            })?;
        let fetched = fetch_document(&self.client, &url).await?;
        Ok(SourceDocument {
            name: url.rsplit('/').next().unwrap_or_default().to_string(),
            content_type: fetched.content_type,
            bytes: fetched.bytes,
            location: Some(url),
        })
    }

    fn text_units(&self, text: &str) -> Vec<ExtractedUnit> {
        paged_units(text, self.page_tokens)
    }
}

#[async_trait]
impl ExtractionStrategy for FileStrategy {
    fn name(&self) -> &str {
        "file"
    }

    async fn execute(
        &self,
        context: &RequestContext,
    ) -> Result<Vec<ExtractedUnit>, ExtractionError> {
        let source = self.load(context).await?;
        let kind = DocumentKind::detect(
            source.content_type.as_deref(),
            &source.name,
            &context.text("fileType"),
        );
        tracing::debug!(
            file = %source.name,
            kind = ?kind,
            bytes = source.bytes.len(),
            "Extracting file document"
        );

        let units = match kind {
            DocumentKind::Pdf => {
                let text = decode_pdf(source.bytes).await?;
                pdf_units(&text, self.page_tokens)
            }
            DocumentKind::Html => {
                let html = String::from_utf8_lossy(&source.bytes);
                self.text_units(&html_to_text(&html).text)
            }
            DocumentKind::Text => self.text_units(&String::from_utf8_lossy(&source.bytes)),
        };

        let units = match source.location {
            Some(location) => units
                .into_iter()
                .map(|unit| unit.with_source_url(location.clone()))
                .collect(),
            None => units,
        };
        Ok(units
            .into_iter()
            .map(|unit| unit.with_meta("fileName", source.name.clone()))
            .collect())
    }
}

async fn decode_pdf(bytes: Vec<u8>) -> Result<String, ExtractionError> {
    let decoded = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|error| ExtractionError::Decode {
            format: "pdf",
            detail: error.to_string(),
        })?;
    decoded.map_err(|error| ExtractionError::Decode {
        format: "pdf",
        detail: error.to_string(),
    })
}

/// One unit per form-feed separated page, keeping the page's own number. Text with no page
/// breaks is split by the token budget instead.
fn pdf_units(text: &str, page_tokens: usize) -> Vec<ExtractedUnit> {
    if !text.contains(PAGE_BREAK) {
        return paged_units(text, page_tokens);
    }
    text.split(PAGE_BREAK)
        .zip(1u32..)
        .filter(|(page, _)| !page.trim().is_empty())
        .map(|(page, number)| ExtractedUnit::new(page.trim()).with_ordinal(number))
        .collect()
}
