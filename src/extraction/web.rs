//! `web` strategy: fetch a page and extract its visible text.

use super::fetch::fetch_document;
use super::text::{html_to_text, paged_units};
use super::{ExtractedUnit, ExtractionError, ExtractionStrategy};
use crate::request::RequestContext;
use async_trait::async_trait;
use reqwest::Client;

/// Body fields tried, in order, for the page address.
const URL_FIELDS: [&str; 3] = ["url", "sourceUrl", "recordUrl"];

/// Fetches the submission's URL and splits the page text into units.
pub struct WebStrategy {
    client: Client,
    page_tokens: usize,
}

impl WebStrategy {
    /// Strategy using `client` for page fetches and `page_tokens` as the page budget.
    pub fn new(client: Client, page_tokens: usize) -> Self {
        Self {
            client,
            page_tokens,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for WebStrategy {
    fn name(&self) -> &str {
        "web"
    }

    async fn execute(
        &self,
        context: &RequestContext,
    ) -> Result<Vec<ExtractedUnit>, ExtractionError> {
        let url = URL_FIELDS
            .iter()
            .map(|field| context.text(field))
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| ExtractionError::MissingSource {
                strategy: "web".to_string(),
                detail: "no url, sourceUrl, or recordUrl".to_string(),
            })?;

        let fetched = fetch_document(&self.client, &url).await?;
        let body = String::from_utf8_lossy(&fetched.bytes);
        let is_html = fetched
            .content_type
            .as_deref()
            .is_none_or(|value| value.to_ascii_lowercase().contains("html"));

        let (title, text) = if is_html {
            let page = html_to_text(&body);
            (page.title, page.text)
        } else {
            (None, body.into_owned())
        };

        let units = paged_units(&text, self.page_tokens)
            .into_iter()
            .map(|unit| {
                let unit = unit.with_source_url(url.clone());
                match &title {
                    Some(title) => unit.with_meta("pageTitle", title.clone()),
                    None => unit,
                }
            })
            .collect::<Vec<_>>();
        tracing::debug!(url, pages = units.len(), "Extracted web page");
        Ok(units)
    }
}
