//! HTTP retrieval of source documents.

use super::ExtractionError;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

/// Body and declared content type of a fetched document.
pub(crate) struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// GET a document, failing on transport errors and non-success statuses.
pub(crate) async fn fetch_document(client: &Client, url: &str) -> Result<Fetched, ExtractionError> {
    tracing::debug!(url, "Fetching source document");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| ExtractionError::Fetch {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let error = ExtractionError::UnexpectedStatus {
            url: url.to_string(),
            status,
            body,
        };
        tracing::error!(error = %error, "Source document fetch failed");
        return Err(error);
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response
        .bytes()
        .await
        .map_err(|source| ExtractionError::Fetch {
            url: url.to_string(),
            source,
        })?
        .to_vec();

    tracing::debug!(
        url,
        bytes = bytes.len(),
        content_type = ?content_type,
        "Fetched source document"
    );
    Ok(Fetched {
        bytes,
        content_type,
    })
}
