//! Generic strategy for allow-listed connector tags.

use super::text::{paged_units, pick_text};
use super::{ExtractedUnit, ExtractionError, ExtractionStrategy};
use crate::request::RequestContext;
use async_trait::async_trait;
use serde_json::Value;

const RECORD_TEXT_KEYS: [&str; 4] = ["content", "text", "body", "description"];
const RECORD_URL_KEYS: [&str; 4] = ["url", "sourceUrl", "recordUrl", "link"];
const RECORD_TITLE_KEYS: [&str; 3] = ["title", "recordTitle", "name"];

/// Allow-list a connector tag was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorFamily {
    /// Connectors maintained alongside this service.
    Native,
    /// Third-party ingestion connectors.
    Ingestion,
}

impl ConnectorFamily {
    /// Label carried in unit metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Ingestion => "ingestion",
        }
    }
}

/// Reads connector-supplied `records`, or a single inline `text`/`content`.
///
/// Every unit carries `connector` and `connectorFamily` metadata.
pub struct ConnectorStrategy {
    connector: String,
    family: ConnectorFamily,
    page_tokens: usize,
}

impl ConnectorStrategy {
    /// Strategy for the connector named `connector`.
    pub fn new(connector: impl Into<String>, family: ConnectorFamily, page_tokens: usize) -> Self {
        Self {
            connector: connector.into(),
            family,
            page_tokens,
        }
    }

    /// Allow-list the connector belongs to.
    pub fn family(&self) -> ConnectorFamily {
        self.family
    }

    fn record_unit(&self, record: &Value, ordinal: u32) -> Option<ExtractedUnit> {
        let Value::Object(fields) = record else {
            tracing::warn!(
                connector = %self.connector,
                position = ordinal,
                "Skipping connector record that is not an object"
            );
            return None;
        };
        let mut unit = ExtractedUnit::new(pick_text(fields, &RECORD_TEXT_KEYS).unwrap_or_default())
            .with_ordinal(ordinal);
        if let Some(url) = pick_text(fields, &RECORD_URL_KEYS) {
            unit = unit.with_source_url(url);
        }
        if let Some(title) = pick_text(fields, &RECORD_TITLE_KEYS) {
            unit = unit.with_meta("recordTitle", title);
        }
        if let Some(id) = pick_text(fields, &["id", "recordId"]) {
            unit = unit.with_meta("recordId", id);
        }
        Some(unit)
    }
}

#[async_trait]
impl ExtractionStrategy for ConnectorStrategy {
    fn name(&self) -> &str {
        &self.connector
    }

    async fn execute(
        &self,
        context: &RequestContext,
    ) -> Result<Vec<ExtractedUnit>, ExtractionError> {
        let records = context.values("records");
        let units = if records.is_empty() {
            let text = ["text", "content"]
                .iter()
                .map(|field| context.text(field))
                .find(|value| !value.trim().is_empty())
                .unwrap_or_default();
            paged_units(&text, self.page_tokens)
        } else {
            records
                .iter()
                .zip(1u32..)
                .filter_map(|(record, ordinal)| self.record_unit(record, ordinal))
                .collect()
        };

        tracing::debug!(
            connector = %self.connector,
            family = self.family.as_str(),
            units = units.len(),
            "Connector extraction finished"
        );
        Ok(units
            .into_iter()
            .map(|unit| {
                unit.with_meta("connector", self.connector.clone())
                    .with_meta("connectorFamily", self.family.as_str())
            })
            .collect())
    }
}
