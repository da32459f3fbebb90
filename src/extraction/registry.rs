//! Tag → strategy resolution.

use super::connector::{ConnectorFamily, ConnectorStrategy};
use super::{
    DataStrategy, ExtractedUnit, ExtractionError, ExtractionStrategy, FaqStrategy, FileStrategy,
    WebStrategy,
};
use crate::config::Config;
use crate::request::RequestContext;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Builds a fresh strategy instance for one invocation.
pub type StrategyFactory = Arc<dyn Fn() -> Box<dyn ExtractionStrategy> + Send + Sync>;

/// Resolves content-type tags to strategies.
///
/// Registered kinds are consulted first, then the native and ingestion connector
/// allow-lists. Each [`StrategyRegistry::resolve`] call builds a new instance, so no strategy
/// state is shared between submissions.
pub struct StrategyRegistry {
    factories: HashMap<String, StrategyFactory>,
    native: HashSet<String>,
    ingestion: HashSet<String>,
    page_tokens: usize,
}

impl StrategyRegistry {
    /// Registry with no kinds and empty allow-lists.
    pub fn new(page_tokens: usize) -> Self {
        Self {
            factories: HashMap::new(),
            native: HashSet::new(),
            ingestion: HashSet::new(),
            page_tokens,
        }
    }

    /// Registry with the built-in `file`, `web`, `data`, and `faq` kinds.
    pub fn with_builtins(client: Client, page_tokens: usize) -> Self {
        let mut registry = Self::new(page_tokens);

        let file_client = client.clone();
        registry.register("file", move || {
            Box::new(FileStrategy::new(file_client.clone(), page_tokens))
        });
        registry.register("web", move || {
            Box::new(WebStrategy::new(client.clone(), page_tokens))
        });
        registry.register("data", move || Box::new(DataStrategy::new(page_tokens)));
        registry.register("faq", || Box::new(FaqStrategy::new()));
        registry
    }

    /// Built-in kinds plus the allow-lists from configuration.
    pub fn from_config(config: &Config, client: Client) -> Self {
        Self::with_builtins(client, config.page_token_budget)
            .with_connectors(
                ConnectorFamily::Native,
                config.native_connectors.iter().cloned(),
            )
            .with_connectors(
                ConnectorFamily::Ingestion,
                config.ingestion_connectors.iter().cloned(),
            )
    }

    /// Add connector tags to one allow-list.
    pub fn with_connectors<I, T>(mut self, family: ConnectorFamily, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let target = match family {
            ConnectorFamily::Native => &mut self.native,
            ConnectorFamily::Ingestion => &mut self.ingestion,
        };
        target.extend(
            tags.into_iter()
                .map(Into::into)
                .filter(|tag: &String| !tag.trim().is_empty()),
        );
        self
    }

    /// Register (or replace) the factory for a kind.
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn ExtractionStrategy> + Send + Sync + 'static,
    {
        self.factories.insert(tag.into(), Arc::new(factory));
    }

    /// Allow-list a connector tag belongs to. Native wins if a tag is on both.
    pub fn connector_family(&self, tag: &str) -> Option<ConnectorFamily> {
        if self.native.contains(tag) {
            Some(ConnectorFamily::Native)
        } else if self.ingestion.contains(tag) {
            Some(ConnectorFamily::Ingestion)
        } else {
            None
        }
    }

    /// Fresh strategy for `tag`.
    pub fn resolve(&self, tag: &str) -> Result<Box<dyn ExtractionStrategy>, ExtractionError> {
        if let Some(factory) = self.factories.get(tag) {
            return Ok(factory());
        }
        match self.connector_family(tag) {
            Some(family) => Ok(Box::new(ConnectorStrategy::new(
                tag,
                family,
                self.page_tokens,
            ))),
            None => Err(ExtractionError::UnsupportedContentType(tag.to_string())),
        }
    }

    /// Resolve the context's tag and run the strategy.
    pub async fn dispatch(
        &self,
        context: &RequestContext,
    ) -> Result<Vec<ExtractedUnit>, ExtractionError> {
        let tag = context.content_type_tag();
        let strategy = self.resolve(tag)?;
        tracing::info!(
            trace_id = %context.trace_id(),
            content_type = tag,
            strategy = strategy.name(),
            "Dispatching extraction"
        );
        let units = strategy.execute(context).await?;
        tracing::info!(
            trace_id = %context.trace_id(),
            strategy = strategy.name(),
            units = units.len(),
            "Extraction complete"
        );
        Ok(units)
    }
}
