//! Link extraction for configured sources
//!
//! This module contains:
//! - The `LinkExtractor` capability the orchestrator depends on
//! - `HtmlLinkExtractor`, which dispatches to a strategy per source kind
//! - HTML listing parsing with CSS selectors

mod parser;
mod strategy;

pub use parser::{parse_listing, ParsedListing};
pub use strategy::{
    DirectFileStrategy, ExtractionStrategy, ListingPageStrategy, StrategyRegistry, DIRECT_FILE,
    LISTING_PAGE,
};

use crate::config::SourceDefinition;
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

/// Errors raised while collecting links for a source
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid link selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Invalid base URL '{url}': {message}")]
    BaseUrl { url: String, message: String },

    #[error("No extraction strategy registered for kind '{0}'")]
    UnknownKind(String),
}

/// Returns candidate document URLs for a source
///
/// Each call is independent; implementations must not share mutable page
/// state between sources so extractions can run concurrently.
#[async_trait]
pub trait LinkExtractor: Send + Sync {
    async fn extract(&self, source: &SourceDefinition) -> Result<Vec<String>, ExtractError>;
}

/// Static-HTML link extractor driven by a [`StrategyRegistry`]
pub struct HtmlLinkExtractor {
    client: Client,
    registry: StrategyRegistry,
}

impl HtmlLinkExtractor {
    pub fn new(client: Client, registry: StrategyRegistry) -> Self {
        Self { client, registry }
    }

    /// Extractor with the built-in strategies
    pub fn with_defaults(client: Client) -> Self {
        Self::new(client, StrategyRegistry::with_defaults())
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }
}

#[async_trait]
impl LinkExtractor for HtmlLinkExtractor {
    async fn extract(&self, source: &SourceDefinition) -> Result<Vec<String>, ExtractError> {
        let strategy = self
            .registry
            .get(&source.kind)
            .ok_or_else(|| ExtractError::UnknownKind(source.kind.clone()))?;

        tracing::info!(
            source = %source.id,
            kind = %source.kind,
            "Collecting links from {}",
            source.base_url
        );

        let links: Vec<String> = strategy
            .collect(&self.client, source)
            .await?
            .into_iter()
            .map(|link| link.trim().to_string())
            .filter(|link| !link.is_empty())
            .collect();

        tracing::info!(source = %source.id, "Links found: {}", links.len());
        Ok(links)
    }
}
