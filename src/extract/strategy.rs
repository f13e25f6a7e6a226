//! Extraction strategies keyed by source kind
//!
//! Each source names a `kind`; the registry maps that name to the strategy
//! that knows how to find document links for it. New kinds are supported by
//! registering another strategy, not by changing the extractor.

use crate::config::SourceDefinition;
use crate::extract::parser::parse_listing;
use crate::extract::ExtractError;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use url::Url;

/// Kind name for HTML listing pages
pub const LISTING_PAGE: &str = "listing-page";

/// Kind name for sources whose base URL is the document itself
pub const DIRECT_FILE: &str = "direct-file";

/// Finds candidate document URLs for one kind of source
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    async fn collect(
        &self,
        client: &Client,
        source: &SourceDefinition,
    ) -> Result<Vec<String>, ExtractError>;
}

/// Registry of strategies by kind name
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn ExtractionStrategy>>,
}

impl StrategyRegistry {
    /// Creates a registry with no strategies
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in `listing-page` and `direct-file` kinds
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(LISTING_PAGE, ListingPageStrategy);
        registry.register(DIRECT_FILE, DirectFileStrategy);
        registry
    }

    /// Registers (or replaces) the strategy for a kind
    pub fn register<S>(&mut self, kind: &str, strategy: S)
    where
        S: ExtractionStrategy + 'static,
    {
        self.strategies.insert(kind.to_string(), Arc::new(strategy));
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn ExtractionStrategy>> {
        self.strategies.get(kind).cloned()
    }

    /// Registered kind names, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

/// Fetches an HTML listing and selects links, optionally following pagination
pub struct ListingPageStrategy;

#[async_trait]
impl ExtractionStrategy for ListingPageStrategy {
    async fn collect(
        &self,
        client: &Client,
        source: &SourceDefinition,
    ) -> Result<Vec<String>, ExtractError> {
        let mut page_url = Url::parse(&source.base_url).map_err(|e| ExtractError::BaseUrl {
            url: source.base_url.clone(),
            message: e.to_string(),
        })?;

        let max_pages = if source.follow_pagination {
            source.max_pages.max(1)
        } else {
            1
        };

        let mut visited = HashSet::new();
        let mut seen_links = HashSet::new();
        let mut links = Vec::new();

        for page_number in 1..=max_pages {
            if !visited.insert(page_url.to_string()) {
                tracing::debug!(source = %source.id, "Pagination loops back to {}", page_url);
                break;
            }

            tracing::debug!(source = %source.id, page = page_number, "Fetching listing {}", page_url);
            let html = fetch_page(client, &page_url).await?;
            let parsed = parse_listing(&html, &page_url, &source.link_selector)?;

            for link in parsed.links {
                if seen_links.insert(link.clone()) {
                    links.push(link);
                }
            }

            match parsed.next_page {
                Some(next) if source.follow_pagination => page_url = next,
                _ => break,
            }
        }

        Ok(links)
    }
}

/// Treats the source's base URL as the only document
pub struct DirectFileStrategy;

#[async_trait]
impl ExtractionStrategy for DirectFileStrategy {
    async fn collect(
        &self,
        _client: &Client,
        source: &SourceDefinition,
    ) -> Result<Vec<String>, ExtractError> {
        Ok(vec![source.base_url.clone()])
    }
}

async fn fetch_page(client: &Client, url: &Url) -> Result<String, ExtractError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| ExtractError::Http {
            url: url.to_string(),
            source: e,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExtractError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| ExtractError::Http {
        url: url.to_string(),
        source: e,
    })
}
