use crate::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration structure for Doc-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub prompts: PromptConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceDefinition>,
}

/// Indexing cadence and scrape concurrency
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScraperConfig {
    /// Number of new valid files that justifies indexing immediately
    #[serde(default = "default_min_files_to_index")]
    pub min_files_to_index: usize,

    /// Upper bound on staleness: index anything pending after this many days
    #[serde(default = "default_max_wait_days")]
    pub max_wait_days: u32,

    /// How many sources are extracted and downloaded at once
    #[serde(default = "default_max_concurrent_sources")]
    pub max_concurrent_sources: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            min_files_to_index: default_min_files_to_index(),
            max_wait_days: default_max_wait_days(),
            max_concurrent_sources: default_max_concurrent_sources(),
        }
    }
}

/// Downloader settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DownloadConfig {
    /// Root directory; each category gets a subdirectory
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with page and document requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// File extensions (with leading dot) the downloader will attempt
    #[serde(default = "default_download_extensions")]
    pub extensions: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            extensions: default_download_extensions(),
        }
    }
}

/// File validation limits
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FilterConfig {
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

/// Hosted indexing backend settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackendConfig {
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_backend_base_url")]
    pub base_url: String,

    /// Model used for grounded queries
    #[serde(default = "default_model")]
    pub model: String,

    /// Seconds between polls of an in-flight indexing operation
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Give up waiting on a single operation after this many seconds
    #[serde(default = "default_max_operation_wait_secs")]
    pub max_operation_wait_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_backend_base_url(),
            model: default_model(),
            poll_interval_secs: default_poll_interval_secs(),
            max_operation_wait_secs: default_max_operation_wait_secs(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

/// Where the indexing schedule is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    #[default]
    Json,
    Sqlite,
}

/// Indexing schedule persistence
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StateConfig {
    #[serde(default)]
    pub backend: StateBackend,

    /// JSON document or SQLite database path, depending on `backend`
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: StateBackend::default(),
            path: default_state_path(),
        }
    }
}

/// Prompt profiles for grounded queries
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PromptConfig {
    #[serde(default = "default_profile")]
    pub default_profile: String,

    /// Profile name -> system instruction file
    #[serde(default)]
    pub profiles: BTreeMap<String, PathBuf>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            default_profile: default_profile(),
            profiles: BTreeMap::new(),
        }
    }
}

/// One scrape target
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceDefinition {
    /// Unique identifier across all sources
    pub id: String,

    /// Human-readable label
    pub name: String,

    /// Namespacing tag; downloads land in `<data-root>/<category>/`
    pub category: String,

    /// Literal destination store identifier
    #[serde(default)]
    pub store: Option<String>,

    /// Environment variable holding the destination store identifier
    #[serde(default)]
    pub store_env: Option<String>,

    /// Extraction strategy name (e.g. "listing-page", "direct-file")
    #[serde(default = "default_source_kind")]
    pub kind: String,

    pub base_url: String,

    /// CSS selector matching document links on the page
    #[serde(default = "default_link_selector")]
    pub link_selector: String,

    #[serde(default)]
    pub follow_pagination: bool,

    /// Page cap when following pagination
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl SourceDefinition {
    /// Resolves the destination store through the process environment
    pub fn resolve_store(&self) -> Result<String, ConfigError> {
        self.resolve_store_with(|var| std::env::var(var).ok())
    }

    /// Resolves the destination store using a custom variable lookup
    ///
    /// A literal `store` takes precedence over `store-env`. Blank values
    /// count as missing.
    pub fn resolve_store_with<F>(&self, lookup: F) -> Result<String, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(store) = self.store.as_deref().map(str::trim) {
            if !store.is_empty() {
                return Ok(store.to_string());
            }
        }

        let var = self
            .store_env
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingStore {
                source_id: self.id.clone(),
            })?;

        match lookup(var).map(|v| v.trim().to_string()) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ConfigError::UnresolvedStore {
                source_id: self.id.clone(),
                var: var.to_string(),
            }),
        }
    }
}

fn default_min_files_to_index() -> usize {
    5
}

fn default_max_wait_days() -> u32 {
    7
}

fn default_max_concurrent_sources() -> usize {
    4
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("doc-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_download_extensions() -> Vec<String> {
    vec![".pdf".to_string()]
}

fn default_max_file_size_mb() -> f64 {
    20.0
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_backend_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_max_operation_wait_secs() -> u64 {
    600
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_state_path() -> PathBuf {
    PathBuf::from("data/meta/scraper_meta.json")
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_source_kind() -> String {
    "listing-page".to_string()
}

fn default_link_selector() -> String {
    "a[href$='.pdf']".to_string()
}

fn default_max_pages() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(store: Option<&str>, store_env: Option<&str>) -> SourceDefinition {
        SourceDefinition {
            id: "laws".to_string(),
            name: "Laws".to_string(),
            category: "laws".to_string(),
            store: store.map(String::from),
            store_env: store_env.map(String::from),
            kind: default_source_kind(),
            base_url: "https://example.com/laws".to_string(),
            link_selector: default_link_selector(),
            follow_pagination: false,
            max_pages: default_max_pages(),
        }
    }

    #[test]
    fn test_literal_store_wins() {
        let src = source(Some("fileSearchStores/laws"), Some("STORE_LAWS"));
        let store = src
            .resolve_store_with(|_| Some("from-env".to_string()))
            .unwrap();
        assert_eq!(store, "fileSearchStores/laws");
    }

    #[test]
    fn test_store_from_env() {
        let src = source(None, Some("STORE_LAWS"));
        let store = src
            .resolve_store_with(|var| {
                assert_eq!(var, "STORE_LAWS");
                Some("fileSearchStores/env".to_string())
            })
            .unwrap();
        assert_eq!(store, "fileSearchStores/env");
    }

    #[test]
    fn test_missing_store() {
        let src = source(None, None);
        assert!(matches!(
            src.resolve_store_with(|_| None),
            Err(ConfigError::MissingStore { .. })
        ));
    }

    #[test]
    fn test_blank_env_value_is_unresolved() {
        let src = source(Some("  "), Some("STORE_LAWS"));
        assert!(matches!(
            src.resolve_store_with(|_| Some("   ".to_string())),
            Err(ConfigError::UnresolvedStore { .. })
        ));
    }
}
