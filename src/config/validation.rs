use crate::config::types::{
    BackendConfig, Config, DownloadConfig, FilterConfig, ScraperConfig, SourceDefinition,
};
use crate::ConfigError;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Validates the global sections and source id uniqueness
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_download_config(&config.download)?;
    validate_filter_config(&config.filter)?;
    validate_backend_config(&config.backend)?;
    validate_source_ids(&config.sources)?;
    validate_category_stores(&config.sources)?;
    Ok(())
}

fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.min_files_to_index < 1 {
        return Err(ConfigError::Validation(format!(
            "min-files-to-index must be >= 1, got {}",
            config.min_files_to_index
        )));
    }

    if config.max_concurrent_sources < 1 || config.max_concurrent_sources > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-sources must be between 1 and 64, got {}",
            config.max_concurrent_sources
        )));
    }

    Ok(())
}

fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    if config.data_root.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data-root cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.extensions.is_empty() {
        return Err(ConfigError::Validation(
            "download extensions cannot be empty".to_string(),
        ));
    }

    for ext in &config.extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "download extension must look like '.pdf', got '{}'",
                ext
            )));
        }
    }

    Ok(())
}

fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    if config.max_file_size_mb.is_nan() || config.max_file_size_mb <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "max-file-size-mb must be positive, got {}",
            config.max_file_size_mb
        )));
    }
    Ok(())
}

fn validate_backend_config(config: &BackendConfig) -> Result<(), ConfigError> {
    Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid backend base-url: {}", e)))?;

    if config.poll_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "poll-interval-secs must be >= 1".to_string(),
        ));
    }

    if config.max_operation_wait_secs < config.poll_interval_secs {
        return Err(ConfigError::Validation(format!(
            "max-operation-wait-secs ({}) must be >= poll-interval-secs ({})",
            config.max_operation_wait_secs, config.poll_interval_secs
        )));
    }

    Ok(())
}

fn validate_source_ids(sources: &[SourceDefinition]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for source in sources {
        if source.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source id cannot be empty".to_string(),
            ));
        }
        if !seen.insert(source.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source id '{}'",
                source.id
            )));
        }
    }
    Ok(())
}

/// A category directory is rescanned for every store it feeds, so each
/// category may only feed one store
fn validate_category_stores(sources: &[SourceDefinition]) -> Result<(), ConfigError> {
    let mut owners: HashMap<&str, (String, &str)> = HashMap::new();
    for source in sources {
        let destination = declared_store(source);
        match owners.get(source.category.as_str()) {
            Some((owner, owner_id)) if *owner != destination => {
                return Err(ConfigError::Validation(format!(
                    "category '{}' feeds two stores: source '{}' uses {} but source '{}' uses {}",
                    source.category, owner_id, owner, source.id, destination
                )));
            }
            Some(_) => {}
            None => {
                owners.insert(source.category.as_str(), (destination, source.id.as_str()));
            }
        }
    }
    Ok(())
}

/// The store reference as written: a literal store, or `$VAR` for `store-env`
fn declared_store(source: &SourceDefinition) -> String {
    match source.store.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(store) => format!("'{}'", store),
        None => format!("${}", source.store_env.as_deref().unwrap_or("").trim()),
    }
}

/// Checks a single source definition before it is scraped
///
/// A failure here disqualifies only this source.
pub fn check_source(source: &SourceDefinition) -> Result<(), ConfigError> {
    validate_category(&source.category).map_err(|msg| {
        ConfigError::Validation(format!("source '{}': {}", source.id, msg))
    })?;

    let url = Url::parse(&source.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "source '{}' base-url '{}': {}",
            source.id, source.base_url, e
        ))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "source '{}' base-url must be http(s), got '{}'",
            source.id,
            url.scheme()
        )));
    }

    if source.link_selector.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "source '{}' link-selector cannot be empty",
            source.id
        )));
    }

    Ok(())
}

/// A category becomes a directory name, so it must be a single plain segment
fn validate_category(category: &str) -> Result<(), String> {
    if category.is_empty() {
        return Err("category cannot be empty".to_string());
    }

    if category == "." || category == ".." {
        return Err(format!("category '{}' is not a valid directory name", category));
    }

    if !category
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(format!(
            "category '{}' may only contain letters, digits, '-', '_' and '.'",
            category
        ));
    }

    Ok(())
}
