use crate::config::types::{
    CacheConfig, Config, CrawlerConfig, EnrichmentConfig, HtmlSelectors, OutputConfig,
    SiteConfig, SiteKind, UserAgentConfig,
};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_cache_config(&config.cache)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_enrichment_config(&config.enrichment)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 0 and 10, got {}",
            config.max_retries
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_concurrent_sites < 1 || config.max_concurrent_sites > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_sites must be between 1 and 64, got {}",
            config.max_concurrent_sites
        )));
    }

    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.ttl_seconds < 1 {
        return Err(ConfigError::Validation(
            "cache ttl_seconds must be >= 1".to_string(),
        ));
    }

    if config.max_entries < 1 {
        return Err(ConfigError::Validation(
            "cache max_entries must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.pool_size < 1 || config.pool_size > 32 {
        return Err(ConfigError::Validation(format!(
            "pool_size must be between 1 and 32, got {}",
            config.pool_size
        )));
    }

    Ok(())
}

fn validate_enrichment_config(config: &EnrichmentConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 16 {
        return Err(ConfigError::Validation(format!(
            "enrichment workers must be between 1 and 16, got {}",
            config.workers
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(
            "enrichment queue_capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates site entries: unique names, usable URLs, parseable selectors
fn validate_sites(sites: &[SiteConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for site in sites {
        let name = site.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "site name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate site name '{}'",
                site.name
            )));
        }

        let url = Url::parse(&site.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid URL for site '{}': {}", site.name, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must use an HTTP(S) URL",
                site.name
            )));
        }

        match site.kind {
            SiteKind::Html => {
                let selectors = site.html.as_ref().ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "Site '{}' is of kind html but has no [site.html] section",
                        site.name
                    ))
                })?;
                validate_html_selectors(&site.name, selectors)?;
            }
            SiteKind::Json => {
                let pointers = site.json.as_ref().ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "Site '{}' is of kind json but has no [site.json] section",
                        site.name
                    ))
                })?;
                for pointer in std::iter::once(&pointers.items).chain(&pointers.fallback_items) {
                    validate_pointer(&site.name, pointer)?;
                }
                validate_pointer(&site.name, &pointers.title)?;
            }
        }
    }

    Ok(())
}

fn validate_html_selectors(site: &str, selectors: &HtmlSelectors) -> Result<(), ConfigError> {
    let required = [&selectors.items, &selectors.title];
    let optional = [
        &selectors.company,
        &selectors.location,
        &selectors.link,
        &selectors.description,
        &selectors.experience,
        &selectors.next_page,
        &selectors.tech_stack,
        &selectors.skills,
        &selectors.salary,
        &selectors.deadline,
        &selectors.work_location,
    ];

    for selector in required
        .into_iter()
        .chain(&selectors.fallback_items)
        .chain(optional.into_iter().flatten())
    {
        Selector::parse(selector).map_err(|e| {
            ConfigError::InvalidSelector(format!("site '{}', selector '{}': {}", site, selector, e))
        })?;
    }

    if let Some(pattern) = &selectors.detail_link_pattern {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidSelector(format!("site '{}', pattern '{}': {}", site, pattern, e))
        })?;
    }

    Ok(())
}

/// A JSON pointer is empty (whole document) or starts with '/'
fn validate_pointer(site: &str, pointer: &str) -> Result<(), ConfigError> {
    if !pointer.is_empty() && !pointer.starts_with('/') {
        return Err(ConfigError::InvalidSelector(format!(
            "site '{}', JSON pointer '{}' must start with '/'",
            site, pointer
        )));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
