//! Site adapters: the per-site extraction contract
//!
//! Each supported job board is served by one [`SiteAdapter`]. Adapters know
//! how to build search URLs, fetch and parse search-result pages into
//! [`JobListingStub`]s and fetch and parse detail pages into
//! [`EnrichmentFields`]. They are driven by per-site configuration, so
//! changing markup is handled by editing selectors rather than code.

mod denylist;
mod html;
mod json;

pub use denylist::{normalize_title, Denylist};
pub use html::HtmlBoardAdapter;
pub use json::JsonApiAdapter;

use crate::config::{Config, RateLimitScope, SiteConfig, SiteKind};
use crate::crawler::{build_http_client, HttpFetcher, RateLimiter, RetryPolicy};
use crate::models::{EnrichmentFields, JobListingStub};
use crate::url::{build_search_url, SearchEndpoint};
use crate::{ConfigError, HarvestError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Listings parsed from one search-results page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub stubs: Vec<JobListingStub>,
    pub has_next_page: bool,
}

/// Extraction contract for one job board
///
/// Fetch methods perform exactly one logical request; the caller takes the
/// rate-limiter turn before calling them. Parse methods never fail: items
/// that cannot be parsed are logged and skipped.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Display name of the site
    fn site_name(&self) -> &str;

    /// URL of search-results page `page` (1-based)
    fn search_url(&self, site_url: &Url, keyword: Option<&str>, page: u32) -> Result<Url>;

    /// Fetches the raw body of one search-results page
    async fn fetch_search_page(
        &self,
        site_url: &Url,
        keyword: Option<&str>,
        page: u32,
    ) -> Result<String>;

    /// Parses a search-results page into stubs and a next-page flag
    fn parse_search_page(&self, body: &str, site_url: &Url) -> SearchPage;

    /// Fetches the detail page of a listing; None if the listing has no detail location
    async fn fetch_detail_page(
        &self,
        site_url: &Url,
        stub: &JobListingStub,
    ) -> Result<Option<String>>;

    /// Best-effort extraction of detail-only fields
    fn parse_detail_page(&self, body: &str) -> EnrichmentFields;
}

/// Search endpoint shape shared by the configured adapters
#[derive(Debug, Clone)]
pub(crate) struct SearchSettings {
    search_path: String,
    keyword_param: String,
    page_param: String,
    extra_params: BTreeMap<String, String>,
}

impl SearchSettings {
    pub(crate) fn from_site(site: &SiteConfig) -> Self {
        Self {
            search_path: site.search_path.clone(),
            keyword_param: site.keyword_param.clone(),
            page_param: site.page_param.clone(),
            extra_params: site.extra_params.clone(),
        }
    }

    pub(crate) fn url(&self, site_url: &Url, keyword: Option<&str>, page: u32) -> Result<Url> {
        let endpoint = SearchEndpoint {
            search_path: &self.search_path,
            keyword_param: &self.keyword_param,
            page_param: &self.page_param,
            extra_params: &self.extra_params,
        };
        Ok(build_search_url(site_url, &endpoint, keyword, page)?)
    }
}

/// An adapter together with the limiter its requests go through
#[derive(Clone)]
pub struct RegisteredSite {
    pub adapter: Arc<dyn SiteAdapter>,
    pub limiter: Arc<RateLimiter>,
}

/// Adapters by site name (case-insensitive)
#[derive(Clone, Default)]
pub struct SiteRegistry {
    sites: HashMap<String, RegisteredSite>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds adapters for every configured site
    ///
    /// All adapters share one HTTP client. With the global rate-limit scope
    /// they also share one limiter; otherwise each site gets its own.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
        let client = build_http_client(&config.user_agent, timeout)?;
        let delay = Duration::from_millis(config.crawler.request_delay_ms);
        let retry = RetryPolicy::from_config(&config.crawler);
        let global = Arc::new(RateLimiter::new(delay));

        let mut registry = Self::new();
        for site in &config.sites {
            let limiter = match config.crawler.rate_limit_scope {
                RateLimitScope::Global => Arc::clone(&global),
                RateLimitScope::PerSite => Arc::new(RateLimiter::new(delay)),
            };
            let fetcher = Arc::new(HttpFetcher::new(
                client.clone(),
                Arc::clone(&limiter),
                retry,
            ));

            let adapter: Arc<dyn SiteAdapter> = match site.kind {
                SiteKind::Html => Arc::new(HtmlBoardAdapter::from_config(site, fetcher)?),
                SiteKind::Json => Arc::new(JsonApiAdapter::from_config(site, fetcher)?),
            };

            tracing::debug!("Registered {:?} adapter for {}", site.kind, site.name);
            registry.register(adapter, limiter);
        }

        Ok(registry)
    }

    /// Adds or replaces the adapter for its site name
    pub fn register(&mut self, adapter: Arc<dyn SiteAdapter>, limiter: Arc<RateLimiter>) {
        let key = registry_key(adapter.site_name());
        self.sites.insert(key, RegisteredSite { adapter, limiter });
    }

    pub fn get(&self, site_name: &str) -> Option<RegisteredSite> {
        self.sites.get(&registry_key(site_name)).cloned()
    }

    pub fn contains(&self, site_name: &str) -> bool {
        self.sites.contains_key(&registry_key(site_name))
    }

    /// Registered site names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .sites
            .values()
            .map(|site| site.adapter.site_name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

fn registry_key(site_name: &str) -> String {
    site_name.trim().to_lowercase()
}

/// Error for a site configured without the section its kind requires
pub(crate) fn missing_section(site: &SiteConfig, section: &str) -> HarvestError {
    HarvestError::Config(ConfigError::Validation(format!(
        "Site '{}' requires a [site.{}] section",
        site.name, section
    )))
}
