use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Job Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteConfig>,
}

impl Config {
    /// Looks up a configured site by name (case-insensitive)
    pub fn site(&self, name: &str) -> Option<&SiteConfig> {
        self.sites
            .iter()
            .find(|site| site.name.eq_ignore_ascii_case(name.trim()))
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum time between two outbound requests through one limiter (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Retries for transient fetch failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff before the first retry; doubles on every further attempt (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Whether listings are enriched from their detail pages
    #[serde(rename = "enrich-details", default = "default_true")]
    pub enrich_details: bool,

    /// Maximum number of sites crawled at the same time
    #[serde(rename = "max-concurrent-sites", default = "default_max_concurrent_sites")]
    pub max_concurrent_sites: u32,

    /// Whether all sites share one rate limiter or each gets its own
    #[serde(rename = "rate-limit-scope", default)]
    pub rate_limit_scope: RateLimitScope,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            enrich_details: true,
            max_concurrent_sites: default_max_concurrent_sites(),
            rate_limit_scope: RateLimitScope::default(),
        }
    }
}

/// Sharing policy for rate limiters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateLimitScope {
    /// One limiter shared by every site pipeline
    #[default]
    Global,
    /// One limiter per site
    PerSite,
}

/// Result cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached crawl result (seconds)
    #[serde(rename = "ttl-seconds", default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Upper bound on cached results before eviction kicks in
    #[serde(rename = "max-entries", default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            max_entries: default_max_entries(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Number of pooled SQLite connections
    #[serde(rename = "pool-size", default = "default_pool_size")]
    pub pool_size: u32,
}

/// Background employer-enrichment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Number of worker tasks draining the queue
    #[serde(default = "default_enrichment_workers")]
    pub workers: u32,

    /// Jobs that may wait in the queue before submissions are rejected
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: default_enrichment_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Extraction strategy for a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    Html,
    Json,
}

/// One supported job board
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Display name, also the lookup key for adapters
    pub name: String,

    /// Base URL of the site
    pub url: String,

    pub kind: SiteKind,

    /// Path of the search endpoint, relative to `url`
    #[serde(rename = "search-path", default = "default_search_path")]
    pub search_path: String,

    #[serde(rename = "keyword-param", default = "default_keyword_param")]
    pub keyword_param: String,

    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// Fixed query parameters appended to every search request
    #[serde(rename = "extra-params", default)]
    pub extra_params: BTreeMap<String, String>,

    /// Additional UI-chrome titles to discard for this site
    #[serde(default)]
    pub denylist: Vec<String>,

    #[serde(default)]
    pub html: Option<HtmlSelectors>,

    #[serde(default)]
    pub json: Option<JsonPointers>,
}

/// CSS selectors driving an HTML job board
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HtmlSelectors {
    /// Primary selector for one listing card
    pub items: String,

    /// Alternate card selectors tried in order when `items` matches nothing
    #[serde(rename = "fallback-items", default)]
    pub fallback_items: Vec<String>,

    pub title: String,

    #[serde(default)]
    pub company: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    /// Anchor inside a card; defaults to the first `a[href]`
    #[serde(default)]
    pub link: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub experience: Option<String>,

    /// Card attribute holding the external id (e.g. `data-job-id`)
    #[serde(rename = "id-attribute", default)]
    pub id_attribute: Option<String>,

    #[serde(rename = "next-page", default)]
    pub next_page: Option<String>,

    /// Regex matched against hrefs by the last-resort anchor scan
    #[serde(rename = "detail-link-pattern", default)]
    pub detail_link_pattern: Option<String>,

    #[serde(rename = "tech-stack", default)]
    pub tech_stack: Option<String>,

    #[serde(default)]
    pub skills: Option<String>,

    #[serde(default)]
    pub salary: Option<String>,

    #[serde(default)]
    pub deadline: Option<String>,

    #[serde(rename = "work-location", default)]
    pub work_location: Option<String>,
}

/// JSON pointers driving a JSON search API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonPointers {
    /// Pointer to the array of items in a search response
    pub items: String,

    #[serde(rename = "fallback-items", default)]
    pub fallback_items: Vec<String>,

    #[serde(default)]
    pub id: Option<String>,

    pub title: String,

    #[serde(default)]
    pub company: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub experience: Option<String>,

    /// Pointer to a boolean "more pages" flag in a search response
    #[serde(rename = "has-more", default)]
    pub has_more: Option<String>,

    /// Detail endpoint relative to the site URL, `{id}` is substituted
    #[serde(rename = "detail-path", default)]
    pub detail_path: Option<String>,

    #[serde(rename = "tech-stack", default)]
    pub tech_stack: Option<String>,

    #[serde(default)]
    pub skills: Option<String>,

    #[serde(default)]
    pub salary: Option<String>,

    #[serde(default)]
    pub deadline: Option<String>,

    #[serde(rename = "work-location", default)]
    pub work_location: Option<String>,
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_sites() -> u32 {
    4
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_max_entries() -> usize {
    512
}

fn default_pool_size() -> u32 {
    4
}

fn default_enrichment_workers() -> u32 {
    2
}

fn default_queue_capacity() -> usize {
    64
}

fn default_search_path() -> String {
    "/".to_string()
}

fn default_keyword_param() -> String {
    "q".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_true() -> bool {
    true
}
