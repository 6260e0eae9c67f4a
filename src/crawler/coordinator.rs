//! Crawl coordinator - the cache-wrapped facade over the crawl engine
//!
//! This is the entry point used by the API layer, batch jobs and the CLI:
//! - Looking up the site adapter for a request
//! - Serving fresh results from the cache
//! - Running the single-site pipeline on a miss or forced refresh
//! - Persisting and enriching successful fresh crawls
//!
//! Callers always get a `CrawlResult` back. Failures are reported through
//! `success = false` and never escape as errors.

use crate::cache::{CacheKey, CacheStore, Clock, SystemClock};
use crate::config::Config;
use crate::crawler::{CrawlPipeline, CrawlRequest, MultiSiteOrchestrator, RateLimiter};
use crate::enrichment::{EnrichmentJob, EnrichmentQueue, ListingProfiler};
use crate::models::{CacheAck, CrawlResult, MultiCrawlResult, SiteTarget};
use crate::sites::{SiteAdapter, SiteRegistry};
use crate::state::TerminationReason;
use crate::storage::{open_storage, ListingGateway};
use crate::{HarvestError, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_MAX_CACHE_ENTRIES: usize = 512;
const DEFAULT_MAX_CONCURRENT_SITES: usize = 4;

/// Main crawl coordinator
///
/// Cheap to clone; clones share the cache, the adapters and the
/// collaborators.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    registry: SiteRegistry,
    cache: CacheStore,
    cache_ttl: chrono::Duration,
    enrich_details: bool,
    orchestrator: MultiSiteOrchestrator,
    gateway: Option<Arc<dyn ListingGateway>>,
    enrichment: Option<EnrichmentQueue>,
}

impl Coordinator {
    /// Creates a coordinator from configuration
    ///
    /// Opens the SQLite gateway and, when enabled, starts the enrichment
    /// workers. Must be called from within a tokio runtime.
    pub fn new(config: &Config) -> Result<Self> {
        let registry = SiteRegistry::from_config(config)?;

        let storage = Arc::new(open_storage(
            Path::new(&config.output.database_path),
            config.output.pool_size as usize,
        )?);

        let mut builder = Self::builder()
            .with_registry(registry)
            .with_gateway(storage.clone())
            .cache_ttl(Duration::from_secs(config.cache.ttl_seconds))
            .max_cache_entries(config.cache.max_entries)
            .enrich_details(config.crawler.enrich_details)
            .max_concurrent_sites(config.crawler.max_concurrent_sites as usize);

        if config.enrichment.enabled {
            let queue = EnrichmentQueue::start(
                Arc::new(ListingProfiler::new(storage)),
                config.enrichment.workers as usize,
                config.enrichment.queue_capacity,
            );
            builder = builder.with_enrichment_queue(queue);
        }

        tracing::info!(
            "Coordinator ready with {} sites (cache TTL {}s)",
            config.sites.len(),
            config.cache.ttl_seconds
        );

        Ok(builder.build())
    }

    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    /// Crawls one site, serving from the cache unless `force_refresh` is set
    pub async fn crawl_site(
        &self,
        site_name: &str,
        site_url: &str,
        search_keyword: Option<&str>,
        max_results: usize,
        force_refresh: bool,
    ) -> CrawlResult {
        self.crawl_site_with_deadline(
            site_name,
            site_url,
            search_keyword,
            max_results,
            force_refresh,
            None,
        )
        .await
    }

    /// Like `crawl_site`, but stops issuing requests after `timeout`
    ///
    /// Whatever was collected before the timeout is returned.
    pub async fn crawl_site_with_timeout(
        &self,
        site_name: &str,
        site_url: &str,
        search_keyword: Option<&str>,
        max_results: usize,
        force_refresh: bool,
        timeout: Duration,
    ) -> CrawlResult {
        self.crawl_site_with_deadline(
            site_name,
            site_url,
            search_keyword,
            max_results,
            force_refresh,
            Some(Instant::now() + timeout),
        )
        .await
    }

    async fn crawl_site_with_deadline(
        &self,
        site_name: &str,
        site_url: &str,
        search_keyword: Option<&str>,
        max_results: usize,
        force_refresh: bool,
        deadline: Option<Instant>,
    ) -> CrawlResult {
        let keyword = search_keyword.map(str::trim).filter(|k| !k.is_empty());

        let registered = match self.inner.registry.get(site_name) {
            Some(registered) => registered,
            None => {
                let error = HarvestError::SiteUnsupported {
                    site: site_name.to_string(),
                };
                tracing::warn!("{}", error);
                return CrawlResult::failure(site_name, keyword, site_url, error.to_string());
            }
        };

        let site = registered.adapter.site_name().to_string();
        let key = CacheKey::new(&site, site_url, keyword, max_results);

        if force_refresh {
            tracing::debug!("{}: forced refresh, bypassing cache", site);
        } else {
            match self.inner.cache.get(&key) {
                Ok(Some(hit)) => {
                    tracing::info!(
                        "{}: serving {} cached listings (key {})",
                        site,
                        hit.result.total_results,
                        key
                    );
                    let mut result = hit.result;
                    result.from_cache = true;
                    result.cached_at = Some(hit.expires_at);
                    return result;
                }
                Ok(None) => tracing::debug!("{}: cache miss", site),
                Err(e) => tracing::warn!("{}: cache lookup failed, crawling fresh: {}", site, e),
            }
        }

        let parsed_url = match Url::parse(site_url) {
            Ok(url) => url,
            Err(e) => {
                let error = HarvestError::UrlParse(e);
                tracing::error!("{}: invalid site URL '{}': {}", site, site_url, error);
                return CrawlResult::failure(&site, keyword, site_url, error.to_string());
            }
        };

        let pipeline = CrawlPipeline::new(registered.adapter, registered.limiter)
            .with_enrichment(self.inner.enrich_details);

        let mut result = pipeline
            .crawl(CrawlRequest {
                site_url: &parsed_url,
                keyword,
                max_results,
                deadline,
            })
            .await;

        if !result.success {
            return result;
        }

        // A cut-short crawl must not answer later callers that have no deadline
        if result.termination == Some(TerminationReason::DeadlineReached) {
            tracing::debug!("{}: deadline cut the crawl short, not caching", site);
        } else {
            match self.inner.cache.put(key, result.clone(), self.inner.cache_ttl) {
                Ok(expires_at) => result.cached_at = Some(expires_at),
                Err(e) => tracing::warn!("{}: result not cached: {}", site, e),
            }
        }

        self.persist(&mut result, site_url).await;
        self.submit_enrichment(&result);

        result
    }

    /// Hands the listings to the gateway, annotating the outcome
    async fn persist(&self, result: &mut CrawlResult, site_url: &str) {
        let gateway = match &self.inner.gateway {
            Some(gateway) => Arc::clone(gateway),
            None => return,
        };

        let site = result.site.clone();
        let site_url = site_url.to_string();
        let keyword = result.search_keyword.clone();
        let listings = result.listings.clone();

        let saved = tokio::task::spawn_blocking(move || {
            gateway.save_listings(&site, &site_url, &listings, keyword.as_deref())
        })
        .await;

        match saved {
            Ok(Ok(count)) => {
                tracing::debug!("{}: {} new listings saved", result.site, count);
                result.saved_count = Some(count);
            }
            Ok(Err(e)) => {
                tracing::warn!("{}: persistence failed: {}", result.site, e);
                result.persistence_error = Some(e.to_string());
            }
            Err(e) => {
                tracing::warn!("{}: persistence task failed: {}", result.site, e);
                result.persistence_error = Some(e.to_string());
            }
        }
    }

    /// Queues background enrichment without waiting for it
    fn submit_enrichment(&self, result: &CrawlResult) {
        let queue = match &self.inner.enrichment {
            Some(queue) if !result.listings.is_empty() => queue,
            _ => return,
        };

        let job = EnrichmentJob {
            site_name: result.site.clone(),
            listings: result.listings.clone(),
        };

        match queue.submit(job) {
            Ok(handle) => tracing::debug!("{}: enrichment job {} queued", result.site, handle.id()),
            Err(e) => tracing::warn!("{}: enrichment skipped: {}", result.site, e),
        }
    }

    /// Crawls several sites concurrently
    ///
    /// The result holds one entry per target, in input order. A failing
    /// site never affects the others.
    pub async fn crawl_multiple(
        &self,
        targets: Vec<SiteTarget>,
        search_keyword: Option<&str>,
        max_results_per_site: usize,
        force_refresh: bool,
    ) -> MultiCrawlResult {
        let search_keyword = search_keyword.map(str::trim).filter(|k| !k.is_empty());
        tracing::info!(
            "Crawling {} sites (keyword: {})",
            targets.len(),
            search_keyword.unwrap_or("all")
        );

        let keyword = search_keyword.map(str::to_string);
        let sites = self
            .inner
            .orchestrator
            .run(targets, search_keyword, |target| {
                let coordinator = self.clone();
                let keyword = keyword.clone();
                async move {
                    coordinator
                        .crawl_site(
                            &target.name,
                            &target.url,
                            keyword.as_deref(),
                            max_results_per_site,
                            force_refresh,
                        )
                        .await
                }
            })
            .await;

        let succeeded = sites.iter().filter(|r| r.success).count();
        tracing::info!("Multi-site crawl done: {}/{} succeeded", succeeded, sites.len());

        MultiCrawlResult {
            search_keyword: keyword,
            sites,
        }
    }

    /// Drops every cached result
    pub fn clear_all_cache(&self) -> CacheAck {
        match self.inner.cache.clear_all() {
            Ok(cleared) => {
                tracing::info!("Cleared {} cached results", cleared);
                CacheAck {
                    success: true,
                    cleared,
                    message: format!("Cleared {} cached results", cleared),
                }
            }
            Err(e) => CacheAck {
                success: false,
                cleared: 0,
                message: e.to_string(),
            },
        }
    }

    /// Drops cached results past their expiry
    pub fn clear_expired_cache(&self) -> CacheAck {
        match self.inner.cache.clear_expired() {
            Ok(cleared) => {
                tracing::info!("Cleared {} expired cached results", cleared);
                CacheAck {
                    success: true,
                    cleared,
                    message: format!("Cleared {} expired cached results", cleared),
                }
            }
            Err(e) => CacheAck {
                success: false,
                cleared: 0,
                message: e.to_string(),
            },
        }
    }

    /// Names of the sites with a registered adapter, sorted
    pub fn site_names(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    pub fn supports(&self, site_name: &str) -> bool {
        self.inner.registry.contains(site_name)
    }

    /// Number of results currently cached, expired ones included
    pub fn cached_results(&self) -> usize {
        self.inner.cache.len()
    }

    /// Waits for queued enrichment jobs to finish
    pub async fn wait_for_enrichment(&self) {
        if let Some(queue) = &self.inner.enrichment {
            queue.wait_idle().await;
        }
    }
}

/// Builder for [`Coordinator`]
///
/// Used by tests and embedders that bring their own adapters, clock or
/// gateway instead of a config file.
pub struct CoordinatorBuilder {
    registry: SiteRegistry,
    clock: Arc<dyn Clock>,
    cache_ttl: Duration,
    max_cache_entries: usize,
    enrich_details: bool,
    max_concurrent_sites: usize,
    gateway: Option<Arc<dyn ListingGateway>>,
    enrichment: Option<EnrichmentQueue>,
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self {
            registry: SiteRegistry::new(),
            clock: Arc::new(SystemClock),
            cache_ttl: DEFAULT_CACHE_TTL,
            max_cache_entries: DEFAULT_MAX_CACHE_ENTRIES,
            enrich_details: true,
            max_concurrent_sites: DEFAULT_MAX_CONCURRENT_SITES,
            gateway: None,
            enrichment: None,
        }
    }
}

impl CoordinatorBuilder {
    pub fn with_registry(mut self, registry: SiteRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Registers one adapter with the limiter its requests go through
    pub fn with_adapter(mut self, adapter: Arc<dyn SiteAdapter>, limiter: Arc<RateLimiter>) -> Self {
        self.registry.register(adapter, limiter);
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn ListingGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn max_cache_entries(mut self, max_entries: usize) -> Self {
        self.max_cache_entries = max_entries;
        self
    }

    pub fn enrich_details(mut self, enabled: bool) -> Self {
        self.enrich_details = enabled;
        self
    }

    pub fn max_concurrent_sites(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent_sites = max_concurrent;
        self
    }

    pub fn with_enrichment_queue(mut self, queue: EnrichmentQueue) -> Self {
        self.enrichment = Some(queue);
        self
    }

    pub fn build(self) -> Coordinator {
        // Out-of-range TTLs are capped at a year
        let cache_ttl = chrono::Duration::from_std(self.cache_ttl)
            .ok()
            .filter(|ttl| *ttl <= chrono::Duration::days(365))
            .unwrap_or_else(|| chrono::Duration::days(365));

        Coordinator {
            inner: Arc::new(Inner {
                registry: self.registry,
                cache: CacheStore::new(self.clock, self.max_cache_entries),
                cache_ttl,
                enrich_details: self.enrich_details,
                orchestrator: MultiSiteOrchestrator::new(self.max_concurrent_sites),
                gateway: self.gateway,
                enrichment: self.enrichment,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::models::{EnrichmentFields, JobListingStub};
    use crate::sites::SearchPage;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serves the same single page of two listings on every request
    struct OnePageAdapter {
        fetches: AtomicU32,
    }

    impl OnePageAdapter {
        fn new() -> Self {
            Self {
                fetches: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl SiteAdapter for OnePageAdapter {
        fn site_name(&self) -> &str {
            "Alpha"
        }

        fn search_url(&self, site_url: &Url, _keyword: Option<&str>, page: u32) -> Result<Url> {
            Ok(site_url.join(&format!("/jobs?page={}", page))?)
        }

        async fn fetch_search_page(
            &self,
            _site_url: &Url,
            _keyword: Option<&str>,
            _page: u32,
        ) -> Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(String::new())
        }

        fn parse_search_page(&self, _body: &str, _site_url: &Url) -> SearchPage {
            let stubs = ["1", "2"]
                .iter()
                .map(|id| {
                    let mut stub = JobListingStub::new(
                        format!("Engineer {}", id),
                        format!("https://alpha.example/view/{}", id),
                    );
                    stub.id = Some(id.to_string());
                    stub
                })
                .collect();
            SearchPage {
                stubs,
                has_next_page: false,
            }
        }

        async fn fetch_detail_page(
            &self,
            _site_url: &Url,
            _stub: &JobListingStub,
        ) -> Result<Option<String>> {
            Ok(None)
        }

        fn parse_detail_page(&self, _body: &str) -> EnrichmentFields {
            EnrichmentFields::default()
        }
    }

    fn coordinator(adapter: Arc<OnePageAdapter>, clock: Arc<ManualClock>) -> Coordinator {
        Coordinator::builder()
            .with_adapter(adapter, Arc::new(RateLimiter::new(Duration::ZERO)))
            .with_clock(clock)
            .cache_ttl(Duration::from_secs(60))
            .build()
    }

    #[tokio::test]
    async fn test_unknown_site_fails_without_fetching() {
        let adapter = Arc::new(OnePageAdapter::new());
        let coordinator = coordinator(adapter.clone(), Arc::new(ManualClock::default()));

        let result = coordinator
            .crawl_site("Nowhere", "https://nowhere.example", None, 10, false)
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("Nowhere"));
        assert_eq!(adapter.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let adapter = Arc::new(OnePageAdapter::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let coordinator = coordinator(adapter.clone(), clock.clone());

        let first = coordinator
            .crawl_site("alpha", "https://alpha.example", Some("rust"), 10, false)
            .await;
        assert!(first.success);
        assert!(!first.from_cache);
        assert_eq!(first.site, "Alpha");
        assert_eq!(first.cached_at, Some(clock.now() + chrono::Duration::seconds(60)));

        let second = coordinator
            .crawl_site("Alpha", "https://alpha.example", Some("rust"), 10, false)
            .await;
        assert!(second.from_cache);
        assert_eq!(second.listings, first.listings);
        assert_eq!(second.cached_at, first.cached_at);
        assert_eq!(adapter.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_site_url_is_a_failure() {
        let adapter = Arc::new(OnePageAdapter::new());
        let coordinator = coordinator(adapter.clone(), Arc::new(ManualClock::default()));

        let result = coordinator.crawl_site("Alpha", "not a url", None, 10, false).await;

        assert!(!result.success);
        assert_eq!(adapter.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_acks() {
        let adapter = Arc::new(OnePageAdapter::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let coordinator = coordinator(adapter, clock.clone());

        coordinator
            .crawl_site("Alpha", "https://alpha.example", Some("a"), 10, false)
            .await;
        coordinator
            .crawl_site("Alpha", "https://alpha.example", Some("b"), 10, false)
            .await;
        assert_eq!(coordinator.cached_results(), 2);

        let ack = coordinator.clear_expired_cache();
        assert!(ack.success);
        assert_eq!(ack.cleared, 0);

        clock.advance(chrono::Duration::seconds(61));
        let ack = coordinator.clear_expired_cache();
        assert_eq!(ack.cleared, 2);

        let ack = coordinator.clear_all_cache();
        assert!(ack.success);
        assert_eq!(ack.cleared, 0);
    }
}
