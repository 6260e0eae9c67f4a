//! Single-site crawl pipeline
//!
//! Composes the pagination controller, the site adapter and the rate
//! limiter: paginate, then enrich each listing from its detail page one at
//! a time, every detail request taking its own limiter turn.

use crate::crawler::{PaginationController, RateLimiter};
use crate::models::{CrawlResult, NormalizedJobListing};
use crate::sites::SiteAdapter;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::Instant;
use url::Url;

/// Parameters of one site crawl
#[derive(Debug, Clone, Copy)]
pub struct CrawlRequest<'a> {
    pub site_url: &'a Url,
    pub keyword: Option<&'a str>,
    /// Zero means uncapped
    pub max_results: usize,
    pub deadline: Option<Instant>,
}

/// Crawls one site end to end
#[derive(Clone)]
pub struct CrawlPipeline {
    adapter: Arc<dyn SiteAdapter>,
    limiter: Arc<RateLimiter>,
    enrich_details: bool,
}

impl CrawlPipeline {
    pub fn new(adapter: Arc<dyn SiteAdapter>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            adapter,
            limiter,
            enrich_details: true,
        }
    }

    pub fn with_enrichment(mut self, enrich_details: bool) -> Self {
        self.enrich_details = enrich_details;
        self
    }

    pub fn site_name(&self) -> &str {
        self.adapter.site_name()
    }

    /// Runs the crawl, always producing a result
    ///
    /// A failure on the first page yields `success = false`; later failures
    /// end pagination early and keep what was collected.
    pub async fn crawl(&self, request: CrawlRequest<'_>) -> CrawlResult {
        let site = self.adapter.site_name();

        let search_url = match self.adapter.search_url(request.site_url, request.keyword, 1) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::error!("{}: cannot build search URL: {}", site, e);
                return CrawlResult::failure(
                    site,
                    request.keyword,
                    request.site_url.as_str(),
                    e.to_string(),
                );
            }
        };

        tracing::info!(
            "{}: crawling (keyword: {}, max results: {})",
            site,
            request.keyword.unwrap_or("all"),
            request.max_results
        );

        let controller = PaginationController::new(
            self.adapter.as_ref(),
            &self.limiter,
            request.site_url,
            request.keyword,
            request.max_results,
        )
        .with_deadline(request.deadline);

        let outcome = match controller.run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("{}: first page failed: {}", site, e);
                return CrawlResult::failure(site, request.keyword, &search_url, e.to_string());
            }
        };

        let crawled_at = Utc::now();
        let mut listings: Vec<NormalizedJobListing> = outcome
            .stubs
            .into_iter()
            .map(|stub| NormalizedJobListing::from_stub(stub, site, crawled_at))
            .collect();

        if self.enrich_details {
            self.enrich(request.site_url, &mut listings, request.deadline).await;
        }

        tracing::info!(
            "{}: {} listings from {} pages ({})",
            site,
            listings.len(),
            outcome.pages_fetched,
            outcome.termination
        );

        let mut result = CrawlResult::success(site, request.keyword, &search_url, listings);
        result.termination = Some(outcome.termination);
        result.pages_fetched = outcome.pages_fetched;
        result
    }

    /// Fills detail-page fields, one request at a time
    ///
    /// Failures are logged and skipped. Nothing is requested once the
    /// deadline has passed.
    async fn enrich(
        &self,
        site_url: &Url,
        listings: &mut [NormalizedJobListing],
        deadline: Option<Instant>,
    ) {
        let site = self.adapter.site_name();
        let mut enriched = 0usize;

        for listing in listings.iter_mut() {
            let stub = listing.to_stub();
            let fetch = async {
                self.limiter.await_turn().await;
                self.adapter.fetch_detail_page(site_url, &stub).await
            };

            let fetched = match deadline {
                Some(deadline) if Instant::now() >= deadline => None,
                Some(deadline) => tokio::time::timeout_at(deadline, fetch).await.ok(),
                None => Some(fetch.await),
            };

            let body = match fetched {
                Some(Ok(Some(body))) => body,
                Some(Ok(None)) => continue,
                Some(Err(e)) => {
                    tracing::warn!(
                        "{}: detail fetch for '{}' failed: {}",
                        site,
                        listing.title,
                        e
                    );
                    continue;
                }
                None => {
                    tracing::info!("{}: deadline reached, skipping remaining details", site);
                    break;
                }
            };

            let fields = self.adapter.parse_detail_page(&body);
            if fields.is_empty() {
                tracing::debug!("{}: nothing on detail page of '{}'", site, listing.title);
            } else {
                enriched += 1;
            }
            listing.enrichment = fields;
        }

        tracing::debug!("{}: enriched {}/{} listings", site, enriched, listings.len());
    }
}
