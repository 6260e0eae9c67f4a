//! Coordinator behavior against in-process stub adapters

use crate::common::{company_stub, stub, StubAdapter};
use chrono::{Duration as ChronoDuration, Utc};
use job_harvester::enrichment::{EnrichmentQueue, ListingProfiler};
use job_harvester::storage::{
    CompanyProfile, ListingGateway, SqliteStorage, StorageError, StorageResult,
};
use job_harvester::{
    Coordinator, ManualClock, NormalizedJobListing, RateLimiter, SiteTarget, TerminationReason,
};
use std::sync::Arc;
use std::time::Duration;

fn limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(Duration::ZERO))
}

fn ids(listings: &[NormalizedJobListing]) -> Vec<&str> {
    listings.iter().filter_map(|l| l.id.as_deref()).collect()
}

#[tokio::test]
async fn test_end_to_end_duplicate_removed() {
    let adapter = Arc::new(
        StubAdapter::new(
            "Alpha",
            vec![vec![
                stub("1", "Backend Engineer"),
                stub("2", "Backend Lead"),
                stub("1", "Backend Engineer"),
            ]],
        )
        .single_page(),
    );
    let coordinator = Coordinator::builder()
        .with_adapter(adapter.clone(), limiter())
        .build();

    let result = coordinator
        .crawl_site("Alpha", "https://alpha.example", Some("backend"), 3, false)
        .await;

    assert!(result.success);
    assert_eq!(result.total_results, 2);
    assert_eq!(ids(&result.listings), vec!["1", "2"]);
    assert_eq!(result.search_keyword.as_deref(), Some("backend"));
    assert_eq!(result.termination, Some(TerminationReason::NoNextPage));
    assert!(!result.from_cache);
    assert!(result.cached_at.is_some());
    assert_eq!(adapter.fetches(), 1);
}

#[tokio::test]
async fn test_pagination_until_empty_page() {
    let pages = vec![
        (1..=5).map(|i| stub(&i.to_string(), "Engineer")).collect(),
        (6..=10).map(|i| stub(&i.to_string(), "Engineer")).collect(),
        Vec::new(),
    ];
    let adapter = Arc::new(StubAdapter::new("Alpha", pages));
    let coordinator = Coordinator::builder()
        .with_adapter(adapter.clone(), limiter())
        .build();

    let result = coordinator
        .crawl_site("Alpha", "https://alpha.example", None, 0, false)
        .await;

    assert_eq!(result.total_results, 10);
    assert_eq!(result.pages_fetched, 3);
    assert_eq!(result.termination, Some(TerminationReason::EmptyPage));
    assert_eq!(adapter.fetches(), 3);
}

#[tokio::test]
async fn test_fault_isolation_across_sites() {
    let page = |prefix: &str| vec![vec![stub(&format!("{}1", prefix), "Engineer")]];
    let coordinator = Coordinator::builder()
        .with_adapter(
            Arc::new(StubAdapter::new("Alpha", page("a")).single_page()),
            limiter(),
        )
        .with_adapter(Arc::new(StubAdapter::failing("Beta", 500)), limiter())
        .with_adapter(
            Arc::new(StubAdapter::new("Gamma", page("c")).single_page()),
            limiter(),
        )
        .build();

    let targets = vec![
        SiteTarget::new("Alpha", "https://alpha.example"),
        SiteTarget::new("Beta", "https://beta.example"),
        SiteTarget::new("Gamma", "https://gamma.example"),
    ];
    let result = coordinator
        .crawl_multiple(targets, Some("rust"), 5, false)
        .await;

    assert_eq!(result.search_keyword.as_deref(), Some("rust"));
    let sites: Vec<&str> = result.sites.iter().map(|r| r.site.as_str()).collect();
    assert_eq!(sites, vec!["Alpha", "Beta", "Gamma"]);

    assert!(result.sites[0].success);
    assert!(!result.sites[1].success);
    assert!(result.sites[1].error.is_some());
    assert!(result.sites[2].success);
    assert_eq!(result.sites[2].total_results, 1);
}

#[tokio::test]
async fn test_unsupported_site_in_multi_crawl() {
    let adapter = Arc::new(StubAdapter::new("Alpha", vec![vec![stub("1", "Engineer")]]));
    let coordinator = Coordinator::builder()
        .with_adapter(adapter.clone(), limiter())
        .build();

    let targets = vec![SiteTarget::new("Unknown", "https://unknown.example")];
    let result = coordinator.crawl_multiple(targets, None, 5, false).await;

    assert_eq!(result.sites.len(), 1);
    assert!(!result.sites[0].success);
    assert_eq!(adapter.fetches(), 0);
}

#[tokio::test]
async fn test_ttl_boundary() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let adapter = Arc::new(StubAdapter::new("Alpha", vec![vec![stub("1", "Engineer")]]).single_page());
    let coordinator = Coordinator::builder()
        .with_adapter(adapter.clone(), limiter())
        .with_clock(clock.clone())
        .cache_ttl(Duration::from_secs(60))
        .build();

    let crawl = || coordinator.crawl_site("Alpha", "https://alpha.example", None, 10, false);

    assert!(!crawl().await.from_cache);

    clock.advance(ChronoDuration::seconds(59));
    assert!(crawl().await.from_cache);
    assert_eq!(adapter.fetches(), 1);

    clock.advance(ChronoDuration::seconds(1));
    let expired = crawl().await;
    assert!(!expired.from_cache);
    assert_eq!(adapter.fetches(), 2);
}

#[tokio::test]
async fn test_force_refresh_bypasses_and_overwrites_cache() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let adapter = Arc::new(StubAdapter::new("Alpha", vec![vec![stub("1", "Engineer")]]).single_page());
    let coordinator = Coordinator::builder()
        .with_adapter(adapter.clone(), limiter())
        .with_clock(clock.clone())
        .cache_ttl(Duration::from_secs(60))
        .build();

    let first = coordinator
        .crawl_site("Alpha", "https://alpha.example", None, 10, false)
        .await;

    clock.advance(ChronoDuration::seconds(10));
    let forced = coordinator
        .crawl_site("Alpha", "https://alpha.example", None, 10, true)
        .await;
    assert!(!forced.from_cache);
    assert_eq!(adapter.fetches(), 2);
    assert!(forced.cached_at > first.cached_at);

    let cached = coordinator
        .crawl_site("Alpha", "https://alpha.example", None, 10, false)
        .await;
    assert!(cached.from_cache);
    assert_eq!(cached.cached_at, forced.cached_at);
    assert_eq!(adapter.fetches(), 2);
}

#[tokio::test]
async fn test_failed_crawl_is_not_cached() {
    let adapter = Arc::new(StubAdapter::failing("Alpha", 503));
    let coordinator = Coordinator::builder()
        .with_adapter(adapter.clone(), limiter())
        .build();

    for _ in 0..2 {
        let result = coordinator
            .crawl_site("Alpha", "https://alpha.example", None, 10, false)
            .await;
        assert!(!result.success);
        assert!(result.message.is_some());
    }

    assert_eq!(adapter.fetches(), 2);
    assert_eq!(coordinator.cached_results(), 0);
}

#[tokio::test]
async fn test_results_are_persisted_idempotently() {
    let storage = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let adapter = Arc::new(
        StubAdapter::new(
            "Alpha",
            vec![vec![stub("1", "Engineer"), stub("2", "Designer")]],
        )
        .single_page(),
    );
    let coordinator = Coordinator::builder()
        .with_adapter(adapter, limiter())
        .with_gateway(storage.clone())
        .build();

    let first = coordinator
        .crawl_site("Alpha", "https://alpha.example", None, 10, false)
        .await;
    assert_eq!(first.saved_count, Some(2));
    assert!(first.persistence_error.is_none());

    let cached = coordinator
        .crawl_site("Alpha", "https://alpha.example", None, 10, false)
        .await;
    assert!(cached.from_cache);
    assert_eq!(cached.saved_count, None);

    let refreshed = coordinator
        .crawl_site("Alpha", "https://alpha.example", None, 10, true)
        .await;
    assert_eq!(refreshed.saved_count, Some(0));

    assert_eq!(storage.count_listings(Some("Alpha")).unwrap(), 2);
}

/// Gateway that rejects every write
struct BrokenGateway;

impl ListingGateway for BrokenGateway {
    fn save_listings(
        &self,
        _site_name: &str,
        _site_url: &str,
        _listings: &[NormalizedJobListing],
        _search_keyword: Option<&str>,
    ) -> StorageResult<usize> {
        Err(StorageError::Database("disk full".to_string()))
    }

    fn save_company_profiles(&self, _profiles: &[CompanyProfile]) -> StorageResult<usize> {
        Err(StorageError::Database("disk full".to_string()))
    }
}

#[tokio::test]
async fn test_persistence_failure_is_annotated_not_fatal() {
    let adapter = Arc::new(StubAdapter::new("Alpha", vec![vec![stub("1", "Engineer")]]).single_page());
    let coordinator = Coordinator::builder()
        .with_adapter(adapter, limiter())
        .with_gateway(Arc::new(BrokenGateway))
        .build();

    let result = coordinator
        .crawl_site("Alpha", "https://alpha.example", None, 10, false)
        .await;

    assert!(result.success);
    assert_eq!(result.total_results, 1);
    assert_eq!(result.saved_count, None);
    assert!(result.persistence_error.unwrap().contains("disk full"));
}

#[tokio::test]
async fn test_enrichment_runs_in_background() {
    let storage = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let queue = EnrichmentQueue::start(Arc::new(ListingProfiler::new(storage.clone())), 1, 4);
    let adapter = Arc::new(
        StubAdapter::new(
            "Alpha",
            vec![vec![
                company_stub("1", "Engineer", "ACME"),
                company_stub("2", "Designer", "ACME"),
                company_stub("3", "Analyst", "Initech"),
            ]],
        )
        .single_page(),
    );
    let coordinator = Coordinator::builder()
        .with_adapter(adapter, limiter())
        .with_gateway(storage.clone())
        .with_enrichment_queue(queue)
        .build();

    let result = coordinator
        .crawl_site("Alpha", "https://alpha.example", None, 10, false)
        .await;
    assert!(result.success);

    coordinator.wait_for_enrichment().await;

    let acme = storage.company_profile("Alpha", "ACME").unwrap().unwrap();
    assert_eq!(acme.listing_count, 2);
    assert!(storage.company_profile("Alpha", "Initech").unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_returns_partial_results() {
    let pages = (1..=5).map(|i| vec![stub(&i.to_string(), "Engineer")]).collect();
    let adapter = Arc::new(StubAdapter::new("Alpha", pages).with_delay(Duration::from_millis(100)));
    let coordinator = Coordinator::builder()
        .with_adapter(adapter.clone(), limiter())
        .build();

    let result = coordinator
        .crawl_site_with_timeout(
            "Alpha",
            "https://alpha.example",
            None,
            0,
            false,
            Duration::from_millis(250),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.total_results, 2);
    assert_eq!(result.termination, Some(TerminationReason::DeadlineReached));
    assert_eq!(adapter.fetches(), 3);
}

#[tokio::test]
async fn test_deadline_cut_result_is_not_cached() {
    let adapter = Arc::new(StubAdapter::new("Alpha", vec![vec![stub("1", "Engineer")]]).single_page());
    let coordinator = Coordinator::builder()
        .with_adapter(adapter.clone(), limiter())
        .build();

    let cut = coordinator
        .crawl_site_with_timeout("Alpha", "https://alpha.example", None, 0, false, Duration::ZERO)
        .await;
    assert!(cut.success);
    assert_eq!(cut.termination, Some(TerminationReason::DeadlineReached));
    assert_eq!(coordinator.cached_results(), 0);
    let fetches_after_cut = adapter.fetches();

    let full = coordinator
        .crawl_site("Alpha", "https://alpha.example", None, 0, false)
        .await;
    assert!(!full.from_cache);
    assert_eq!(full.total_results, 1);
    assert!(adapter.fetches() > fetches_after_cut);
}

#[tokio::test]
async fn test_multi_crawl_blank_keyword_is_none() {
    let adapter = Arc::new(StubAdapter::new("Alpha", vec![vec![stub("1", "Engineer")]]).single_page());
    let coordinator = Coordinator::builder()
        .with_adapter(adapter, limiter())
        .build();

    let result = coordinator
        .crawl_multiple(
            vec![SiteTarget::new("Alpha", "https://alpha.example")],
            Some("  "),
            5,
            false,
        )
        .await;

    assert_eq!(result.search_keyword, None);
    assert_eq!(result.sites[0].search_keyword, None);
}

#[tokio::test(start_paused = true)]
async fn test_shared_limiter_spaces_sites() {
    let shared = Arc::new(RateLimiter::new(Duration::from_millis(200)));
    let coordinator = Coordinator::builder()
        .with_adapter(
            Arc::new(StubAdapter::new("Alpha", vec![vec![stub("a", "Engineer")]]).single_page()),
            shared.clone(),
        )
        .with_adapter(
            Arc::new(StubAdapter::new("Beta", vec![vec![stub("b", "Engineer")]]).single_page()),
            shared.clone(),
        )
        .enrich_details(false)
        .build();

    let start = tokio::time::Instant::now();
    let result = coordinator
        .crawl_multiple(
            vec![
                SiteTarget::new("Alpha", "https://alpha.example"),
                SiteTarget::new("Beta", "https://beta.example"),
            ],
            None,
            5,
            false,
        )
        .await;

    assert!(result.sites.iter().all(|r| r.success));
    assert_eq!(shared.turns(), 2);
    assert!(start.elapsed() >= Duration::from_millis(200));
}
