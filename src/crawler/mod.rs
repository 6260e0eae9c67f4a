//! Crawler module for fetching and collecting job listings
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Request spacing through a shared rate limiter
//! - Pagination and deduplication for one site
//! - Multi-site fan-out
//! - The cache-wrapped coordinator used by callers

mod coordinator;
mod dedup;
mod fetcher;
mod orchestrator;
mod pagination;
mod pipeline;
mod rate_limiter;

pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use dedup::{dedupe, Deduplicator, ListingIdentity};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, RetryPolicy};
pub use orchestrator::MultiSiteOrchestrator;
pub use pagination::{PaginationController, PaginationOutcome, MAX_PAGES};
pub use pipeline::{CrawlPipeline, CrawlRequest};
pub use rate_limiter::RateLimiter;
