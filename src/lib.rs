//! Job Harvester: a polite job-board aggregator
//!
//! This crate implements the crawl-and-cache engine that collects job postings
//! from several external job boards, normalizes them into one schema and hands
//! them to a persistence gateway, while keeping the load on the external sites
//! low through caching, rate limiting and bounded pagination.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod enrichment;
pub mod models;
pub mod sites;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Job Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("No adapter registered for site '{site}'")]
    SiteUnsupported { site: String },

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Invalid pagination transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PaginationPhase,
        to: state::PaginationPhase,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Job Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use cache::{CacheKey, CacheStore, Clock, ManualClock, SystemClock};
pub use config::Config;
pub use crawler::{Coordinator, CoordinatorBuilder, RateLimiter};
pub use models::{
    CacheAck, CrawlResult, EnrichmentFields, JobListingStub, MultiCrawlResult,
    NormalizedJobListing, SiteTarget,
};
pub use sites::{SiteAdapter, SiteRegistry};
pub use state::{PaginationPhase, PaginationState, TerminationReason};
