//! Listing and crawl-result value types
//!
//! `CrawlResult` is the contract shared with the API layer, batch jobs and
//! test harnesses, so its serialized shape must stay stable.

use crate::state::TerminationReason;
use crate::url::trailing_numeric_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A lightweight, not-yet-enriched posting record from a search-results page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListingStub {
    /// External id on the source site, when the list page exposes one
    pub id: Option<String>,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub description: String,
    pub experience: String,
}

impl JobListingStub {
    /// Creates a stub with only a title and URL set
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Fills a missing id from a trailing numeric URL segment
    ///
    /// An explicit, non-blank id always wins; the URL heuristic is only a
    /// last resort.
    pub fn resolve_id(&mut self) {
        let has_explicit = self
            .id
            .as_deref()
            .map(|id| !id.trim().is_empty())
            .unwrap_or(false);

        if has_explicit {
            return;
        }

        self.id = trailing_numeric_id(&self.url);
    }
}

/// Detail-page-only fields, every one of them optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentFields {
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub salary: Option<String>,
    pub deadline: Option<String>,
    pub work_location: Option<String>,
}

impl EnrichmentFields {
    /// Returns true if the detail page yielded nothing usable
    pub fn is_empty(&self) -> bool {
        self.tech_stack.is_empty()
            && self.required_skills.is_empty()
            && self.salary.is_none()
            && self.deadline.is_none()
            && self.work_location.is_none()
    }
}

/// A listing in the unified schema served to downstream consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedJobListing {
    pub id: Option<String>,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub description: String,
    pub experience: String,
    pub site_name: String,
    pub crawled_at: DateTime<Utc>,
    #[serde(flatten)]
    pub enrichment: EnrichmentFields,
}

impl NormalizedJobListing {
    /// Wraps a stub with its site and crawl timestamp
    pub fn from_stub(stub: JobListingStub, site_name: &str, crawled_at: DateTime<Utc>) -> Self {
        Self {
            id: stub.id,
            title: stub.title,
            company: stub.company,
            location: stub.location,
            url: stub.url,
            description: stub.description,
            experience: stub.experience,
            site_name: site_name.to_string(),
            crawled_at,
            enrichment: EnrichmentFields::default(),
        }
    }

    /// The list-page fields of this listing
    pub fn to_stub(&self) -> JobListingStub {
        JobListingStub {
            id: self.id.clone(),
            title: self.title.clone(),
            company: self.company.clone(),
            location: self.location.clone(),
            url: self.url.clone(),
            description: self.description.clone(),
            experience: self.experience.clone(),
        }
    }

    /// Key identifying this listing within its site
    ///
    /// The external id when present, otherwise the lower-cased
    /// `company|title` composite.
    pub fn listing_key(&self) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!(
                "{}|{}",
                self.company.trim().to_lowercase(),
                self.title.trim().to_lowercase()
            ),
        }
    }
}

/// Outcome of crawling one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub success: bool,
    pub site: String,
    pub search_keyword: Option<String>,
    pub total_results: usize,
    pub listings: Vec<NormalizedJobListing>,
    /// Canonical query URL for "view on site" links
    pub search_url: String,
    pub from_cache: bool,
    /// Expiry of the cache entry backing this result
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<TerminationReason>,
    #[serde(default)]
    pub pages_fetched: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
}

impl CrawlResult {
    /// Builds a successful result; `total_results` follows the listings
    pub fn success(
        site: &str,
        search_keyword: Option<&str>,
        search_url: &str,
        listings: Vec<NormalizedJobListing>,
    ) -> Self {
        Self {
            success: true,
            site: site.to_string(),
            search_keyword: search_keyword.map(str::to_string),
            total_results: listings.len(),
            listings,
            search_url: search_url.to_string(),
            from_cache: false,
            cached_at: None,
            error: None,
            message: None,
            termination: None,
            pages_fetched: 0,
            saved_count: None,
            persistence_error: None,
        }
    }

    /// Builds a failed result carrying a diagnostic
    pub fn failure(
        site: &str,
        search_keyword: Option<&str>,
        search_url: &str,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        Self {
            success: false,
            site: site.to_string(),
            search_keyword: search_keyword.map(str::to_string),
            total_results: 0,
            listings: Vec::new(),
            search_url: search_url.to_string(),
            from_cache: false,
            cached_at: None,
            message: Some(format!("Failed to crawl {}: {}", site, error)),
            error: Some(error),
            termination: None,
            pages_fetched: 0,
            saved_count: None,
            persistence_error: None,
        }
    }
}

/// A site to crawl as part of a multi-site request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteTarget {
    pub name: String,
    pub url: String,
}

impl SiteTarget {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Outcome of a multi-site crawl, one slot per requested site in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiCrawlResult {
    pub search_keyword: Option<String>,
    pub sites: Vec<CrawlResult>,
}

/// Acknowledgement for administrative cache operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheAck {
    pub success: bool,
    pub cleared: usize,
    pub message: String,
}
