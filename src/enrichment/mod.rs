//! Background enrichment of crawled listings
//!
//! After a successful fresh crawl the coordinator submits the final listing
//! set here and returns without waiting. Workers derive employer profiles
//! and store them through the persistence gateway.

mod company;
mod queue;

pub use company::{build_profiles, CompanyEnricher, ListingProfiler};
pub use queue::{EnrichmentHandle, EnrichmentQueue, EnrichmentStatus};

use crate::models::NormalizedJobListing;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors raised by the enrichment collaborator
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Enrichment queue is full")]
    QueueFull,

    #[error("Enrichment queue is closed")]
    QueueClosed,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Enrichment task failed: {0}")]
    Task(String),
}

/// The final listing set of one site crawl
#[derive(Debug, Clone)]
pub struct EnrichmentJob {
    pub site_name: String,
    pub listings: Vec<NormalizedJobListing>,
}
