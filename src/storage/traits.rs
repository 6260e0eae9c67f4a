//! Storage traits and error types
//!
//! This module defines the persistence gateway the crawl engine hands its
//! results to, and the associated error types.

use crate::models::NormalizedJobListing;
use crate::storage::CompanyProfile;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence gateway consumed by the crawl engine
///
/// Calls are blocking; async callers go through `spawn_blocking`.
/// Implementations must be idempotent: re-saving a listing that is already
/// stored for the same site is a no-op and is not counted again.
pub trait ListingGateway: Send + Sync {
    /// Stores listings crawled from one site
    ///
    /// # Returns
    ///
    /// The number of listings that were newly stored
    fn save_listings(
        &self,
        site_name: &str,
        site_url: &str,
        listings: &[NormalizedJobListing],
        search_keyword: Option<&str>,
    ) -> StorageResult<usize>;

    /// Inserts or refreshes employer profiles
    ///
    /// # Returns
    ///
    /// The number of profiles written
    fn save_company_profiles(&self, profiles: &[CompanyProfile]) -> StorageResult<usize>;
}
