//! Storage module for persisting crawl results
//!
//! This module is the persistence gateway behind the crawl engine:
//! - SQLite schema management
//! - A pooled, health-checked set of connections
//! - Idempotent listing saves
//! - Employer profiles written by the enrichment workers

mod pool;
mod schema;
mod sqlite;
mod traits;

pub use pool::{ConnectionPool, PooledConnection};
pub use sqlite::SqliteStorage;
pub use traits::{ListingGateway, StorageError, StorageResult};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Opens the SQLite gateway at `path` with `pool_size` connections
pub fn open_storage(path: &Path, pool_size: usize) -> StorageResult<SqliteStorage> {
    SqliteStorage::open(path, pool_size)
}

/// Employer metadata derived from the listings of one site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub site_name: String,
    pub company: String,
    pub listing_count: usize,
    pub locations: Vec<String>,
    pub tech_stack: Vec<String>,
}
