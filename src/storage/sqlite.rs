//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the
//! [`ListingGateway`] trait.

use crate::models::{EnrichmentFields, NormalizedJobListing};
use crate::storage::pool::ConnectionPool;
use crate::storage::traits::{ListingGateway, StorageError, StorageResult};
use crate::storage::CompanyProfile;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
#[derive(Debug)]
pub struct SqliteStorage {
    pool: ConnectionPool,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `pool_size` - Maximum number of simultaneously open connections
    pub fn open(path: &Path, pool_size: usize) -> StorageResult<Self> {
        Ok(Self {
            pool: ConnectionPool::open(path, pool_size)?,
        })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        Ok(Self {
            pool: ConnectionPool::in_memory()?,
        })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Number of stored listings, optionally for one site only
    pub fn count_listings(&self, site_name: Option<&str>) -> StorageResult<u64> {
        let conn = self.pool.get()?;
        let count: i64 = match site_name {
            Some(site) => conn.query_row(
                "SELECT COUNT(*) FROM job_listings WHERE site_name = ?1",
                params![site],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM job_listings", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    /// Stored listings of one site, oldest first
    pub fn listings_for_site(&self, site_name: &str) -> StorageResult<Vec<NormalizedJobListing>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT external_id, title, company, location, url, description, experience,
                    site_name, crawled_at, tech_stack, required_skills, salary, deadline,
                    work_location
             FROM job_listings WHERE site_name = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![site_name], StoredListingRow::from_row)?;

        let mut listings = Vec::new();
        for row in rows {
            listings.push(row?.into_listing()?);
        }
        Ok(listings)
    }

    /// The stored profile of `company` on `site_name`
    pub fn company_profile(
        &self,
        site_name: &str,
        company: &str,
    ) -> StorageResult<Option<CompanyProfile>> {
        let conn = self.pool.get()?;
        let row = conn
            .query_row(
                "SELECT site_name, company, listing_count, locations, tech_stack
                 FROM companies WHERE site_name = ?1 AND company = ?2",
                params![site_name, company],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(
            |(site_name, company, listing_count, locations, tech_stack)| -> StorageResult<_> {
                Ok(CompanyProfile {
                    site_name,
                    company,
                    listing_count: listing_count as usize,
                    locations: serde_json::from_str(&locations)?,
                    tech_stack: serde_json::from_str(&tech_stack)?,
                })
            },
        )
        .transpose()
    }
}

impl ListingGateway for SqliteStorage {
    fn save_listings(
        &self,
        site_name: &str,
        site_url: &str,
        listings: &[NormalizedJobListing],
        search_keyword: Option<&str>,
    ) -> StorageResult<usize> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let mut saved = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO job_listings (
                    site_name, site_url, listing_key, external_id, title, company, location,
                    url, description, experience, search_keyword, tech_stack, required_skills,
                    salary, deadline, work_location, crawled_at, saved_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            )?;

            for listing in listings {
                let enrichment = &listing.enrichment;
                saved += stmt.execute(params![
                    site_name,
                    site_url,
                    listing.listing_key(),
                    listing.id,
                    listing.title,
                    listing.company,
                    listing.location,
                    listing.url,
                    listing.description,
                    listing.experience,
                    search_keyword,
                    serde_json::to_string(&enrichment.tech_stack)?,
                    serde_json::to_string(&enrichment.required_skills)?,
                    enrichment.salary,
                    enrichment.deadline,
                    enrichment.work_location,
                    listing.crawled_at.to_rfc3339(),
                    now,
                ])?;
            }
        }

        tx.commit()?;

        tracing::debug!(
            "Saved {} of {} listings for {}",
            saved,
            listings.len(),
            site_name
        );
        Ok(saved)
    }

    fn save_company_profiles(&self, profiles: &[CompanyProfile]) -> StorageResult<usize> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let mut written = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO companies (site_name, company, listing_count, locations, tech_stack, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(site_name, company) DO UPDATE SET
                    listing_count = excluded.listing_count,
                    locations = excluded.locations,
                    tech_stack = excluded.tech_stack,
                    updated_at = excluded.updated_at",
            )?;

            for profile in profiles {
                written += stmt.execute(params![
                    profile.site_name,
                    profile.company,
                    profile.listing_count as i64,
                    serde_json::to_string(&profile.locations)?,
                    serde_json::to_string(&profile.tech_stack)?,
                    now,
                ])?;
            }
        }

        tx.commit()?;
        Ok(written)
    }
}

/// Raw column values of one `job_listings` row
struct StoredListingRow {
    external_id: Option<String>,
    title: String,
    company: String,
    location: String,
    url: String,
    description: String,
    experience: String,
    site_name: String,
    crawled_at: String,
    tech_stack: String,
    required_skills: String,
    salary: Option<String>,
    deadline: Option<String>,
    work_location: Option<String>,
}

impl StoredListingRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            external_id: row.get(0)?,
            title: row.get(1)?,
            company: row.get(2)?,
            location: row.get(3)?,
            url: row.get(4)?,
            description: row.get(5)?,
            experience: row.get(6)?,
            site_name: row.get(7)?,
            crawled_at: row.get(8)?,
            tech_stack: row.get(9)?,
            required_skills: row.get(10)?,
            salary: row.get(11)?,
            deadline: row.get(12)?,
            work_location: row.get(13)?,
        })
    }

    fn into_listing(self) -> StorageResult<NormalizedJobListing> {
        let crawled_at = DateTime::parse_from_rfc3339(&self.crawled_at)
            .map_err(|e| StorageError::Serialization(format!("Invalid crawled_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(NormalizedJobListing {
            id: self.external_id,
            title: self.title,
            company: self.company,
            location: self.location,
            url: self.url,
            description: self.description,
            experience: self.experience,
            site_name: self.site_name,
            crawled_at,
            enrichment: EnrichmentFields {
                tech_stack: serde_json::from_str(&self.tech_stack)?,
                required_skills: serde_json::from_str(&self.required_skills)?,
                salary: self.salary,
                deadline: self.deadline,
                work_location: self.work_location,
            },
        })
    }
}
