//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Job Harvester database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Normalized listings, one row per (site, listing identity)
CREATE TABLE IF NOT EXISTS job_listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_name TEXT NOT NULL,
    site_url TEXT NOT NULL,
    listing_key TEXT NOT NULL,
    external_id TEXT,
    title TEXT NOT NULL,
    company TEXT NOT NULL,
    location TEXT NOT NULL,
    url TEXT NOT NULL,
    description TEXT NOT NULL,
    experience TEXT NOT NULL,
    search_keyword TEXT,
    tech_stack TEXT NOT NULL DEFAULT '[]',
    required_skills TEXT NOT NULL DEFAULT '[]',
    salary TEXT,
    deadline TEXT,
    work_location TEXT,
    crawled_at TEXT NOT NULL,
    saved_at TEXT NOT NULL,
    UNIQUE(site_name, listing_key)
);

CREATE INDEX IF NOT EXISTS idx_job_listings_site ON job_listings(site_name);
CREATE INDEX IF NOT EXISTS idx_job_listings_company ON job_listings(company);

-- Employer metadata derived from crawled listings
CREATE TABLE IF NOT EXISTS companies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_name TEXT NOT NULL,
    company TEXT NOT NULL,
    listing_count INTEGER NOT NULL DEFAULT 0,
    locations TEXT NOT NULL DEFAULT '[]',
    tech_stack TEXT NOT NULL DEFAULT '[]',
    updated_at TEXT NOT NULL,
    UNIQUE(site_name, company)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
