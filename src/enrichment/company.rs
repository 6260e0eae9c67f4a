//! Employer profiles derived from crawled listings

use crate::enrichment::{EnrichmentError, EnrichmentJob};
use crate::models::NormalizedJobListing;
use crate::storage::{CompanyProfile, ListingGateway};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Derives and stores employer metadata from a final listing set
#[async_trait]
pub trait CompanyEnricher: Send + Sync {
    async fn enrich(&self, job: &EnrichmentJob) -> Result<Vec<CompanyProfile>, EnrichmentError>;
}

/// Builds company profiles by aggregating listings, then saves them
pub struct ListingProfiler {
    gateway: Arc<dyn ListingGateway>,
}

impl ListingProfiler {
    pub fn new(gateway: Arc<dyn ListingGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl CompanyEnricher for ListingProfiler {
    async fn enrich(&self, job: &EnrichmentJob) -> Result<Vec<CompanyProfile>, EnrichmentError> {
        let profiles = build_profiles(&job.site_name, &job.listings);
        if profiles.is_empty() {
            return Ok(profiles);
        }

        let gateway = Arc::clone(&self.gateway);
        let to_save = profiles.clone();
        let written = tokio::task::spawn_blocking(move || gateway.save_company_profiles(&to_save))
            .await
            .map_err(|e| EnrichmentError::Task(e.to_string()))??;

        tracing::debug!("{}: stored {} company profiles", job.site_name, written);
        Ok(profiles)
    }
}

/// Groups listings by company (case-insensitive) in first-seen order
///
/// Listings without a company are ignored. Locations and tech stacks are
/// collected without duplicates.
pub fn build_profiles(site_name: &str, listings: &[NormalizedJobListing]) -> Vec<CompanyProfile> {
    let mut order: Vec<String> = Vec::new();
    let mut profiles: HashMap<String, (CompanyProfile, HashSet<String>, HashSet<String>)> =
        HashMap::new();

    for listing in listings {
        let company = listing.company.trim();
        if company.is_empty() {
            continue;
        }

        let key = company.to_lowercase();
        let (profile, seen_locations, seen_stack) =
            profiles.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                (
                    CompanyProfile {
                        site_name: site_name.to_string(),
                        company: company.to_string(),
                        listing_count: 0,
                        locations: Vec::new(),
                        tech_stack: Vec::new(),
                    },
                    HashSet::new(),
                    HashSet::new(),
                )
            });

        profile.listing_count += 1;

        let location = listing.location.trim();
        if !location.is_empty() && seen_locations.insert(location.to_lowercase()) {
            profile.locations.push(location.to_string());
        }

        for tech in &listing.enrichment.tech_stack {
            let tech = tech.trim();
            if !tech.is_empty() && seen_stack.insert(tech.to_lowercase()) {
                profile.tech_stack.push(tech.to_string());
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| profiles.remove(&key).map(|(profile, _, _)| profile))
        .collect()
}
