//! Listing identity and duplicate filtering

use crate::models::JobListingStub;
use std::collections::HashSet;

/// Identity of a listing for duplicate detection
///
/// Precedence: the external id, then the lower-cased trimmed
/// (company, title) composite, then the title alone when no company is
/// known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListingIdentity {
    Id(String),
    Composite { company: String, title: String },
    Title(String),
}

impl ListingIdentity {
    pub fn of(stub: &JobListingStub) -> Self {
        if let Some(id) = stub.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            return Self::Id(id.to_string());
        }

        let title = stub.title.trim().to_lowercase();
        let company = stub.company.trim().to_lowercase();

        if company.is_empty() {
            Self::Title(title)
        } else {
            Self::Composite { company, title }
        }
    }
}

/// Incremental duplicate filter, preserving first-seen order
///
/// Fed page by page by the pagination controller so duplicates across page
/// boundaries are caught as they arrive.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<ListingIdentity>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time an identity is offered
    pub fn accept(&mut self, stub: &JobListingStub) -> bool {
        self.seen.insert(ListingIdentity::of(stub))
    }

    /// Number of distinct identities seen
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Drops repeated listings, keeping the first occurrence of each identity
pub fn dedupe(stubs: Vec<JobListingStub>) -> Vec<JobListingStub> {
    let mut dedup = Deduplicator::new();
    stubs.into_iter().filter(|stub| dedup.accept(stub)).collect()
}
