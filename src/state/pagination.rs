//! Pagination state definitions for one crawl invocation
//!
//! The state is created when a site crawl starts and discarded when it
//! returns; nothing here is shared between crawls.

use crate::models::JobListingStub;
use crate::HarvestError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the pagination state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaginationPhase {
    /// Nothing fetched yet
    Start,

    /// A page request is in flight
    Fetching,

    /// The last page contributed listings; another page may follow
    Accumulating,

    /// No further pages will be requested
    Terminated,
}

impl PaginationPhase {
    /// Returns true if the machine may move from `self` to `next`
    ///
    /// Any phase may terminate; termination itself is final.
    pub fn can_transition_to(&self, next: PaginationPhase) -> bool {
        use PaginationPhase::*;
        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Start, Fetching) | (Accumulating, Fetching) | (Fetching, Accumulating) => true,
            _ => false,
        }
    }
}

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// A page yielded zero listings
    EmptyPage,

    /// The site reported no next page
    NoNextPage,

    /// The caller's `max_results` cap was reached
    MaxResultsReached,

    /// The fixed page-count safety cap was reached
    PageLimitReached,

    /// Every listing on the page had already been seen
    NoNewListings,

    /// A page after the first could not be fetched
    FetchFailed,

    /// The caller's deadline passed
    DeadlineReached,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::EmptyPage => "empty page",
            Self::NoNextPage => "no next page",
            Self::MaxResultsReached => "max results reached",
            Self::PageLimitReached => "page limit reached",
            Self::NoNewListings => "no new listings",
            Self::FetchFailed => "fetch failed",
            Self::DeadlineReached => "deadline reached",
        };
        write!(f, "{}", label)
    }
}

/// Page counter, accumulated listings and termination reason of one crawl
#[derive(Debug, Clone)]
pub struct PaginationState {
    phase: PaginationPhase,
    page: u32,
    pages_fetched: u32,
    listings: Vec<JobListingStub>,
    termination: Option<TerminationReason>,
}

impl PaginationState {
    pub fn new() -> Self {
        Self {
            phase: PaginationPhase::Start,
            page: 0,
            pages_fetched: 0,
            listings: Vec::new(),
            termination: None,
        }
    }

    pub fn phase(&self) -> PaginationPhase {
        self.phase
    }

    /// Page number of the current (or last) fetch, 1-based; 0 before the first fetch
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn listings(&self) -> &[JobListingStub] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == PaginationPhase::Terminated
    }

    /// Moves to Fetching and advances the page counter
    ///
    /// # Returns
    ///
    /// The page number about to be fetched
    pub fn begin_fetch(&mut self) -> Result<u32, HarvestError> {
        self.transition(PaginationPhase::Fetching)?;
        self.page += 1;
        Ok(self.page)
    }

    /// Records a completed fetch whose page carried at least one listing
    pub fn accept_page<I>(&mut self, stubs: I) -> Result<(), HarvestError>
    where
        I: IntoIterator<Item = JobListingStub>,
    {
        self.transition(PaginationPhase::Accumulating)?;
        self.pages_fetched += 1;
        self.listings.extend(stubs);
        Ok(())
    }

    /// Counts a completed fetch without accepting anything from it
    pub fn record_fetch(&mut self) {
        self.pages_fetched += 1;
    }

    /// Stops pagination, keeping the first reason if called twice
    pub fn terminate(&mut self, reason: TerminationReason) {
        if self.phase != PaginationPhase::Terminated {
            self.phase = PaginationPhase::Terminated;
            self.termination = Some(reason);
        }
    }

    /// Consumes the state, returning listings and the termination reason
    pub fn into_parts(self) -> (Vec<JobListingStub>, Option<TerminationReason>, u32) {
        (self.listings, self.termination, self.pages_fetched)
    }

    fn transition(&mut self, next: PaginationPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new()
    }
}
