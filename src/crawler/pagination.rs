//! Pagination controller
//!
//! Drives repeated fetch and parse cycles against one site until a
//! termination condition holds:
//!
//! | Condition | Reason |
//! |-----------|--------|
//! | Page yields zero listings | `EmptyPage` |
//! | Every listing on the page was already seen | `NoNewListings` |
//! | `max_results` cap reached (truncated exactly) | `MaxResultsReached` |
//! | Adapter reports no next page | `NoNextPage` |
//! | `MAX_PAGES` pages fetched | `PageLimitReached` |
//! | A page after the first fails to fetch | `FetchFailed` |
//! | The caller's deadline passes | `DeadlineReached` |
//!
//! A fetch failure on the first page is returned as an error instead.

use crate::crawler::{Deduplicator, RateLimiter};
use crate::models::JobListingStub;
use crate::sites::SiteAdapter;
use crate::state::{PaginationState, TerminationReason};
use crate::Result;
use tokio::time::Instant;
use url::Url;

/// Hard cap on pages fetched per crawl, whatever the site reports
pub const MAX_PAGES: u32 = 50;

/// Deduplicated stubs and how pagination ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationOutcome {
    pub stubs: Vec<JobListingStub>,
    pub termination: TerminationReason,
    pub pages_fetched: u32,
}

/// Runs the pagination state machine for one crawl invocation
pub struct PaginationController<'a> {
    adapter: &'a dyn SiteAdapter,
    limiter: &'a RateLimiter,
    site_url: &'a Url,
    keyword: Option<&'a str>,
    max_results: usize,
    deadline: Option<Instant>,
}

impl<'a> PaginationController<'a> {
    /// Creates a controller; a `max_results` of zero means uncapped
    pub fn new(
        adapter: &'a dyn SiteAdapter,
        limiter: &'a RateLimiter,
        site_url: &'a Url,
        keyword: Option<&'a str>,
        max_results: usize,
    ) -> Self {
        Self {
            adapter,
            limiter,
            site_url,
            keyword,
            max_results,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Fetches pages until termination and returns the accumulated stubs
    ///
    /// Each page fetch takes exactly one rate-limiter turn (retries inside
    /// the fetcher take their own).
    pub async fn run(self) -> Result<PaginationOutcome> {
        let site = self.adapter.site_name();
        let mut state = PaginationState::new();
        let mut dedup = Deduplicator::new();

        while !state.is_terminated() {
            if self.deadline_passed() {
                tracing::info!(
                    "{}: deadline reached after {} pages",
                    site,
                    state.pages_fetched()
                );
                state.terminate(TerminationReason::DeadlineReached);
                break;
            }

            let page = state.begin_fetch()?;

            let body = match self.fetch_page(page).await {
                Some(Ok(body)) => body,
                Some(Err(e)) if page == 1 => return Err(e),
                Some(Err(e)) => {
                    tracing::warn!(
                        "{}: page {} failed, keeping {} listings: {}",
                        site,
                        page,
                        state.len(),
                        e
                    );
                    state.terminate(TerminationReason::FetchFailed);
                    break;
                }
                None => {
                    tracing::info!("{}: deadline reached while fetching page {}", site, page);
                    state.terminate(TerminationReason::DeadlineReached);
                    break;
                }
            };

            let parsed = self.adapter.parse_search_page(&body, self.site_url);
            let has_next_page = parsed.has_next_page;

            if parsed.stubs.is_empty() {
                tracing::debug!("{}: page {} is empty", site, page);
                state.record_fetch();
                state.terminate(TerminationReason::EmptyPage);
                break;
            }

            let mut fresh: Vec<JobListingStub> = parsed
                .stubs
                .into_iter()
                .map(|mut stub| {
                    stub.resolve_id();
                    stub
                })
                .filter(|stub| dedup.accept(stub))
                .collect();

            if fresh.is_empty() {
                tracing::debug!("{}: page {} repeated earlier listings", site, page);
                state.record_fetch();
                state.terminate(TerminationReason::NoNewListings);
                break;
            }

            if self.max_results > 0 {
                fresh.truncate(self.max_results.saturating_sub(state.len()));
            }

            tracing::debug!("{}: page {} contributed {} listings", site, page, fresh.len());
            state.accept_page(fresh)?;

            if self.max_results > 0 && state.len() >= self.max_results {
                state.terminate(TerminationReason::MaxResultsReached);
            } else if !has_next_page {
                state.terminate(TerminationReason::NoNextPage);
            } else if page >= MAX_PAGES {
                tracing::warn!("{}: stopped at the {} page safety cap", site, MAX_PAGES);
                state.terminate(TerminationReason::PageLimitReached);
            }
        }

        let (stubs, termination, pages_fetched) = state.into_parts();
        Ok(PaginationOutcome {
            stubs,
            termination: termination.unwrap_or(TerminationReason::EmptyPage),
            pages_fetched,
        })
    }

    /// Takes a limiter turn and fetches one page, racing the deadline
    ///
    /// Returns None if the deadline passed first.
    async fn fetch_page(&self, page: u32) -> Option<Result<String>> {
        let fetch = async {
            self.limiter.await_turn().await;
            self.adapter
                .fetch_search_page(self.site_url, self.keyword, page)
                .await
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fetch).await.ok(),
            None => Some(fetch.await),
        }
    }

    fn deadline_passed(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }
}
