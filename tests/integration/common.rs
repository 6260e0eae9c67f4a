//! Shared fixtures for the integration tests

use async_trait::async_trait;
use job_harvester::crawler::FetchError;
use job_harvester::sites::SearchPage;
use job_harvester::{EnrichmentFields, HarvestError, JobListingStub, SiteAdapter};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use url::Url;

/// In-process adapter serving scripted pages
pub struct StubAdapter {
    name: String,
    pages: Vec<Vec<JobListingStub>>,
    has_next: bool,
    fail_status: Option<u16>,
    fetch_delay: Duration,
    fetches: AtomicU32,
}

impl StubAdapter {
    pub fn new(name: &str, pages: Vec<Vec<JobListingStub>>) -> Self {
        Self {
            name: name.to_string(),
            pages,
            has_next: true,
            fail_status: None,
            fetch_delay: Duration::ZERO,
            fetches: AtomicU32::new(0),
        }
    }

    /// An adapter whose every search fetch fails with `status`
    pub fn failing(name: &str, status: u16) -> Self {
        let mut adapter = Self::new(name, Vec::new());
        adapter.fail_status = Some(status);
        adapter
    }

    pub fn single_page(mut self) -> Self {
        self.has_next = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SiteAdapter for StubAdapter {
    fn site_name(&self) -> &str {
        &self.name
    }

    fn search_url(
        &self,
        site_url: &Url,
        keyword: Option<&str>,
        page: u32,
    ) -> job_harvester::Result<Url> {
        let mut url = site_url.join("/search")?;
        url.query_pairs_mut()
            .append_pair("q", keyword.unwrap_or(""))
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    async fn fetch_search_page(
        &self,
        _site_url: &Url,
        _keyword: Option<&str>,
        page: u32,
    ) -> job_harvester::Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        if let Some(status) = self.fail_status {
            return Err(HarvestError::Fetch(FetchError::Status {
                url: format!("{} page {}", self.name, page),
                status,
            }));
        }
        Ok(page.to_string())
    }

    fn parse_search_page(&self, body: &str, _site_url: &Url) -> SearchPage {
        let index = body.parse::<usize>().unwrap_or(1) - 1;
        SearchPage {
            stubs: self.pages.get(index).cloned().unwrap_or_default(),
            has_next_page: self.has_next,
        }
    }

    async fn fetch_detail_page(
        &self,
        _site_url: &Url,
        _stub: &JobListingStub,
    ) -> job_harvester::Result<Option<String>> {
        Ok(None)
    }

    fn parse_detail_page(&self, _body: &str) -> EnrichmentFields {
        EnrichmentFields::default()
    }
}

/// A stub with an explicit id
pub fn stub(id: &str, title: &str) -> JobListingStub {
    let mut stub = JobListingStub::new(title, format!("https://alpha.example/view/{}", id));
    stub.id = Some(id.to_string());
    stub
}

/// A stub with an id and a company
pub fn company_stub(id: &str, title: &str, company: &str) -> JobListingStub {
    let mut stub = stub(id, title);
    stub.company = company.to_string();
    stub
}

/// Minimal valid config text with the given site sections appended
pub fn config_toml(database_path: &str, sites: &str) -> String {
    format!(
        r#"
[crawler]
request-delay-ms = 0
max-retries = 2
retry-backoff-ms = 10
request-timeout-secs = 5

[cache]
ttl-seconds = 600

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
database-path = "{}"
pool-size = 2

[enrichment]
enabled = false

{}
"#,
        database_path.replace('\\', "/"),
        sites
    )
}
