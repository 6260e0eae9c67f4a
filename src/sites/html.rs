//! Adapter for server-rendered HTML job boards
//!
//! Search pages are parsed with a fallback chain:
//! 1. the configured `items` card selector
//! 2. each `fallback-items` selector, in order
//! 3. a scan of every anchor whose href matches `detail-link-pattern`
//!
//! The first strategy that yields at least one accepted listing wins.

use crate::config::{HtmlSelectors, SiteConfig};
use crate::crawler::HttpFetcher;
use crate::models::{EnrichmentFields, JobListingStub};
use crate::sites::{missing_section, Denylist, SearchPage, SearchSettings, SiteAdapter};
use crate::url::resolve_link;
use crate::{HarvestError, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Selectors compiled once at construction
#[derive(Debug)]
struct CompiledSelectors {
    items: Vec<Selector>,
    any_link: Selector,
    title: Selector,
    company: Option<Selector>,
    location: Option<Selector>,
    link: Option<Selector>,
    description: Option<Selector>,
    experience: Option<Selector>,
    id_attribute: Option<String>,
    next_page: Option<Selector>,
    tech_stack: Option<Selector>,
    skills: Option<Selector>,
    salary: Option<Selector>,
    deadline: Option<Selector>,
    work_location: Option<Selector>,
}

impl CompiledSelectors {
    fn compile(selectors: &HtmlSelectors) -> Result<Self> {
        let items = std::iter::once(&selectors.items)
            .chain(&selectors.fallback_items)
            .map(|s| compile(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            items,
            any_link: compile("a[href]")?,
            title: compile(&selectors.title)?,
            company: compile_opt(&selectors.company)?,
            location: compile_opt(&selectors.location)?,
            link: compile_opt(&selectors.link)?,
            description: compile_opt(&selectors.description)?,
            experience: compile_opt(&selectors.experience)?,
            id_attribute: selectors.id_attribute.clone(),
            next_page: compile_opt(&selectors.next_page)?,
            tech_stack: compile_opt(&selectors.tech_stack)?,
            skills: compile_opt(&selectors.skills)?,
            salary: compile_opt(&selectors.salary)?,
            deadline: compile_opt(&selectors.deadline)?,
            work_location: compile_opt(&selectors.work_location)?,
        })
    }
}

/// Site adapter driven by CSS selectors
pub struct HtmlBoardAdapter {
    name: String,
    search: SearchSettings,
    selectors: CompiledSelectors,
    detail_link_pattern: Option<Regex>,
    denylist: Denylist,
    fetcher: Arc<HttpFetcher>,
}

impl HtmlBoardAdapter {
    /// Builds the adapter from a `kind = "html"` site entry
    pub fn from_config(site: &SiteConfig, fetcher: Arc<HttpFetcher>) -> Result<Self> {
        let selectors = site.html.as_ref().ok_or_else(|| missing_section(site, "html"))?;

        let detail_link_pattern = selectors
            .detail_link_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| HarvestError::Selector {
                    selector: pattern.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            name: site.name.clone(),
            search: SearchSettings::from_site(site),
            selectors: CompiledSelectors::compile(selectors)?,
            detail_link_pattern,
            denylist: Denylist::with_extra(&site.denylist),
            fetcher,
        })
    }

    /// Extracts stubs from the cards matched by one item selector
    fn parse_cards(
        &self,
        document: &Html,
        items: &Selector,
        site_url: &Url,
    ) -> Vec<JobListingStub> {
        document
            .select(items)
            .filter_map(|card| self.parse_card(card, site_url))
            .collect()
    }

    fn parse_card(&self, card: ElementRef<'_>, site_url: &Url) -> Option<JobListingStub> {
        let selectors = &self.selectors;

        let title = match first_text(card, &selectors.title) {
            Some(title) => title,
            None => {
                tracing::warn!("{}: listing card without a title, skipping", self.name);
                return None;
            }
        };

        if self.denylist.rejects(&title) {
            tracing::debug!("{}: discarded UI label '{}'", self.name, title);
            return None;
        }

        let href = match &selectors.link {
            Some(link) => card.select(link).next().and_then(|a| a.value().attr("href")),
            None => card.value().attr("href").or_else(|| {
                card.select(&selectors.any_link)
                    .next()
                    .and_then(|a| a.value().attr("href"))
            }),
        };

        let url = match href.and_then(|href| resolve_link(href, site_url)) {
            Some(url) => url,
            None => {
                tracing::warn!("{}: listing '{}' has no usable link, skipping", self.name, title);
                return None;
            }
        };

        let mut stub = JobListingStub::new(title, url);
        stub.id = selectors
            .id_attribute
            .as_deref()
            .and_then(|attr| card.value().attr(attr))
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        stub.company = optional_text(card, &selectors.company);
        stub.location = optional_text(card, &selectors.location);
        stub.description = optional_text(card, &selectors.description);
        stub.experience = optional_text(card, &selectors.experience);

        Some(stub)
    }

    /// Last-resort strategy: every anchor that looks like a detail link
    fn scan_anchors(&self, document: &Html, site_url: &Url) -> Vec<JobListingStub> {
        let pattern = match &self.detail_link_pattern {
            Some(pattern) => pattern,
            None => return Vec::new(),
        };

        let mut seen = HashSet::new();
        let mut stubs = Vec::new();

        for anchor in document.select(&self.selectors.any_link) {
            let href = match anchor.value().attr("href") {
                Some(href) if pattern.is_match(href) => href,
                _ => continue,
            };

            let title = element_text(anchor);
            if self.denylist.rejects(&title) {
                continue;
            }

            if let Some(url) = resolve_link(href, site_url) {
                if seen.insert(url.clone()) {
                    stubs.push(JobListingStub::new(title, url));
                }
            }
        }

        stubs
    }

    fn has_next_page(&self, document: &Html, page_len: usize) -> bool {
        match &self.selectors.next_page {
            Some(next) => document.select(next).any(|element| !is_disabled(element)),
            None => page_len > 0,
        }
    }
}

#[async_trait]
impl SiteAdapter for HtmlBoardAdapter {
    fn site_name(&self) -> &str {
        &self.name
    }

    fn search_url(&self, site_url: &Url, keyword: Option<&str>, page: u32) -> Result<Url> {
        self.search.url(site_url, keyword, page)
    }

    async fn fetch_search_page(
        &self,
        site_url: &Url,
        keyword: Option<&str>,
        page: u32,
    ) -> Result<String> {
        let url = self.search_url(site_url, keyword, page)?;
        Ok(self.fetcher.get_text(&url).await?)
    }

    fn parse_search_page(&self, body: &str, site_url: &Url) -> SearchPage {
        let document = Html::parse_document(body);

        let mut stubs = Vec::new();
        for (index, items) in self.selectors.items.iter().enumerate() {
            stubs = self.parse_cards(&document, items, site_url);
            if !stubs.is_empty() {
                if index > 0 {
                    tracing::debug!("{}: matched fallback item selector #{}", self.name, index);
                }
                break;
            }
        }

        if stubs.is_empty() {
            stubs = self.scan_anchors(&document, site_url);
            if !stubs.is_empty() {
                tracing::debug!("{}: listings recovered by anchor scan", self.name);
            }
        }

        let has_next_page = self.has_next_page(&document, stubs.len());
        SearchPage {
            stubs,
            has_next_page,
        }
    }

    async fn fetch_detail_page(
        &self,
        _site_url: &Url,
        stub: &JobListingStub,
    ) -> Result<Option<String>> {
        let url = match Url::parse(&stub.url) {
            Ok(url) => url,
            Err(_) => return Ok(None),
        };
        Ok(Some(self.fetcher.get_text(&url).await?))
    }

    fn parse_detail_page(&self, body: &str) -> EnrichmentFields {
        let document = Html::parse_document(body);
        let root = document.root_element();
        let selectors = &self.selectors;

        EnrichmentFields {
            tech_stack: all_texts(root, &selectors.tech_stack),
            required_skills: all_texts(root, &selectors.skills),
            salary: selectors.salary.as_ref().and_then(|s| first_text(root, s)),
            deadline: selectors.deadline.as_ref().and_then(|s| first_text(root, s)),
            work_location: selectors
                .work_location
                .as_ref()
                .and_then(|s| first_text(root, s)),
        }
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| HarvestError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn compile_opt(selector: &Option<String>) -> Result<Option<Selector>> {
    selector.as_deref().map(compile).transpose()
}

/// Whitespace-collapsed text content of an element
fn element_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn optional_text(scope: ElementRef<'_>, selector: &Option<Selector>) -> String {
    selector
        .as_ref()
        .and_then(|s| first_text(scope, s))
        .unwrap_or_default()
}

/// Distinct non-empty texts of every match, in document order
fn all_texts(scope: ElementRef<'_>, selector: &Option<Selector>) -> Vec<String> {
    let selector = match selector {
        Some(selector) => selector,
        None => return Vec::new(),
    };

    let mut seen = HashSet::new();
    scope
        .select(selector)
        .map(element_text)
        .filter(|text| !text.is_empty() && seen.insert(text.to_lowercase()))
        .collect()
}

/// A pagination control marked disabled on itself or its parent
fn is_disabled(element: ElementRef<'_>) -> bool {
    let marked = |e: ElementRef<'_>| {
        let value = e.value();
        value.attr("disabled").is_some()
            || value
                .attr("aria-disabled")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
            || value.classes().any(|c| c.eq_ignore_ascii_case("disabled"))
    };

    marked(element) || element.parent().and_then(ElementRef::wrap).map(marked).unwrap_or(false)
}
