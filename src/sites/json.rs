//! Adapter for job boards that expose a JSON search API
//!
//! Every field is located with a JSON pointer (RFC 6901). Item pointers are
//! evaluated relative to each element of the item array.

use crate::config::{JsonPointers, SiteConfig};
use crate::crawler::HttpFetcher;
use crate::models::{EnrichmentFields, JobListingStub};
use crate::sites::{missing_section, Denylist, SearchPage, SearchSettings, SiteAdapter};
use crate::url::resolve_link;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Placeholder substituted with the listing id in `detail-path`
const ID_PLACEHOLDER: &str = "{id}";

pub struct JsonApiAdapter {
    name: String,
    search: SearchSettings,
    pointers: JsonPointers,
    denylist: Denylist,
    fetcher: Arc<HttpFetcher>,
}

impl JsonApiAdapter {
    /// Builds the adapter from a `kind = "json"` site entry
    pub fn from_config(site: &SiteConfig, fetcher: Arc<HttpFetcher>) -> Result<Self> {
        let pointers = site.json.clone().ok_or_else(|| missing_section(site, "json"))?;

        Ok(Self {
            name: site.name.clone(),
            search: SearchSettings::from_site(site),
            pointers,
            denylist: Denylist::with_extra(&site.denylist),
            fetcher,
        })
    }

    /// Parses the first item array that yields at least one accepted stub,
    /// trying `items` then each fallback pointer
    fn stubs(&self, root: &Value, site_url: &Url) -> Vec<JobListingStub> {
        for pointer in std::iter::once(&self.pointers.items).chain(&self.pointers.fallback_items) {
            let items = match root.pointer(pointer).and_then(Value::as_array) {
                Some(items) => items,
                None => continue,
            };

            let stubs: Vec<JobListingStub> = items
                .iter()
                .filter_map(|item| self.parse_item(item, site_url))
                .collect();
            if !stubs.is_empty() {
                return stubs;
            }
            tracing::debug!("{}: no listings under '{}'", self.name, pointer);
        }
        Vec::new()
    }

    fn parse_item(&self, item: &Value, site_url: &Url) -> Option<JobListingStub> {
        let pointers = &self.pointers;

        let title = match string_at(item, &pointers.title) {
            Some(title) => title,
            None => {
                tracing::warn!("{}: item without a title, skipping", self.name);
                return None;
            }
        };

        if self.denylist.rejects(&title) {
            tracing::debug!("{}: discarded UI label '{}'", self.name, title);
            return None;
        }

        let id = pointers.id.as_deref().and_then(|p| string_at(item, p));

        let url = pointers
            .url
            .as_deref()
            .and_then(|p| string_at(item, p))
            .and_then(|href| resolve_link(&href, site_url))
            .or_else(|| {
                id.as_deref()
                    .and_then(|id| self.detail_url(site_url, id))
                    .map(String::from)
            });

        let url = match url {
            Some(url) => url,
            None => {
                tracing::warn!("{}: item '{}' has no usable URL, skipping", self.name, title);
                return None;
            }
        };

        let optional = |pointer: &Option<String>| {
            pointer
                .as_deref()
                .and_then(|p| string_at(item, p))
                .unwrap_or_default()
        };

        let mut stub = JobListingStub::new(title, url);
        stub.id = id;
        stub.company = optional(&pointers.company);
        stub.location = optional(&pointers.location);
        stub.description = optional(&pointers.description);
        stub.experience = optional(&pointers.experience);
        Some(stub)
    }

    /// Detail endpoint for `id`, if a `detail-path` template is configured
    fn detail_url(&self, site_url: &Url, id: &str) -> Option<Url> {
        let template = self.pointers.detail_path.as_deref()?;
        site_url.join(&template.replace(ID_PLACEHOLDER, id)).ok()
    }
}

#[async_trait]
impl SiteAdapter for JsonApiAdapter {
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
        let root: Value = match serde_json::from_str(body) {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!("{}: search response is not valid JSON: {}", self.name, e);
                return SearchPage::default();
            }
        };

        let stubs = self.stubs(&root, site_url);

        let has_next_page = match self.pointers.has_more.as_deref() {
            Some(pointer) => root.pointer(pointer).and_then(Value::as_bool).unwrap_or(false),
            None => !stubs.is_empty(),
        };

        SearchPage {
            stubs,
            has_next_page,
        }
    }

    async fn fetch_detail_page(
        &self,
        site_url: &Url,
        stub: &JobListingStub,
    ) -> Result<Option<String>> {
        let url = stub
            .id
            .as_deref()
            .and_then(|id| self.detail_url(site_url, id))
            .or_else(|| Url::parse(&stub.url).ok());

        match url {
            Some(url) => Ok(Some(self.fetcher.get_text(&url).await?)),
            None => Ok(None),
        }
    }

    fn parse_detail_page(&self, body: &str) -> EnrichmentFields {
        let root: Value = match serde_json::from_str(body) {
            Ok(root) => root,
            Err(e) => {
                tracing::debug!("{}: detail response is not valid JSON: {}", self.name, e);
                return EnrichmentFields::default();
            }
        };

        let pointers = &self.pointers;
        let single = |pointer: &Option<String>| pointer.as_deref().and_then(|p| string_at(&root, p));
        let list = |pointer: &Option<String>| {
            pointer
                .as_deref()
                .map(|p| strings_at(&root, p))
                .unwrap_or_default()
        };

        EnrichmentFields {
            tech_stack: list(&pointers.tech_stack),
            required_skills: list(&pointers.skills),
            salary: single(&pointers.salary),
            deadline: single(&pointers.deadline),
            work_location: single(&pointers.work_location),
        }
    }
}

/// Scalar at `pointer` rendered as trimmed, non-empty text
fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    Some(text).filter(|t| !t.is_empty())
}

/// List at `pointer`: an array of scalars or a comma-separated string
fn strings_at(value: &Value, pointer: &str) -> Vec<String> {
    let raw: Vec<String> = match value.pointer(pointer) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}
