use crate::UrlError;
use std::collections::BTreeMap;
use url::Url;

/// Query shape of a site's search endpoint
#[derive(Debug, Clone)]
pub struct SearchEndpoint<'a> {
    pub search_path: &'a str,
    pub keyword_param: &'a str,
    pub page_param: &'a str,
    pub extra_params: &'a BTreeMap<String, String>,
}

/// Builds the URL of one search-results page
///
/// The keyword parameter is omitted for an "all listings" search, and the
/// page parameter is omitted for page 1 so the first-page URL doubles as the
/// canonical "view on site" link.
///
/// # Examples
///
/// ```
/// use job_harvester::url::{build_search_url, SearchEndpoint};
/// use std::collections::BTreeMap;
/// use url::Url;
///
/// let base = Url::parse("https://jobs.example.com").unwrap();
/// let extra = BTreeMap::new();
/// let endpoint = SearchEndpoint {
///     search_path: "/search",
///     keyword_param: "q",
///     page_param: "page",
///     extra_params: &extra,
/// };
/// let url = build_search_url(&base, &endpoint, Some("rust dev"), 2).unwrap();
/// assert_eq!(url.as_str(), "https://jobs.example.com/search?q=rust+dev&page=2");
/// ```
pub fn build_search_url(
    base: &Url,
    endpoint: &SearchEndpoint<'_>,
    keyword: Option<&str>,
    page: u32,
) -> Result<Url, UrlError> {
    let mut url = base
        .join(endpoint.search_path)
        .map_err(|e| UrlError::Malformed(format!("Invalid search path: {}", e)))?;

    {
        let mut query = url.query_pairs_mut();
        for (key, value) in endpoint.extra_params {
            query.append_pair(key, value);
        }
        if let Some(keyword) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
            query.append_pair(endpoint.keyword_param, keyword);
        }
        if page > 1 {
            query.append_pair(endpoint.page_param, &page.to_string());
        }
    }

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Extracts an id from a trailing all-digit path segment
///
/// `https://jobs.example.com/view/12345/` yields `12345`; a URL whose last
/// segment is not purely numeric yields None.
pub fn trailing_numeric_id(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    path.split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .filter(|segment| segment.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}
