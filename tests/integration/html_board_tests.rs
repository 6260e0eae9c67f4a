//! End-to-end crawls of an HTML job board served by wiremock

use crate::common::config_toml;
use job_harvester::config::parse_config;
use job_harvester::storage::SqliteStorage;
use job_harvester::{Coordinator, TerminationReason};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE_ONE: &str = r#"
<html><body>
  <nav><a href="/login">Login</a></nav>
  <ul class="results">
    <li class="job" data-job-id="101">
      <a href="/view/101"><span class="title">Backend Engineer</span></a>
      <span class="company">ACME</span><span class="location">Seoul</span>
    </li>
    <li class="job" data-job-id="102">
      <a href="/view/102"><span class="title">Platform Engineer</span></a>
      <span class="company">Initech</span>
    </li>
    <li class="job"><a href="/jobs?sort=new"><span class="title">Sort by</span></a></li>
    <li class="job"><span class="title">Card without link</span></li>
  </ul>
  <div class="pager"><a class="next" href="/jobs?page=2">Next</a></div>
</body></html>
"#;

const PAGE_TWO: &str = r##"
<html><body>
  <ul class="results">
    <li class="job" data-job-id="103">
      <a href="/view/103"><span class="title">Data Engineer</span></a>
      <span class="company">ACME</span>
    </li>
    <li class="job" data-job-id="101">
      <a href="/view/101"><span class="title">Backend Engineer</span></a>
      <span class="company">ACME</span>
    </li>
  </ul>
  <div class="pager"><a class="next disabled" href="#">Next</a></div>
</body></html>
"##;

const DETAIL: &str = r#"
<html><body>
  <ul class="stack"><li>Rust</li><li>PostgreSQL</li><li>rust</li></ul>
  <p class="salary">Negotiable</p>
</body></html>
"#;

fn site_section(base_url: &str) -> String {
    format!(
        r#"
[[site]]
name = "Alpha"
url = "{}"
kind = "html"
search-path = "/jobs"

[site.html]
items = "ul.results li.job"
title = ".title"
company = ".company"
location = ".location"
id-attribute = "data-job-id"
next-page = "a.next"
tech-stack = ".stack li"
salary = ".salary"
"#,
        base_url
    )
}

async fn mount_board(server: &MockServer) {
    // Page 2 first so it wins over the catch-all search mock
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_TWO))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_ONE))
        .mount(server)
        .await;

    for id in ["101", "102", "103"] {
        Mock::given(method("GET"))
            .and(path(format!("/view/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_html_board_crawl_end_to_end() {
    let server = MockServer::start().await;
    mount_board(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("harvest.db");
    let config = parse_config(&config_toml(
        db_path.to_str().unwrap(),
        &site_section(&server.uri()),
    ))
    .unwrap();

    let coordinator = Coordinator::new(&config).unwrap();
    let result = coordinator
        .crawl_site("Alpha", &server.uri(), Some("engineer"), 10, false)
        .await;

    assert!(result.success, "crawl failed: {:?}", result.error);
    assert_eq!(result.pages_fetched, 2);
    assert_eq!(result.termination, Some(TerminationReason::NoNextPage));
    assert!(result.search_url.contains("q=engineer"));

    let titles: Vec<&str> = result.listings.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Backend Engineer", "Platform Engineer", "Data Engineer"]);

    let first = &result.listings[0];
    assert_eq!(first.id.as_deref(), Some("101"));
    assert_eq!(first.company, "ACME");
    assert_eq!(first.location, "Seoul");
    assert_eq!(first.site_name, "Alpha");
    assert_eq!(first.url, format!("{}/view/101", server.uri()));
    assert_eq!(first.enrichment.tech_stack, vec!["Rust", "PostgreSQL"]);
    assert_eq!(first.enrichment.salary.as_deref(), Some("Negotiable"));

    assert_eq!(result.saved_count, Some(3));

    let storage = SqliteStorage::open(Path::new(&db_path), 1).unwrap();
    assert_eq!(storage.count_listings(Some("Alpha")).unwrap(), 3);
}

#[tokio::test]
async fn test_cached_result_skips_network() {
    let server = MockServer::start().await;
    mount_board(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("harvest.db");
    let config = parse_config(&config_toml(
        db_path.to_str().unwrap(),
        &site_section(&server.uri()),
    ))
    .unwrap();
    let coordinator = Coordinator::new(&config).unwrap();

    let first = coordinator
        .crawl_site("Alpha", &server.uri(), None, 2, false)
        .await;
    assert!(first.success);
    assert_eq!(first.total_results, 2);
    assert_eq!(first.termination, Some(TerminationReason::MaxResultsReached));

    let requests_after_first = server.received_requests().await.unwrap().len();

    let second = coordinator
        .crawl_site("Alpha", &server.uri(), None, 2, false)
        .await;
    assert!(second.from_cache);
    assert_eq!(second.listings, first.listings);
    assert_eq!(server.received_requests().await.unwrap().len(), requests_after_first);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_board(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("harvest.db");
    let config = parse_config(&config_toml(
        db_path.to_str().unwrap(),
        &site_section(&server.uri()),
    ))
    .unwrap();
    let coordinator = Coordinator::new(&config).unwrap();

    let result = coordinator
        .crawl_site("Alpha", &server.uri(), None, 1, false)
        .await;

    assert!(result.success);
    assert_eq!(result.total_results, 1);
}

#[tokio::test]
async fn test_first_page_not_found_fails_crawl() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("harvest.db");
    let config = parse_config(&config_toml(
        db_path.to_str().unwrap(),
        &site_section(&server.uri()),
    ))
    .unwrap();
    let coordinator = Coordinator::new(&config).unwrap();

    let result = coordinator
        .crawl_site("Alpha", &server.uri(), None, 10, false)
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("404"));
    assert_eq!(result.total_results, 0);
    assert_eq!(coordinator.cached_results(), 0);
}
