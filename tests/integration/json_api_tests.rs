//! End-to-end crawls of a JSON search API served by wiremock

use crate::common::config_toml;
use job_harvester::config::parse_config;
use job_harvester::{Coordinator, SiteTarget, TerminationReason};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn site_section(base_url: &str) -> String {
    format!(
        r#"
[[site]]
name = "Beta"
url = "{}"
kind = "json"
search-path = "/api/jobs"
keyword-param = "keyword"

[site.extra-params]
country = "kr"

[site.json]
items = "/data/jobs"
fallback-items = ["/jobs"]
id = "/id"
title = "/position/title"
company = "/company/name"
location = "/location"
has-more = "/hasMore"
detail-path = "/api/jobs/{{id}}"
tech-stack = "/detail/skills"
salary = "/detail/salary"
deadline = "/detail/dueDate"
"#,
        base_url
    )
}

async fn mount_api(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "jobs": [
                { "id": 3, "position": { "title": "SRE" }, "company": { "name": "Initech" } }
            ]},
            "hasMore": false
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .and(query_param("country", "kr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "jobs": [
                { "id": 1, "position": { "title": "Rust Developer" }, "company": { "name": "ACME" }, "location": "Seoul" },
                { "id": 2, "position": { "title": "Go Developer" }, "company": { "name": "ACME" } },
                { "id": 9, "position": { "title": "" } }
            ]},
            "hasMore": true
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/jobs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "detail": { "skills": ["Rust", "Tokio"], "salary": "80M KRW", "dueDate": "2026-12-31" }
        })))
        .mount(server)
        .await;

    // Other detail pages are missing; enrichment skips them
    Mock::given(method("GET"))
        .and(path("/api/jobs/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_json_api_crawl_end_to_end() {
    let server = MockServer::start().await;
    mount_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("harvest.db");
    let config = parse_config(&config_toml(
        db_path.to_str().unwrap(),
        &site_section(&server.uri()),
    ))
    .unwrap();

    let coordinator = Coordinator::new(&config).unwrap();
    let result = coordinator
        .crawl_site("beta", &server.uri(), Some("developer"), 10, false)
        .await;

    assert!(result.success, "crawl failed: {:?}", result.error);
    assert_eq!(result.site, "Beta");
    assert_eq!(result.pages_fetched, 2);
    assert_eq!(result.termination, Some(TerminationReason::NoNextPage));
    assert!(result.search_url.contains("keyword=developer"));
    assert!(result.search_url.contains("country=kr"));

    let ids: Vec<&str> = result.listings.iter().filter_map(|l| l.id.as_deref()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);

    let rust = &result.listings[0];
    assert_eq!(rust.title, "Rust Developer");
    assert_eq!(rust.company, "ACME");
    assert_eq!(rust.location, "Seoul");
    assert_eq!(rust.url, format!("{}/api/jobs/1", server.uri()));
    assert_eq!(rust.enrichment.tech_stack, vec!["Rust", "Tokio"]);
    assert_eq!(rust.enrichment.salary.as_deref(), Some("80M KRW"));
    assert_eq!(rust.enrichment.deadline.as_deref(), Some("2026-12-31"));

    assert!(result.listings[1].enrichment.is_empty());
    assert!(result.listings[2].enrichment.is_empty());
    assert_eq!(result.saved_count, Some(3));
}

#[tokio::test]
async fn test_multi_site_with_unreachable_site() {
    let server = MockServer::start().await;
    mount_api(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("harvest.db");
    let sites = format!(
        "{}\n{}",
        site_section(&server.uri()),
        r#"
[[site]]
name = "Gamma"
url = "http://127.0.0.1:9"
kind = "json"
search-path = "/api/jobs"

[site.json]
items = "/jobs"
title = "/title"
"#
    );
    let mut config = parse_config(&config_toml(db_path.to_str().unwrap(), &sites)).unwrap();
    config.crawler.max_retries = 0;
    config.crawler.enrich_details = false;

    let coordinator = Coordinator::new(&config).unwrap();
    let targets = vec![
        SiteTarget::new("Gamma", "http://127.0.0.1:9"),
        SiteTarget::new("Beta", server.uri()),
    ];
    let result = coordinator.crawl_multiple(targets, None, 2, false).await;

    assert_eq!(result.sites.len(), 2);
    assert_eq!(result.sites[0].site, "Gamma");
    assert!(!result.sites[0].success);
    assert_eq!(result.sites[1].site, "Beta");
    assert!(result.sites[1].success);
    assert_eq!(result.sites[1].total_results, 2);
}
