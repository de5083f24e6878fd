//! Integration tests for the crawler
//!
//! These tests run whole crawls end-to-end: against wiremock servers with the
//! real HTTP fetcher, and against an in-memory fetcher for scenarios that
//! need several host names.

use async_trait::async_trait;
use chrono::Utc;
use ripple_crawl::config::CrawlOptions;
use ripple_crawl::crawler::{
    crawl, Coordinator, CrawlControl, FetchError, FetchResult, Fetcher, Response, VisitEvent,
};
use ripple_crawl::state::JobState;
use ripple_crawl::url::HostScope;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves canned pages by URL; anything else is a 404
#[derive(Default)]
struct StaticFetcher {
    pages: HashMap<String, (String, String)>,
    fetched: Mutex<Vec<String>>,
}

impl StaticFetcher {
    fn page(self, url: &str, body: &str) -> Self {
        self.redirect(url, url, body)
    }

    fn redirect(mut self, from: &str, to: &str, body: &str) -> Self {
        self.pages
            .insert(from.to_string(), (to.to_string(), body.to_string()));
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str, _user_agent: &str) -> FetchResult {
        self.fetched.lock().unwrap().push(url.to_string());
        let (resolved, body) = self.pages.get(url).ok_or(FetchError::HttpStatus(404))?;
        Ok(Response {
            resolved_url: Url::parse(resolved).unwrap(),
            status: 200,
            headers: BTreeMap::new(),
            content_type: Some("text/html".to_string()),
            charset: None,
            content_encoding: None,
            last_modified: None,
            body: body.clone(),
            fetched_at: Utc::now(),
        })
    }
}

fn fast_options(workers: usize) -> CrawlOptions {
    CrawlOptions::default()
        .with_workers(workers)
        .with_delay(Duration::ZERO)
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!("<html><body>{}</body></html>", body))
}

/// Mounts a GET mock that must be hit exactly once
async fn mount_once(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_breadth_first_order() {
    let server = MockServer::start().await;
    mount_once(&server, "/", html_page(r#"<a href="/a">A</a><a href="/b">B</a>"#)).await;
    mount_once(&server, "/a", html_page(r#"<a href="/c">C</a>"#)).await;
    mount_once(&server, "/b", html_page(r#"<a href="/d">D</a><a href="/a#top">A</a>"#)).await;
    mount_once(&server, "/c", html_page(r#"<a href="/">home</a>"#)).await;
    mount_once(&server, "/d", html_page("leaf")).await;

    let mut visits = Vec::new();
    let summary = crawl(&[server.uri()], fast_options(1), |event: &VisitEvent| {
        let path = Url::parse(&event.requested_url).unwrap().path().to_string();
        visits.push((path, event.depth));
        CrawlControl::Continue
    })
    .await
    .unwrap();

    let expected: Vec<(String, u32)> = [("/", 0), ("/a", 1), ("/b", 1), ("/c", 2), ("/d", 2)]
        .iter()
        .map(|(p, d)| (p.to_string(), *d))
        .collect();
    assert_eq!(visits, expected);
    assert_eq!(summary.pages_visited, 5);
    assert_eq!(summary.failures, 0);
    assert_eq!(summary.jobs_discovered, 5);
    assert!(!summary.aborted);
}

#[tokio::test]
async fn test_no_duplicate_fetches_with_many_workers() {
    let server = MockServer::start().await;
    let pages = 30;

    // Every page links to every other page
    let links: String = (0..pages)
        .map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i))
        .collect();
    mount_once(&server, "/", html_page(&links)).await;
    for i in 0..pages {
        mount_once(&server, &format!("/p{}", i), html_page(&links)).await;
    }

    let mut seen = HashSet::new();
    let mut duplicates = 0;
    let summary = crawl(&[server.uri()], fast_options(4), |event: &VisitEvent| {
        if !seen.insert(event.requested_url.clone()) {
            duplicates += 1;
        }
        assert!(event.depth <= 1);
        CrawlControl::Continue
    })
    .await
    .unwrap();

    assert_eq!(duplicates, 0);
    assert_eq!(seen.len(), pages + 1);
    assert_eq!(summary.pages_visited, pages + 1);
    assert_eq!(summary.workers.len(), 4);
    assert_eq!(
        summary.workers.iter().map(|w| w.pages_fetched).sum::<usize>(),
        pages + 1
    );
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "RippleTest/2.0"))
        .respond_with(html_page("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let summary = crawl(
        &[server.uri()],
        fast_options(1).with_user_agent("RippleTest/2.0"),
        |event: &VisitEvent| {
            assert!(event.is_success());
            CrawlControl::Continue
        },
    )
    .await
    .unwrap();

    assert_eq!(summary.pages_visited, 1);
}

#[tokio::test]
async fn test_cross_host_link_skipped() {
    let seed = Url::parse("http://a.test/").unwrap();
    let fetcher = Arc::new(
        StaticFetcher::default()
            .page(
                "http://a.test/",
                r#"<a href="/p1">p1</a><a href="http://b.test/x">elsewhere</a>"#,
            )
            .page("http://a.test/p1", "")
            .page("http://b.test/x", ""),
    );

    let options = fast_options(1).with_visit(HostScope::from_seeds([&seed]));
    let coordinator = Coordinator::new(&["http://a.test/"], options, fetcher.clone()).unwrap();
    let jobs = Arc::clone(coordinator.jobs());

    let mut first = None;
    coordinator
        .run(|event: &VisitEvent| {
            first.get_or_insert_with(|| event.requested_url.clone());
            CrawlControl::Continue
        })
        .await
        .unwrap();

    assert_eq!(first.as_deref(), Some("http://a.test/"));
    assert_eq!(jobs.get("http://a.test/p1").unwrap().depth, 1);
    assert!(jobs.get("http://b.test/x").is_none());
    assert_eq!(fetcher.fetched(), vec!["http://a.test/", "http://a.test/p1"]);
}

#[tokio::test]
async fn test_cross_host_link_followed_when_allowed() {
    let seed = Url::parse("http://a.test/").unwrap();
    let fetcher = Arc::new(
        StaticFetcher::default()
            .page(
                "http://a.test/",
                r#"<a href="/p1">p1</a><a href="http://b.test/x">elsewhere</a>"#,
            )
            .page("http://a.test/p1", "")
            .page("http://b.test/x", ""),
    );

    let options = fast_options(1).with_visit(HostScope::from_seeds([&seed]).allow("b.test"));
    let coordinator = Coordinator::new(&["http://a.test/"], options, fetcher.clone()).unwrap();
    let jobs = Arc::clone(coordinator.jobs());

    let summary = coordinator
        .run(|_: &VisitEvent| CrawlControl::Continue)
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 3);
    let job = jobs.get("http://b.test/x").unwrap();
    assert_eq!(job.depth, 1);
    assert_eq!(job.state, JobState::Done);
}

#[tokio::test]
async fn test_failing_seed_terminates_cleanly() {
    let mut events = Vec::new();
    let summary = crawl(&["http://127.0.0.1:1/"], fast_options(1), |event: &VisitEvent| {
        events.push((event.requested_url.clone(), event.result.clone().err()));
        CrawlControl::Continue
    })
    .await
    .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "http://127.0.0.1:1/");
    assert!(matches!(events[0].1, Some(FetchError::Connect(_))));
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.jobs_discovered, 1);
    assert!(!summary.aborted);
}

#[tokio::test]
async fn test_http_error_reported_and_not_retried() {
    let server = MockServer::start().await;
    mount_once(&server, "/", html_page(r#"<a href="/gone">gone</a>"#)).await;
    mount_once(&server, "/gone", ResponseTemplate::new(404)).await;

    let mut errors = Vec::new();
    let summary = crawl(&[server.uri()], fast_options(1), |event: &VisitEvent| {
        if let Err(e) = &event.result {
            errors.push(e.clone());
        }
        CrawlControl::Continue
    })
    .await
    .unwrap();

    assert_eq!(errors, vec![FetchError::HttpStatus(404)]);
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.failures, 1);
}

#[tokio::test]
async fn test_abort_on_first_event_with_four_workers() {
    // A wide site: the seed links to 200 pages, each linking to 200 more
    let mut fetcher = StaticFetcher::default();
    let links: String = (0..200)
        .map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i))
        .collect();
    fetcher = fetcher.page("http://a.test/", &links);
    for i in 0..200 {
        fetcher = fetcher.page(&format!("http://a.test/p{}", i), &links);
    }

    let coordinator = Coordinator::new(
        &["http://a.test/"],
        fast_options(4).with_delay(Duration::from_millis(5)),
        Arc::new(fetcher),
    )
    .unwrap();

    let started = Instant::now();
    let mut calls = 0;
    let summary = coordinator
        .run(|_: &VisitEvent| {
            calls += 1;
            CrawlControl::Abort
        })
        .await
        .unwrap();

    assert_eq!(calls, 1);
    assert_eq!(summary.pages_visited, 1);
    assert!(summary.aborted);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_redirect_records_resolved_url() {
    let server = MockServer::start().await;
    mount_once(
        &server,
        "/old",
        ResponseTemplate::new(302).insert_header("location", "/new"),
    )
    .await;
    mount_once(
        &server,
        "/new",
        html_page(r#"<a href="/new">self</a><a href="/old">old</a>"#),
    )
    .await;

    let seed = format!("{}/old", server.uri());
    let coordinator = Coordinator::new(
        &[seed.as_str()],
        fast_options(1),
        Arc::new(
            ripple_crawl::HttpFetcher::new(&CrawlOptions::default().fetcher).unwrap(),
        ),
    )
    .unwrap();
    let jobs = Arc::clone(coordinator.jobs());

    let mut resolved = Vec::new();
    let summary = coordinator
        .run(|event: &VisitEvent| {
            resolved.push(event.url().to_string());
            CrawlControl::Continue
        })
        .await
        .unwrap();

    let new_url = format!("{}/new", server.uri());
    assert_eq!(resolved, vec![new_url.clone()]);
    assert_eq!(summary.pages_visited, 1);

    let job = jobs.get(&new_url).unwrap();
    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.depth, 0);
}

#[tokio::test]
async fn test_config_scope_end_to_end() {
    let config = ripple_crawl::config::parse_config(
        r#"
seeds = ["http://a.test/"]

[crawler]
workers = 2
delay = 0.0

[scope]
allow = ["*.b.test"]
"#,
    )
    .unwrap();

    let fetcher = Arc::new(
        StaticFetcher::default()
            .page(
                "http://a.test/",
                r#"<a href="http://www.b.test/">b</a><a href="http://c.test/">c</a>"#,
            )
            .page("http://www.b.test/", ""),
    );

    let options = config.to_options().unwrap();
    let summary = Coordinator::new(&config.seeds, options, fetcher.clone())
        .unwrap()
        .run(|_: &VisitEvent| CrawlControl::Continue)
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 2);
    let mut fetched = fetcher.fetched();
    fetched.sort();
    assert_eq!(fetched, vec!["http://a.test/", "http://www.b.test/"]);
}
