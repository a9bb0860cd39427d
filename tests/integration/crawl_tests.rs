//! Integration tests for the worker
//!
//! These tests use wiremock to stand in for both the tracker and the crawled
//! sites, and drive the full claim, fetch, build, submit cycle end-to-end.

use crawly_worker::config::{Config, CrawlerConfig, IdentityConfig, TrackerConfig};
use crawly_worker::crawler::{run_worker, CycleOutcome, Dispatcher};
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a worker configuration pointing at the given tracker
fn create_test_config(tracker: &MockServer, submit_threshold: u32) -> Config {
    Config {
        tracker: TrackerConfig {
            host: tracker.uri(),
            username: "tester".to_string(),
            request_timeout_secs: 5,
        },
        crawler: CrawlerConfig {
            pool_size: 4,
            fetch_timeout_secs: 5,
            max_body_bytes: 64 * 1024,
            submit_threshold,
            backoff_initial_ms: 10,
            backoff_max_ms: 50,
        },
        identity: IdentityConfig {
            user_agent: "TestAgent/1.0".to_string(),
            client_id: "test-client 0.1".to_string(),
        },
    }
}

/// Issues `urls` on the first claim and nothing afterwards
async fn mount_queue(tracker: &MockServer, urls: Vec<String>) {
    Mock::given(method("GET"))
        .and(path("/jobs/queue"))
        .and(query_param("username", "tester"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "urls": urls })))
        .up_to_n_times(1)
        .mount(tracker)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs/queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "urls": [] })))
        .mount(tracker)
        .await;
}

async fn mount_submit(tracker: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/jobs/submit"))
        .and(query_param("username", "tester"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
        .mount(tracker)
        .await;
}

async fn mount_site(site: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r##"<html><head>
                <title>  Home   Page </title>
                <meta name="description" content="A test site">
                <link rel="stylesheet" href="/style.css">
                </head><body>
                <a href="/about">About</a>
                <a href="//cdn.example.org/lib">CDN</a>
                <a href="https://other.example.com/x">Other</a>
                <a href="#top">Top</a>
                <img src="img/logo.png">
                </body></html>"##,
            "text/html",
        ))
        .mount(site)
        .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "https://x.com/new"))
        .mount(site)
        .await;

    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x25u8, 0x50, 0x44, 0x46], "application/pdf"))
        .mount(site)
        .await;
}

/// Every item of every batch the tracker received, as raw JSON
async fn submitted_items(tracker: &MockServer) -> Vec<Value> {
    tracker
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.url.path() == "/jobs/submit")
        .flat_map(|request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            body["items"].as_array().cloned().unwrap_or_default()
        })
        .collect()
}

fn item_for<'a>(items: &'a [Value], url: &str) -> &'a Value {
    items
        .iter()
        .find(|item| item["url"] == url)
        .unwrap_or_else(|| panic!("no record submitted for {}", url))
}

fn strings(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_full_cycle_reports_pages() {
    let tracker = MockServer::start().await;
    let site = MockServer::start().await;
    mount_site(&site).await;

    let home = format!("{}/", site.uri());
    let old = format!("{}/old", site.uri());
    mount_queue(&tracker, vec![home.clone(), old.clone()]).await;
    mount_submit(&tracker).await;

    let config = create_test_config(&tracker, 1);

    // Stop once both records have reached the tracker
    let shutdown = async {
        loop {
            if submitted_items(&tracker).await.len() >= 2 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    };

    let stats = tokio::time::timeout(Duration::from_secs(10), run_worker(config, shutdown))
        .await
        .expect("worker did not finish")
        .expect("worker failed to start");

    assert_eq!(stats.submitted, 2);
    assert_eq!(stats.dropped, 0);

    let items = submitted_items(&tracker).await;
    assert_eq!(items.len(), 2);

    let page = item_for(&items, &home);
    assert_eq!(page["response"], 200);
    assert_eq!(page["username"], "tester");
    assert_eq!(page["client"], "test-client 0.1");
    assert_eq!(page["user_agent"], "TestAgent/1.0");
    assert_eq!(page["meta"]["html_title"], "Home Page");
    assert_eq!(page["meta"]["description"], "A test site");
    assert!(page["headers"]["content-type"]
        .as_str()
        .unwrap()
        .starts_with("text/html"));

    let outlinks = strings(&page["discovered_outlinks"]);
    assert!(outlinks.contains(&format!("{}/about", site.uri()).as_str()));
    assert!(outlinks.contains(&"https://cdn.example.org/lib"));
    assert!(outlinks.contains(&"https://other.example.com/x"));
    assert!(outlinks.iter().all(|link| !link.contains('#')));

    let embeds = strings(&page["discovered_embeds"]);
    assert!(embeds.contains(&format!("{}/style.css", site.uri()).as_str()));
    assert!(embeds.contains(&format!("{}/img/logo.png", site.uri()).as_str()));

    let redirect = item_for(&items, &old);
    assert_eq!(redirect["response"], 301);
    let outlinks = strings(&redirect["discovered_outlinks"]);
    assert_eq!(outlinks.last(), Some(&"https://x.com/new"));
}

#[tokio::test]
async fn test_unparseable_and_unreachable_units_are_not_reported() {
    let tracker = MockServer::start().await;
    let site = MockServer::start().await;
    mount_site(&site).await;

    // A port with nothing listening on it
    let closed = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let home = format!("{}/", site.uri());
    mount_queue(
        &tracker,
        vec![
            format!("{}/report.pdf", site.uri()),
            format!("http://127.0.0.1:{}/", closed),
            home.clone(),
        ],
    )
    .await;
    mount_submit(&tracker).await;

    let mut dispatcher = Dispatcher::new(&create_test_config(&tracker, 100)).unwrap();
    assert_eq!(dispatcher.cycle().await, CycleOutcome::Dispatched(3));

    for _ in 0..200 {
        if dispatcher.in_flight() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(dispatcher.in_flight(), 0, "worker tasks did not finish");

    let cache = dispatcher.cache();
    assert_eq!(cache.pending(), 1);
    cache.flush().await;

    let items = submitted_items(&tracker).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["url"], home.as_str());
}

#[tokio::test]
async fn test_buffered_results_are_flushed_on_shutdown() {
    let tracker = MockServer::start().await;
    let site = MockServer::start().await;
    mount_site(&site).await;

    let home = format!("{}/", site.uri());
    let old = format!("{}/old", site.uri());
    mount_queue(&tracker, vec![home.clone(), old.clone()]).await;
    mount_submit(&tracker).await;

    // Threshold is never reached, so only the final flush submits
    let config = create_test_config(&tracker, 50);

    let shutdown = async {
        loop {
            let fetched = site
                .received_requests()
                .await
                .unwrap()
                .iter()
                .filter(|request| request.url.path() == "/" || request.url.path() == "/old")
                .count();
            if fetched >= 2 {
                // Give the tasks a moment to build and cache their records
                tokio::time::sleep(Duration::from_millis(200)).await;
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    };

    let stats = tokio::time::timeout(Duration::from_secs(10), run_worker(config, shutdown))
        .await
        .expect("worker did not finish")
        .expect("worker failed to start");

    assert_eq!(stats.batches, 1);
    assert_eq!(stats.submitted, 2);

    let items = submitted_items(&tracker).await;
    let mut urls: Vec<&str> = items.iter().map(|item| item["url"].as_str().unwrap()).collect();
    urls.sort();
    let mut expected = vec![home.as_str(), old.as_str()];
    expected.sort();
    assert_eq!(urls, expected);
}

#[tokio::test]
async fn test_worker_survives_unavailable_tracker() {
    let tracker = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/queue"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&tracker)
        .await;

    let config = create_test_config(&tracker, 1);
    let stats = tokio::time::timeout(
        Duration::from_secs(5),
        run_worker(config, tokio::time::sleep(Duration::from_millis(300))),
    )
    .await
    .expect("worker did not stop")
    .expect("worker failed to start");

    assert_eq!(stats.batches, 0);
    let claims = tracker.received_requests().await.unwrap().len();
    assert!(claims >= 2, "tracker was polled only {} times", claims);
}
