//! End-to-end tests for the resolve endpoint.
//!
//! Wiremock stands in for every remote collaborator: the metadata/search
//! backend, the transient source host, and the durable file host.

mod common;

use std::time::Duration;

use common::TestHarness;
use serde_json::json;
use tunevault::config::Config;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MEDIA_ID: &str = "dQw4w9WgXcQ";

/// Config pointing every outbound call at the mock server.
fn test_config(remote: &MockServer) -> Config {
    let mut config = Config::default();
    config.providers.invidious_instances = vec![remote.uri()];
    config.relay.upload_url = format!("{}/upload", remote.uri());
    config.relay.link_prefix = "https://".to_string();
    config.relay.download_timeout_secs = 10;
    config.relay.upload_timeout_secs = 10;
    config
}

/// Mount the full happy-path collaborator set: video metadata with a
/// source stream, the source bytes, and a durable host answering a link.
async fn mount_happy_path(remote: &MockServer, delay_download: Option<Duration>) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/videos/{MEDIA_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Test Song",
            "lengthSeconds": 212,
            "videoThumbnails": [
                {"quality": "high", "url": "https://img.example.com/high.jpg"}
            ],
            "formatStreams": [
                {"url": format!("{}/media/{MEDIA_ID}.mp4", remote.uri()), "itag": "18", "container": "mp4"}
            ]
        })))
        .mount(remote)
        .await;

    let mut source = ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]);
    if let Some(delay) = delay_download {
        source = source.set_delay(delay);
    }
    Mock::given(method("GET"))
        .and(path(format!("/media/{MEDIA_ID}.mp4")))
        .respond_with(source)
        .mount(remote)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("https://files.example.com/abcd.mp4\n"),
        )
        .mount(remote)
        .await;
}

async fn get_resolve(addr: std::net::SocketAddr, query: &str, key: &str) -> reqwest::Response {
    reqwest::get(format!(
        "http://{addr}/api/resolve?query={query}&key={key}"
    ))
    .await
    .expect("request failed")
}

#[tokio::test]
async fn first_query_is_accepted_then_resolves() {
    let remote = MockServer::start().await;
    mount_happy_path(&remote, None).await;

    let (h, addr) = TestHarness::with_server(test_config(&remote)).await;
    h.seed_key("test-key");

    // Scenario A: cold cache, literal identifier.
    let resp = get_resolve(addr, MEDIA_ID, "test-key").await;
    assert_eq!(resp.status(), 202);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], 202);
    assert_eq!(body["media_id"], MEDIA_ID);
    assert_eq!(body["title"], "Test Song");
    assert!(body["link"].is_null());
    assert_eq!(body["cached"], false);

    // Scenario B: the background relay completes and the cache serves it.
    let mut resolved = None;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let resp = get_resolve(addr, MEDIA_ID, "test-key").await;
        if resp.status() == 200 {
            resolved = Some(resp.json::<serde_json::Value>().await.unwrap());
            break;
        }
    }
    let body = resolved.expect("relay never completed");
    assert_eq!(body["status"], 200);
    assert_eq!(body["link"], "https://files.example.com/abcd.mp4");
    assert_eq!(body["cached"], true);
    assert_eq!(body["title"], "Test Song");
    assert_eq!(body["duration"], "3:32");
    assert_eq!(body["media_id"], MEDIA_ID);
}

#[tokio::test]
async fn concurrent_first_queries_share_one_fetch() {
    let remote = MockServer::start().await;
    // Slow source download keeps the fetch in flight while we probe.
    mount_happy_path(&remote, Some(Duration::from_secs(2))).await;

    let (h, addr) = TestHarness::with_server(test_config(&remote)).await;
    h.seed_key("test-key");

    let first = get_resolve(addr, MEDIA_ID, "test-key").await;
    assert_eq!(first.status(), 202);

    // While the admitted fetch is still downloading, another request for
    // the same identifier observes "already in flight" and does not fetch.
    let second = get_resolve(addr, MEDIA_ID, "test-key").await;
    assert_eq!(second.status(), 202);

    let downloads = remote
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().starts_with("/media/"))
        .count();
    assert!(downloads <= 1, "expected at most one source download");
}

#[tokio::test]
async fn free_text_query_resolves_through_search() {
    let remote = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "videoId": MEDIA_ID,
                "title": "Test Song",
                "lengthSeconds": 212,
                "videoThumbnails": []
            }
        ])))
        .mount(&remote)
        .await;
    mount_happy_path(&remote, None).await;

    let (h, addr) = TestHarness::with_server(test_config(&remote)).await;
    h.seed_key("test-key");

    let resp = get_resolve(addr, "test%20song", "test-key").await;
    assert_eq!(resp.status(), 202);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["media_id"], MEDIA_ID);
    assert_eq!(body["title"], "Test Song");
    assert_eq!(body["duration"], "3:32");
}

#[tokio::test]
async fn invalid_key_is_rejected_without_collaborator_calls() {
    let remote = MockServer::start().await;
    mount_happy_path(&remote, None).await;

    let (h, addr) = TestHarness::with_server(test_config(&remote)).await;
    h.seed_key("good-key");

    // Scenario C: wrong key.
    let resp = get_resolve(addr, MEDIA_ID, "wrong-key").await;
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], 403);
    assert!(body["link"].is_null());
    assert!(body["media_id"].is_null());

    // Missing key behaves the same.
    let resp = reqwest::get(format!("http://{addr}/api/resolve?query={MEDIA_ID}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // No provider, source, or host call may have happened.
    assert!(remote.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_search_results_are_not_found() {
    let remote = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&remote)
        .await;

    let (h, addr) = TestHarness::with_server(test_config(&remote)).await;
    h.seed_key("test-key");

    // Scenario D: the chain answers definitively empty.
    let resp = get_resolve(addr, "nothing%20matches%20this", "test-key").await;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], 404);
    assert!(body["link"].is_null());
}

#[tokio::test]
async fn broken_providers_surface_as_exhaustion() {
    let remote = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&remote)
        .await;

    let (h, addr) = TestHarness::with_server(test_config(&remote)).await;
    h.seed_key("test-key");

    let resp = get_resolve(addr, "some%20query", "test-key").await;
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], 500);
}

#[tokio::test]
async fn stats_reports_resolved_records() {
    let remote = MockServer::start().await;
    mount_happy_path(&remote, None).await;

    let (h, addr) = TestHarness::with_server(test_config(&remote)).await;
    h.seed_key("test-key");

    let resp = reqwest::get(format!("http://{addr}/api/stats")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["resolved_records"], 0);

    // Resolve one item end to end, then the counter moves.
    get_resolve(addr, MEDIA_ID, "test-key").await;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if get_resolve(addr, MEDIA_ID, "test-key").await.status() == 200 {
            break;
        }
    }

    let resp = reqwest::get(format!("http://{addr}/api/stats")).await.unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["resolved_records"], 1);
}
