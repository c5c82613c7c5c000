//! End-to-end tests with mocked external dependencies.
//!
//! These tests run the full server stack in-process with mock implementations
//! of the search API and the image cache.

#[macro_use]
mod common;

use std::time::Duration;

use axum::http::StatusCode;
use photofeed_core::{CachingMode, FetchError};
use serde_json::json;

use common::{fixtures, TestFixture, DEBOUNCE};

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/config").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["unsplash"]["api_key_configured"], true);
    assert!(response.body["unsplash"].get("api_key").is_none());
    assert_eq!(response.body["feed"]["per_page"], 21);
    assert_eq!(response.body["feed"]["caching"], "lazy");
}

#[tokio::test]
async fn test_empty_feed() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/feed").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["photos"], json!([]));
    assert_eq!(response.body["status"]["state"], "ready");
    assert_eq!(response.body["status"]["page"], 1);
    assert_eq!(response.body["status"]["has_more"], true);
}

// =============================================================================
// Search and Pagination
// =============================================================================

#[tokio::test]
async fn test_search_loads_first_page() {
    let fixture = TestFixture::new().await;
    fixture
        .fetcher
        .push_page(fixtures::page(&["a", "b", "c"], 1, 1))
        .await;

    let response = fixture
        .post("/api/v1/feed/search", json!({ "query": "cats" }))
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["outcome"], "appended");
    assert_eq!(response.body["page"], 1);
    assert_eq!(response.body["count"], 3);
    assert_eq!(response.body["status"]["query"], "cats");
    assert_eq!(response.body["status"]["has_more"], false);

    fixture.feed.wait_for_caching().await;

    let feed = fixture.get("/api/v1/feed").await;
    let photos = feed.body["photos"].as_array().unwrap();
    let ids: Vec<_> = photos.iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(photos.iter().all(|p| p["loading_status"] == "loaded"));
    assert!(photos.iter().all(|p| p["image_url"].is_string()));
}

#[tokio::test]
async fn test_search_rejects_blank_query() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/api/v1/feed/search", json!({ "query": "   " }))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(fixture.fetcher.request_count().await, 0);
}

#[tokio::test]
async fn test_next_page_walks_cursor() {
    let fixture = TestFixture::new().await;
    fixture
        .fetcher
        .push_page(fixtures::page(&["a", "b"], 1, 2))
        .await;
    fixture
        .fetcher
        .push_page(fixtures::page(&["c", "d"], 2, 2))
        .await;

    fixture
        .post("/api/v1/feed/search", json!({ "query": "cats" }))
        .await;

    let second = fixture.post_empty("/api/v1/feed/next-page").await;
    assert_status!(second, StatusCode::OK);
    assert_eq!(second.body["outcome"], "appended");
    assert_eq!(second.body["page"], 2);
    assert_eq!(second.body["status"]["has_more"], false);

    let third = fixture.post_empty("/api/v1/feed/next-page").await;
    assert_status!(third, StatusCode::OK);
    assert_eq!(third.body["outcome"], "skipped");

    let status = fixture.get("/api/v1/feed/status").await;
    assert_eq!(status.body["photo_count"], 4);
    assert_eq!(fixture.fetcher.request_count().await, 2);
}

#[tokio::test]
async fn test_next_page_without_query_is_skipped() {
    let fixture = TestFixture::new().await;
    let response = fixture.post_empty("/api/v1/feed/next-page").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["outcome"], "skipped");
}

#[tokio::test]
async fn test_fetch_failure_maps_to_status() {
    let fixture = TestFixture::new().await;
    fixture.fetcher.push_error(FetchError::RateLimited).await;

    let response = fixture
        .post("/api/v1/feed/search", json!({ "query": "cats" }))
        .await;

    assert_status!(response, StatusCode::TOO_MANY_REQUESTS);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("rate limit"));

    let status = fixture.get("/api/v1/feed/status").await;
    assert_eq!(status.body["state"], "ready");
    assert_eq!(status.body["page"], 1);
}

#[tokio::test]
async fn test_reset_clears_feed_keeps_query() {
    let fixture = TestFixture::new().await;
    fixture
        .fetcher
        .push_page(fixtures::page(&["a", "b"], 1, 3))
        .await;
    fixture
        .post("/api/v1/feed/search", json!({ "query": "cats" }))
        .await;

    let response = fixture.post_empty("/api/v1/feed/reset").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["photo_count"], 0);
    assert_eq!(response.body["page"], 1);
    assert_eq!(response.body["query"], "cats");
}

#[tokio::test]
async fn test_eager_mode_drops_failed_photos() {
    let fixture = TestFixture::with_caching(CachingMode::Eager).await;
    fixture
        .fetcher
        .push_page(fixtures::page(&["a", "b", "c"], 1, 1))
        .await;
    fixture.cache.fail_url(&fixtures::thumb_url("b")).await;

    let response = fixture
        .post("/api/v1/feed/search", json!({ "query": "cats" }))
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["count"], 2);

    let missing = fixture.get("/api/v1/feed/photos/b").await;
    assert_status!(missing, StatusCode::NOT_FOUND);

    let found = fixture.get("/api/v1/feed/photos/a").await;
    assert_status!(found, StatusCode::OK);
    assert_eq!(found.body["loading_status"], "loaded");
}

// =============================================================================
// Debounced Input
// =============================================================================

#[tokio::test]
async fn test_search_input_is_debounced() {
    let fixture = TestFixture::new().await;
    fixture
        .fetcher
        .push_page(fixtures::page(&["a"], 1, 1))
        .await;

    for text in ["d", "do", "dog", "dogs"] {
        let response = fixture
            .post("/api/v1/feed/search/input", json!({ "text": text }))
            .await;
        assert_status!(response, StatusCode::ACCEPTED);
    }

    tokio::time::sleep(DEBOUNCE * 4).await;

    let requests = fixture.fetcher.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query, "dogs");

    let status = fixture.get("/api/v1/feed/status").await;
    assert_eq!(status.body["query"], "dogs");
}

// =============================================================================
// Images and Metrics
// =============================================================================

#[tokio::test]
async fn test_images_served_from_cache_dir() {
    let fixture = TestFixture::new().await;
    let path = fixture.temp_dir.path().join("abc123");
    tokio::fs::write(&path, b"jpeg bytes").await.unwrap();

    let (status, body) = fixture.get_raw("/images/abc123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"jpeg bytes");

    let (status, _) = fixture.get_raw("/images/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture
        .fetcher
        .push_page(fixtures::page(&["a"], 1, 1))
        .await;
    fixture
        .post("/api/v1/feed/search", json!({ "query": "cats" }))
        .await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (status, body) = fixture.get_raw("/metrics").await;
    let text = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("photofeed_feed_photos"));
    assert!(text.contains("photofeed_pages_fetched_total"));
    assert!(text.contains("photofeed_http_requests_total"));
}
