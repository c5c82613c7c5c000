//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, enabling E2E testing without network
//! access.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use photofeed_core::{
    testing::{MockByteCache, MockFetcher},
    ByteCache, CacheConfig, CachingMode, Config, FeedConfig, PhotoFeed, PhotoFetcher, SearchDebouncer, ServerConfig,
    UnsplashConfig,
};
use photofeed_server::api::WsBroadcaster;
use photofeed_server::state::AppState;

/// Re-export fixtures for test convenience
pub use photofeed_core::testing::fixtures;

/// Quiet period used by the fixture's search debouncer.
pub const DEBOUNCE: Duration = Duration::from_millis(50);

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_search() {
///     let fixture = TestFixture::new().await;
///     fixture.fetcher.push_page(fixtures::page(&["a"], 1, 1)).await;
///
///     let response = fixture.post("/api/v1/feed/search", json!({ "query": "cats" })).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock search API - script pages and errors
    pub fetcher: Arc<MockFetcher>,
    /// Mock image cache - control caching outcomes
    pub cache: Arc<MockByteCache>,
    /// The feed behind the router
    pub feed: Arc<PhotoFeed>,
    /// Temporary directory served as the image directory
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with lazy caching.
    pub async fn new() -> Self {
        Self::with_caching(CachingMode::Lazy).await
    }

    /// Create a test fixture with the given caching mode.
    pub async fn with_caching(caching: CachingMode) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let fetcher = Arc::new(MockFetcher::new());
        let cache = Arc::new(MockByteCache::new());

        let feed_config = FeedConfig {
            caching,
            search_debounce_ms: DEBOUNCE.as_millis() as u64,
            ..FeedConfig::default()
        };
        let config = Config {
            unsplash: UnsplashConfig {
                api_key: "test-key".to_string(),
                base_url: None,
                timeout_secs: 5,
            },
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            cache: CacheConfig {
                dir: temp_dir.path().to_path_buf(),
                timeout_secs: 5,
            },
            feed: feed_config.clone(),
        };

        let feed = Arc::new(PhotoFeed::new(
            feed_config,
            Arc::clone(&fetcher) as Arc<dyn PhotoFetcher>,
            Arc::clone(&cache) as Arc<dyn ByteCache>,
        ));
        let debouncer = SearchDebouncer::spawn(Arc::clone(&feed), DEBOUNCE);

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&feed),
            debouncer,
            WsBroadcaster::default(),
        ));

        let router = photofeed_server::api::create_router(state);

        Self {
            router,
            fetcher,
            cache,
            feed,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a GET request and return the raw body.
    pub async fn get_raw(&self, path: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, body.to_vec())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
