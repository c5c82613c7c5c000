//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the photofeed server:
//! - HTTP request metrics (latency, counts)
//! - WebSocket connection metrics
//! - Feed state (collected dynamically on scrape)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "photofeed_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("photofeed_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "photofeed_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "photofeed_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "photofeed_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("photofeed_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "photofeed_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Feed Metrics (collected dynamically)
// =============================================================================

/// Photos currently in the feed, placeholders included.
pub static FEED_PHOTOS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("photofeed_feed_photos", "Photos currently in the feed").unwrap()
});

/// Photos whose thumbnail is cached.
pub static FEED_PHOTOS_LOADED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "photofeed_feed_photos_loaded",
        "Photos in the feed with a cached thumbnail",
    )
    .unwrap()
});

/// Whether a page fetch is in flight (1) or not (0).
pub static FEED_FETCHING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "photofeed_feed_fetching",
        "Whether a page fetch is in flight (1) or not (0)",
    )
    .unwrap()
});

/// Next page the feed will request.
pub static FEED_NEXT_PAGE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("photofeed_feed_next_page", "Next page the feed will request").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP metrics
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket metrics
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Feed metrics
    registry.register(Box::new(FEED_PHOTOS.clone())).unwrap();
    registry
        .register(Box::new(FEED_PHOTOS_LOADED.clone()))
        .unwrap();
    registry.register(Box::new(FEED_FETCHING.clone())).unwrap();
    registry.register(Box::new(FEED_NEXT_PAGE.clone())).unwrap();

    // Core metrics (pagination, image cache, caching tasks)
    for metric in photofeed_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics in Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh the feed gauges from current state. Called on each scrape.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let feed = state.feed();
    let status = feed.status().await;
    let loaded = feed
        .snapshot()
        .await
        .iter()
        .filter(|photo| photo.is_loaded())
        .count();

    FEED_PHOTOS.set(status.photo_count as i64);
    FEED_PHOTOS_LOADED.set(loaded as i64);
    FEED_FETCHING.set(i64::from(
        status.state == photofeed_core::FeedState::Fetching,
    ));
    FEED_NEXT_PAGE.set(i64::from(status.page));
}

/// Collapse per-resource path segments so label cardinality stays bounded.
pub fn normalize_path(path: &str) -> String {
    let photo_regex = regex_lite::Regex::new(r"/photos/[^/]+").unwrap();
    let image_regex = regex_lite::Regex::new(r"^/images/.+$").unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    if image_regex.is_match(path) {
        return "/images/{file}".to_string();
    }

    let result = photo_regex.replace_all(path, "/photos/{id}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}
