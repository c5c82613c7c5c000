//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Pagination (page fetches and their latency)
//! - Image caching (cache lookups, background caching tasks)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Pagination Metrics
// =============================================================================

/// Page fetches total by result.
pub static PAGES_FETCHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("photofeed_pages_fetched_total", "Total page fetches"),
        &["result"], // "appended", "exhausted", "failed", "cancelled"
    )
    .unwrap()
});

/// Page fetch duration in seconds.
pub static PAGE_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "photofeed_page_fetch_duration_seconds",
            "Duration of page fetches from the search API",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["fetcher", "result"],
    )
    .unwrap()
});

// =============================================================================
// Image Cache Metrics
// =============================================================================

/// Image cache lookups by result.
pub static IMAGE_CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "photofeed_image_cache_lookups_total",
            "Total image cache lookups",
        ),
        &["result"], // "hit", "downloaded", "failed"
    )
    .unwrap()
});

/// Background caching tasks by lifecycle event.
pub static CACHE_TASKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "photofeed_cache_tasks_total",
            "Background caching tasks by lifecycle event",
        ),
        &["event"], // "started", "cancelled"
    )
    .unwrap()
});

/// Background caching tasks currently registered.
pub static CACHE_TASKS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "photofeed_cache_tasks_active",
        "Number of registered background caching tasks",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Pagination
        Box::new(PAGES_FETCHED.clone()),
        Box::new(PAGE_FETCH_DURATION.clone()),
        // Image cache
        Box::new(IMAGE_CACHE_LOOKUPS.clone()),
        Box::new(CACHE_TASKS.clone()),
        Box::new(CACHE_TASKS_ACTIVE.clone()),
    ]
}
