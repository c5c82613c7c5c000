//! Feed configuration.

use serde::{Deserialize, Serialize};

/// How thumbnails are cached when a page arrives.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CachingMode {
    /// Insert the raw page right away and cache each photo in the background.
    #[default]
    Lazy,
    /// Cache the whole page first and insert only the photos that succeeded.
    Eager,
}

/// Configuration for the photo feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Photos requested per page. Also the number of placeholder rows shown
    /// while the first page loads.
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Caching strategy.
    #[serde(default)]
    pub caching: CachingMode,

    /// Quiet period before debounced search input triggers a search
    /// (milliseconds).
    #[serde(default = "default_search_debounce")]
    pub search_debounce_ms: u64,

    /// Query to load on startup, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_query: Option<String>,
}

fn default_per_page() -> u32 {
    21
}

fn default_search_debounce() -> u64 {
    400
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            caching: CachingMode::default(),
            search_debounce_ms: default_search_debounce(),
            initial_query: None,
        }
    }
}
