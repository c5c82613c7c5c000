//! Types for the photo feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetcher::FetchError;

use super::CachingMode;

/// Errors surfaced by feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The page fetch failed. Pagination position is unchanged.
    #[error("page fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The feed was shut down.
    #[error("feed is closed")]
    Closed,
}

/// Pagination state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    #[default]
    Ready,
    Fetching,
    /// Terminal, after shutdown.
    Closed,
}

/// Result of a next-page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PageOutcome {
    /// Nothing was requested: already fetching, no more pages, no query, or
    /// closed.
    Skipped,
    /// A page was merged into the store.
    Appended { page: u32, count: usize },
    /// The API returned an empty page; pagination stopped.
    Exhausted { page: u32 },
    /// A reset happened while the page was in flight; its result was dropped.
    Cancelled,
}

/// Where pagination currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageCursor {
    page: u32,
    total_pages: Option<u32>,
    has_more: bool,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageCursor {
    pub fn new() -> Self {
        Self {
            page: 1,
            total_pages: None,
            has_more: true,
        }
    }

    /// Next page to request (1-based).
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Total page count, once learned from a response.
    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record a successful non-empty page.
    pub fn advance(&mut self, total_pages: u32) {
        self.total_pages = Some(total_pages);
        if self.page < total_pages {
            self.page += 1;
            self.has_more = true;
        } else {
            self.has_more = false;
        }
    }

    /// Record an empty page.
    pub fn exhaust(&mut self) {
        self.has_more = false;
    }
}

/// A page fetch failure, published once on the error stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedErrorEvent {
    pub query: String,
    pub page: u32,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Point-in-time summary of the feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedStatus {
    pub state: FeedState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    pub has_more: bool,
    pub photo_count: usize,
    pub caching_tasks: usize,
    pub caching: CachingMode,
}
