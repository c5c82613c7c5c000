//! Types for the photo search client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::photo::PhotoPage;

/// Parameters for fetching one page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Free-text search query.
    pub query: String,
    /// 1-based page number.
    pub page: u32,
    /// Number of photos per page.
    pub per_page: u32,
}

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Search API connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Search API rejected the credentials")]
    Unauthorized,

    #[error("Search API rate limit exceeded")]
    RateLimited,

    #[error("Search API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl FetchError {
    /// Map a transport-level reqwest error.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::ConnectionFailed(err.to_string())
        } else if err.is_decode() {
            FetchError::ParseError(err.to_string())
        } else {
            FetchError::ConnectionFailed(err.to_string())
        }
    }
}

/// Trait for photo search backends.
///
/// Implementations must be safe to call repeatedly with the same request; the
/// feed may retry a page after a failure.
#[async_trait]
pub trait PhotoFetcher: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Fetch one page of results.
    async fn fetch_page(&self, request: &PageRequest) -> Result<PhotoPage, FetchError>;
}
