//! Unsplash search API client.
//!
//! Uses `GET /search/photos` with a `Client-ID` authorization header.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::UnsplashConfig;
use crate::metrics::PAGE_FETCH_DURATION;
use crate::photo::{Photo, PhotoPage, PhotoUrls};

use super::{FetchError, PageRequest, PhotoFetcher};

const DEFAULT_BASE_URL: &str = "https://api.unsplash.com";

/// Unsplash search client.
pub struct UnsplashClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for UnsplashClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsplashClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl UnsplashClient {
    /// Create a new Unsplash client.
    pub fn new(config: &UnsplashConfig) -> Result<Self, FetchError> {
        if config.api_key.trim().is_empty() {
            return Err(FetchError::NotConfigured(
                "Unsplash API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| FetchError::NotConfigured(e.to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search/photos", self.base_url)
    }

    async fn search(&self, request: &PageRequest) -> Result<PhotoPage, FetchError> {
        let response = self
            .client
            .get(self.search_url())
            .header(header::AUTHORIZATION, format!("Client-ID {}", self.api_key))
            .header("Accept-Version", "v1")
            .query(&[
                ("query", request.query.clone()),
                ("page", request.page.to_string()),
                ("per_page", request.per_page.to_string()),
            ])
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = response.text().await.map_err(FetchError::from_transport)?;
        parse_search_response(&body, request.page)
    }
}

#[async_trait]
impl PhotoFetcher for UnsplashClient {
    fn name(&self) -> &str {
        "unsplash"
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<PhotoPage, FetchError> {
        let start = Instant::now();
        debug!(
            query = %request.query,
            page = request.page,
            per_page = request.per_page,
            "Unsplash search"
        );

        let result = self.search(request).await;
        PAGE_FETCH_DURATION
            .with_label_values(&["unsplash", if result.is_ok() { "ok" } else { "error" }])
            .observe(start.elapsed().as_secs_f64());
        let page = result?;

        debug!(
            query = %request.query,
            page = request.page,
            results = page.items.len(),
            total_pages = page.total_pages,
            "Unsplash search complete"
        );

        Ok(page)
    }
}

/// Parse a `/search/photos` response body into a page.
fn parse_search_response(body: &str, page_number: u32) -> Result<PhotoPage, FetchError> {
    let response: SearchResponse = serde_json::from_str(body).map_err(|e| {
        FetchError::ParseError(format!("Failed to parse search response: {}", e))
    })?;

    Ok(PhotoPage {
        items: response.results.into_iter().map(Photo::from).collect(),
        page_number,
        total_pages: response.total_pages,
        total: response.total,
    })
}

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    id: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    alt_description: Option<String>,
    #[serde(default)]
    urls: Option<PhotoUrls>,
}

impl From<UnsplashPhoto> for Photo {
    fn from(p: UnsplashPhoto) -> Self {
        Photo {
            id: p.id,
            created_at: p.created_at,
            updated_at: p.updated_at,
            width: p.width,
            height: p.height,
            color: p.color,
            description: p.description,
            alt_description: p.alt_description,
            urls: p.urls,
            ..Default::default()
        }
    }
}
