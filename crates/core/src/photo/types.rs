//! Types describing photos as displayed by the feed.

use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Image loading state of a single photo.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LoadingStatus {
    #[default]
    Ready,
    Loading,
    Loaded,
}

impl LoadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadingStatus::Ready => "ready",
            LoadingStatus::Loading => "loading",
            LoadingStatus::Loaded => "loaded",
        }
    }
}

/// Remote image URLs by size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PhotoUrls {
    pub raw: String,
    pub full: String,
    pub regular: String,
    pub small: String,
    pub thumb: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_s3: Option<String>,
}

/// A photo record.
///
/// Equality and hashing only consider `id`, `cached_location` and
/// `loading_status`: two records for the same photo compare unequal while their
/// cache state differs, which is what snapshot diffing needs. Lookups go
/// through the id alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Photo {
    /// Stable identifier across pages.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Dominant color as a hex string (e.g. "#60544D").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<PhotoUrls>,
    #[serde(default)]
    pub loading_status: LoadingStatus,
    /// Local path of the cached thumbnail, once caching succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_location: Option<PathBuf>,
    #[serde(default)]
    pub is_placeholder: bool,
}

impl Photo {
    /// Create a bare record with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Synthesize a placeholder row with a fresh random id.
    pub fn placeholder() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            loading_status: LoadingStatus::Loading,
            is_placeholder: true,
            ..Default::default()
        }
    }

    /// URL of the thumbnail image that gets cached locally.
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.urls
            .as_ref()
            .map(|u| u.thumb.as_str())
            .filter(|u| !u.is_empty())
    }

    /// Return a copy marked as loaded from `location`.
    pub fn with_cached_location(mut self, location: PathBuf) -> Self {
        self.cached_location = Some(location);
        self.loading_status = LoadingStatus::Loaded;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.loading_status == LoadingStatus::Loaded
    }
}

impl PartialEq for Photo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.cached_location == other.cached_location
            && self.loading_status == other.loading_status
    }
}

impl Eq for Photo {}

impl Hash for Photo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.cached_location.hash(state);
        self.loading_status.hash(state);
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoPage {
    pub items: Vec<Photo>,
    /// 1-based page number this page was fetched for.
    pub page_number: u32,
    pub total_pages: u32,
    /// Total number of matching photos reported by the API.
    #[serde(default)]
    pub total: u64,
}

impl PhotoPage {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
