//! Testing utilities and mock implementations.
//!
//! Mocks for the two external seams of the feed (the search API and the image
//! byte cache), so pagination and caching can be exercised without network or
//! disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use photofeed_core::testing::{fixtures, MockByteCache, MockFetcher};
//!
//! let fetcher = MockFetcher::new();
//! fetcher.push_page(fixtures::page(&["a", "b", "c"], 1, 1)).await;
//!
//! let cache = MockByteCache::new();
//! cache.fail_url(&fixtures::thumb_url("b")).await;
//!
//! let feed = PhotoFeed::new(FeedConfig::default(), Arc::new(fetcher), Arc::new(cache));
//! ```

mod mock_byte_cache;
mod mock_fetcher;

pub use mock_byte_cache::MockByteCache;
pub use mock_fetcher::MockFetcher;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::photo::{Photo, PhotoPage, PhotoUrls};

    /// Thumbnail URL used by [`photo`].
    pub fn thumb_url(id: &str) -> String {
        format!("https://images.example.com/{}/thumb.jpg", id)
    }

    /// Create a test photo with a full URL set.
    pub fn photo(id: &str) -> Photo {
        let base = format!("https://images.example.com/{}", id);
        Photo {
            width: Some(4000),
            height: Some(3000),
            color: Some("#262626".to_string()),
            alt_description: Some(format!("photo {}", id)),
            urls: Some(PhotoUrls {
                raw: format!("{}/raw.jpg", base),
                full: format!("{}/full.jpg", base),
                regular: format!("{}/regular.jpg", base),
                small: format!("{}/small.jpg", base),
                thumb: thumb_url(id),
                small_s3: None,
            }),
            ..Photo::new(id)
        }
    }

    /// Create a test photo the API returned without image URLs.
    pub fn photo_without_thumbnail(id: &str) -> Photo {
        Photo::new(id)
    }

    /// Create a page of photos with the given ids.
    pub fn page(ids: &[&str], page_number: u32, total_pages: u32) -> PhotoPage {
        PhotoPage {
            items: ids.iter().map(|id| photo(id)).collect(),
            page_number,
            total_pages,
            total: ids.len() as u64 * total_pages as u64,
        }
    }

    /// Create a page with no results.
    pub fn empty_page(page_number: u32, total_pages: u32) -> PhotoPage {
        PhotoPage {
            items: Vec::new(),
            page_number,
            total_pages,
            total: 0,
        }
    }
}
