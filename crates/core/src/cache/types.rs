//! Types for the image byte cache.

use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors that can occur while caching an image.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    #[error("Download of {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Download of {0} returned an empty body")]
    EmptyBody(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Maps remote image URLs to local files.
#[async_trait]
pub trait ByteCache: Send + Sync {
    /// Return the local path for `url`, downloading and persisting it first if
    /// needed. Calling this twice with the same URL yields the same path.
    async fn ensure_cached(&self, url: &str) -> Result<PathBuf, CacheError>;

    /// Return the local path for `url` if it is already cached.
    async fn cached_path(&self, url: &str) -> Result<Option<PathBuf>, CacheError>;
}

/// Source of raw image bytes.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn download(&self, url: &str) -> Result<Vec<u8>, CacheError>;
}

/// Deterministic cache key for `url`: lowercase hex SHA-256, 64 characters.
pub fn cache_key(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}
