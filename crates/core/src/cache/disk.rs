//! File-backed image cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::metrics::IMAGE_CACHE_LOOKUPS;

use super::{cache_key, ByteCache, CacheError, ImageSource};

/// Immutable image files keyed by the hash of their source URL.
///
/// Concurrent requests for the same URL are collapsed: the first caller
/// downloads while the others wait on a per-key lock and then find the file
/// already in place.
pub struct DiskImageCache {
    root: PathBuf,
    source: Arc<dyn ImageSource>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for DiskImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskImageCache")
            .field("root", &self.root)
            .finish()
    }
}

impl DiskImageCache {
    pub fn new(root: impl Into<PathBuf>, source: Arc<dyn ImageSource>) -> Self {
        Self {
            root: root.into(),
            source,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Path a URL is (or would be) stored at.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(cache_key(url))
    }

    pub async fn ensure_root(&self) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CacheError::io(&self.root, e))
    }

    async fn exists(path: &Path) -> Result<bool, CacheError> {
        tokio::fs::try_exists(path)
            .await
            .map_err(|e| CacheError::io(path, e))
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        Arc::clone(
            in_flight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    async fn release_key(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // Two references: the map's and ours. Anyone else still waiting keeps
        // the entry alive.
        if Arc::strong_count(&lock) <= 2 {
            in_flight.remove(key);
        }
    }

    /// Write `bytes` to `path` through a temp file and rename.
    async fn write_atomic(&self, key: &str, path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
        self.ensure_root().await?;

        let tmp = self
            .root
            .join(format!("{}.tmp-{}", key, Uuid::new_v4().simple()));

        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| CacheError::io(&tmp, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| CacheError::io(&tmp, e))?;
        file.flush().await.map_err(|e| CacheError::io(&tmp, e))?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::io(path, e));
        }

        Ok(())
    }

    async fn download_into(&self, url: &str, key: &str, path: &Path) -> Result<(), CacheError> {
        let bytes = self.source.download(url).await?;
        if bytes.is_empty() {
            return Err(CacheError::EmptyBody(url.to_string()));
        }
        self.write_atomic(key, path, &bytes).await?;
        debug!(url, path = %path.display(), bytes = bytes.len(), "Cached image");
        Ok(())
    }
}

#[async_trait]
impl ByteCache for DiskImageCache {
    async fn ensure_cached(&self, url: &str) -> Result<PathBuf, CacheError> {
        let key = cache_key(url);
        let path = self.root.join(&key);

        if Self::exists(&path).await? {
            trace!(url, "Image cache hit");
            IMAGE_CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
            return Ok(path);
        }

        let lock = self.key_lock(&key).await;
        let result = {
            let _guard = lock.lock().await;
            // Another caller may have finished while we waited.
            match Self::exists(&path).await {
                Ok(true) => {
                    IMAGE_CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
                    Ok(())
                }
                Ok(false) => {
                    let result = self.download_into(url, &key, &path).await;
                    let label = if result.is_ok() { "downloaded" } else { "failed" };
                    IMAGE_CACHE_LOOKUPS.with_label_values(&[label]).inc();
                    result
                }
                Err(e) => {
                    IMAGE_CACHE_LOOKUPS.with_label_values(&["failed"]).inc();
                    Err(e)
                }
            }
        };
        self.release_key(&key, lock).await;

        result.map(|_| path)
    }

    async fn cached_path(&self, url: &str) -> Result<Option<PathBuf>, CacheError> {
        let path = self.path_for(url);
        Ok(Self::exists(&path).await?.then_some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Image source that counts downloads and can be slowed down or broken.
    struct CountingSource {
        downloads: AtomicUsize,
        delay: Duration,
        body: Vec<u8>,
    }

    impl CountingSource {
        fn new(body: &[u8]) -> Self {
            Self {
                downloads: AtomicUsize::new(0),
                delay: Duration::ZERO,
                body: body.to_vec(),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl ImageSource for CountingSource {
        async fn download(&self, _url: &str) -> Result<Vec<u8>, CacheError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.body.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl ImageSource for FailingSource {
        async fn download(&self, url: &str) -> Result<Vec<u8>, CacheError> {
            Err(CacheError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    #[tokio::test]
    async fn test_ensure_cached_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(CountingSource::new(b"jpeg-bytes"));
        let cache = DiskImageCache::new(dir.path().join("images"), source.clone());
        let url = "https://images.example.com/a.jpg";

        let first = cache.ensure_cached(url).await.unwrap();
        let second = cache.ensure_cached(url).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, cache.path_for(url));
        assert_eq!(source.downloads.load(Ordering::SeqCst), 1);
        assert_eq!(tokio::fs::read(&first).await.unwrap(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_concurrent_requests_download_once() {
        let dir = TempDir::new().unwrap();
        let source =
            Arc::new(CountingSource::new(b"jpeg-bytes").with_delay(Duration::from_millis(50)));
        let cache = Arc::new(DiskImageCache::new(dir.path(), source.clone()));
        let url = "https://images.example.com/b.jpg";

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.ensure_cached(url).await }));
        }

        let mut paths = Vec::new();
        for handle in handles {
            paths.push(handle.await.unwrap().unwrap());
        }

        assert!(paths.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(source.downloads.load(Ordering::SeqCst), 1);
        assert!(cache.in_flight.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected() {
        let dir = TempDir::new().unwrap();
        let cache = DiskImageCache::new(dir.path(), Arc::new(CountingSource::new(b"")));
        let url = "https://images.example.com/empty.jpg";

        let err = cache.ensure_cached(url).await.unwrap_err();

        assert!(matches!(err, CacheError::EmptyBody(_)));
        assert!(cache.cached_path(url).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_download_failure_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let cache = DiskImageCache::new(dir.path(), Arc::new(FailingSource));
        let url = "https://images.example.com/missing.jpg";

        let err = cache.ensure_cached(url).await.unwrap_err();

        assert!(matches!(err, CacheError::HttpStatus { status: 404, .. }));
        assert!(cache.cached_path(url).await.unwrap().is_none());
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_root_is_an_error_not_a_miss() {
        let dir = TempDir::new().unwrap();
        // A plain file where the cache directory should be.
        let root = dir.path().join("images");
        tokio::fs::write(&root, b"not a directory").await.unwrap();
        let source = Arc::new(CountingSource::new(b"jpeg-bytes"));
        let cache = DiskImageCache::new(&root, source.clone());
        let url = "https://images.example.com/d.jpg";

        let err = cache.ensure_cached(url).await.unwrap_err();

        assert!(matches!(err, CacheError::Io { .. }));
        assert!(matches!(
            cache.cached_path(url).await,
            Err(CacheError::Io { .. })
        ));
        assert_eq!(source.downloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cached_path_after_caching() {
        let dir = TempDir::new().unwrap();
        let cache = DiskImageCache::new(dir.path(), Arc::new(CountingSource::new(b"x")));
        let url = "https://images.example.com/c.jpg";

        assert!(cache.cached_path(url).await.unwrap().is_none());
        let path = cache.ensure_cached(url).await.unwrap();
        assert_eq!(cache.cached_path(url).await.unwrap(), Some(path));
    }
}
