//! Mock image byte cache for testing.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};

use crate::cache::{cache_key, ByteCache, CacheError};

/// Mock implementation of the ByteCache trait.
///
/// Never touches disk: a successful lookup returns `root/<cache key>`.
/// Failures are configured per URL. Tracks call counts and the highest number
/// of lookups in flight at once.
pub struct MockByteCache {
    root: PathBuf,
    failing: Arc<RwLock<HashSet<String>>>,
    cached: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<HashMap<String, usize>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    paused: watch::Sender<bool>,
    seen: watch::Sender<usize>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl std::fmt::Debug for MockByteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockByteCache")
            .field("root", &self.root)
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for MockByteCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MockByteCache {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        let (seen, _) = watch::channel(0);
        Self {
            root: PathBuf::from("/mock-cache"),
            failing: Arc::new(RwLock::new(HashSet::new())),
            cached: Arc::new(RwLock::new(HashSet::new())),
            calls: Arc::new(RwLock::new(HashMap::new())),
            delay: Arc::new(RwLock::new(None)),
            paused,
            seen,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Path a successful lookup of `url` resolves to.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(cache_key(url))
    }

    /// Make every lookup of `url` fail.
    pub async fn fail_url(&self, url: &str) {
        self.failing.write().await.insert(url.to_string());
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Hold every lookup open until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Number of lookups made for `url`.
    pub async fn call_count(&self, url: &str) -> usize {
        self.calls.read().await.get(url).copied().unwrap_or(0)
    }

    pub async fn total_calls(&self) -> usize {
        self.calls.read().await.values().sum()
    }

    /// Wait until at least `count` lookups have started.
    pub async fn wait_for_calls(&self, count: usize) {
        let mut rx = self.seen.subscribe();
        let _ = rx.wait_for(|seen| *seen >= count).await;
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of lookups observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ByteCache for MockByteCache {
    async fn ensure_cached(&self, url: &str) -> Result<PathBuf, CacheError> {
        *self.calls.write().await.entry(url.to_string()).or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.seen.send_modify(|seen| *seen += 1);

        let mut paused = self.paused.subscribe();
        let _ = paused.wait_for(|paused| !*paused).await;

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.read().await.contains(url) {
            return Err(CacheError::Download {
                url: url.to_string(),
                message: "mock failure".to_string(),
            });
        }

        self.cached.write().await.insert(url.to_string());
        Ok(self.path_for(url))
    }

    async fn cached_path(&self, url: &str) -> Result<Option<PathBuf>, CacheError> {
        if self.cached.read().await.contains(url) {
            Ok(Some(self.path_for(url)))
        } else {
            Ok(None)
        }
    }
}
