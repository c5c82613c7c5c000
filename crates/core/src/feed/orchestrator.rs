//! Photo feed implementation.
//!
//! Lock order is pagination → store / registry. Background caching tasks only
//! ever take the store and registry locks, never the pagination lock, so a
//! reset can cancel them while holding it.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::cache::ByteCache;
use crate::fetcher::{FetchError, PageRequest, PhotoFetcher};
use crate::metrics::PAGES_FETCHED;
use crate::photo::{LoadingStatus, Photo, PhotoPage};
use crate::registry::TaskRegistry;
use crate::store::{PhotoStore, StoreUpdate};

use super::config::{CachingMode, FeedConfig};
use super::types::{FeedError, FeedErrorEvent, FeedState, FeedStatus, PageCursor, PageOutcome};

/// Buffer size for the error event channel.
const ERROR_CHANNEL_CAPACITY: usize = 32;

/// Pagination state, owned by the feed.
#[derive(Debug)]
struct Pagination {
    query: Option<String>,
    cursor: PageCursor,
    state: FeedState,
    /// Scopes one pagination generation; replaced on every reset.
    epoch: CancellationToken,
}

/// The photo feed - paginates search results into the photo store and caches
/// their thumbnails.
pub struct PhotoFeed {
    config: FeedConfig,
    fetcher: Arc<dyn PhotoFetcher>,
    cache: Arc<dyn ByteCache>,
    store: Arc<PhotoStore>,
    registry: TaskRegistry,
    pagination: Mutex<Pagination>,
    root: CancellationToken,
    status_tx: watch::Sender<LoadingStatus>,
    errors_tx: broadcast::Sender<FeedErrorEvent>,
}

impl std::fmt::Debug for PhotoFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoFeed")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher.name())
            .finish()
    }
}

impl PhotoFeed {
    /// Create a new feed with an empty store and no query.
    pub fn new(
        config: FeedConfig,
        fetcher: Arc<dyn PhotoFetcher>,
        cache: Arc<dyn ByteCache>,
    ) -> Self {
        let root = CancellationToken::new();
        let (status_tx, _) = watch::channel(LoadingStatus::Ready);
        let (errors_tx, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);

        Self {
            config,
            fetcher,
            cache,
            store: Arc::new(PhotoStore::new()),
            registry: TaskRegistry::new(),
            pagination: Mutex::new(Pagination {
                query: None,
                cursor: PageCursor::new(),
                state: FeedState::Ready,
                epoch: root.child_token(),
            }),
            root,
            status_tx,
            errors_tx,
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<PhotoStore> {
        &self.store
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Copy of the currently displayed photos.
    pub async fn snapshot(&self) -> Vec<Photo> {
        self.store.snapshot().await
    }

    /// Ordered stream of snapshots, one per visible change.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.store.subscribe()
    }

    /// Latest snapshot.
    pub fn watch_photos(&self) -> watch::Receiver<StoreUpdate> {
        self.store.watch()
    }

    /// Page loading signal: `Loading` while a page is in flight, else `Ready`.
    pub fn watch_status(&self) -> watch::Receiver<LoadingStatus> {
        self.status_tx.subscribe()
    }

    /// Page fetch failures, one event per failure.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<FeedErrorEvent> {
        self.errors_tx.subscribe()
    }

    pub async fn query(&self) -> Option<String> {
        self.pagination.lock().await.query.clone()
    }

    pub async fn cursor(&self) -> PageCursor {
        self.pagination.lock().await.cursor
    }

    pub async fn state(&self) -> FeedState {
        self.pagination.lock().await.state
    }

    /// Current feed summary.
    pub async fn status(&self) -> FeedStatus {
        let (state, query, cursor) = {
            let pagination = self.pagination.lock().await;
            (pagination.state, pagination.query.clone(), pagination.cursor)
        };

        FeedStatus {
            state,
            query,
            page: cursor.page(),
            total_pages: cursor.total_pages(),
            has_more: cursor.has_more(),
            photo_count: self.store.len().await,
            caching_tasks: self.registry.len().await,
            caching: self.config.caching,
        }
    }

    /// Wait until no background caching task is registered.
    pub async fn wait_for_caching(&self) {
        self.registry.wait_idle().await;
    }

    /// Replace the active query.
    ///
    /// A different query resets pagination first, so the new search starts
    /// from page 1 on an empty store. Setting the current query again is a
    /// no-op. Blank text clears the query. Returns whether the query changed.
    pub async fn set_query(&self, text: &str) -> Result<bool, FeedError> {
        let query = text.trim();
        let mut pagination = self.pagination.lock().await;
        if pagination.state == FeedState::Closed {
            return Err(FeedError::Closed);
        }

        let next = (!query.is_empty()).then(|| query.to_string());
        if pagination.query == next {
            return Ok(false);
        }

        self.reset_locked(&mut pagination).await;
        pagination.query = next;
        info!(query, "Query changed");
        Ok(true)
    }

    /// Start a fresh search for `text` and request its first page.
    pub async fn search(&self, text: &str) -> Result<PageOutcome, FeedError> {
        let query = text.trim();
        {
            let mut pagination = self.pagination.lock().await;
            if pagination.state == FeedState::Closed {
                return Err(FeedError::Closed);
            }
            self.reset_locked(&mut pagination).await;
            pagination.query = (!query.is_empty()).then(|| query.to_string());
        }
        info!(query, "Starting search");
        self.request_next_page().await
    }

    /// Clear pagination, photos and caching tasks. The query is kept.
    pub async fn reset(&self) -> Result<(), FeedError> {
        let mut pagination = self.pagination.lock().await;
        if pagination.state == FeedState::Closed {
            return Err(FeedError::Closed);
        }
        self.reset_locked(&mut pagination).await;
        info!("Feed reset");
        Ok(())
    }

    /// Tear the feed down. Every later operation is skipped or rejected.
    pub async fn shutdown(&self) {
        let mut pagination = self.pagination.lock().await;
        if pagination.state == FeedState::Closed {
            return;
        }
        pagination.state = FeedState::Closed;
        self.reset_locked(&mut pagination).await;
        self.root.cancel();
        self.registry.shutdown();
        info!("Feed shut down");
    }

    async fn reset_locked(&self, pagination: &mut Pagination) {
        pagination.epoch.cancel();
        pagination.epoch = self.root.child_token();
        pagination.cursor.reset();
        if pagination.state != FeedState::Closed {
            pagination.state = FeedState::Ready;
        }

        // Cancel before clearing: a task that already wrote is wiped by the
        // clear, any later write sees its cancelled token.
        self.registry.cancel_all().await;
        self.store.replace_all(Vec::new()).await;
        self.status_tx.send_replace(LoadingStatus::Ready);
    }

    /// Fetch the next page of the active query and merge it into the store.
    ///
    /// Returns [`PageOutcome::Skipped`] unless the feed is ready, has more
    /// pages, and has a query. Requests made while a page is in flight are
    /// dropped, not queued.
    pub async fn request_next_page(&self) -> Result<PageOutcome, FeedError> {
        let (request, epoch) = {
            let mut pagination = self.pagination.lock().await;
            if pagination.state != FeedState::Ready || !pagination.cursor.has_more() {
                return Ok(PageOutcome::Skipped);
            }
            let Some(query) = pagination.query.clone() else {
                return Ok(PageOutcome::Skipped);
            };

            if self.store.is_empty().await {
                let placeholders = (0..self.config.per_page)
                    .map(|_| Photo::placeholder())
                    .collect();
                self.store.upsert_many(placeholders).await;
            }

            pagination.state = FeedState::Fetching;
            self.status_tx.send_replace(LoadingStatus::Loading);

            let request = PageRequest {
                query,
                page: pagination.cursor.page(),
                per_page: self.config.per_page,
            };
            (request, pagination.epoch.clone())
        };

        debug!(query = %request.query, page = request.page, "Fetching page");

        let fetched = tokio::select! {
            biased;
            _ = epoch.cancelled() => {
                PAGES_FETCHED.with_label_values(&["cancelled"]).inc();
                debug!(page = request.page, "Page fetch cancelled");
                return Ok(PageOutcome::Cancelled);
            }
            result = self.fetcher.fetch_page(&request) => result,
        };

        match fetched {
            Ok(page) => self.merge_page(&request, page, &epoch).await,
            Err(err) => self.fail_page(&request, err, &epoch).await,
        }
    }

    async fn fail_page(
        &self,
        request: &PageRequest,
        err: FetchError,
        epoch: &CancellationToken,
    ) -> Result<PageOutcome, FeedError> {
        {
            let mut pagination = self.pagination.lock().await;
            if epoch.is_cancelled() {
                PAGES_FETCHED.with_label_values(&["cancelled"]).inc();
                return Ok(PageOutcome::Cancelled);
            }
            self.finish_fetch(&mut pagination);
        }

        PAGES_FETCHED.with_label_values(&["failed"]).inc();
        warn!(
            query = %request.query,
            page = request.page,
            fetcher = self.fetcher.name(),
            error = %err,
            "Page fetch failed"
        );

        // No subscribers is fine.
        let _ = self.errors_tx.send(FeedErrorEvent {
            query: request.query.clone(),
            page: request.page,
            message: err.to_string(),
            at: Utc::now(),
        });

        Err(FeedError::Fetch(err))
    }

    async fn merge_page(
        &self,
        request: &PageRequest,
        page: PhotoPage,
        epoch: &CancellationToken,
    ) -> Result<PageOutcome, FeedError> {
        if page.is_empty() {
            let mut pagination = self.pagination.lock().await;
            if epoch.is_cancelled() {
                PAGES_FETCHED.with_label_values(&["cancelled"]).inc();
                return Ok(PageOutcome::Cancelled);
            }
            pagination.cursor.exhaust();
            self.store.remove_where(|p| p.is_placeholder).await;
            self.finish_fetch(&mut pagination);

            PAGES_FETCHED.with_label_values(&["exhausted"]).inc();
            info!(query = %request.query, page = request.page, "No more results");
            return Ok(PageOutcome::Exhausted { page: request.page });
        }

        // The cursor moves and the placeholders go before any thumbnail is
        // cached. The feed stays `Fetching` until the page is merged.
        let mut pagination = self.pagination.lock().await;
        if epoch.is_cancelled() {
            PAGES_FETCHED.with_label_values(&["cancelled"]).inc();
            return Ok(PageOutcome::Cancelled);
        }
        pagination.cursor.advance(page.total_pages);
        self.store.remove_where(|p| p.is_placeholder).await;

        let count = match self.config.caching {
            CachingMode::Eager => {
                drop(pagination);
                let cached = tokio::select! {
                    biased;
                    _ = epoch.cancelled() => {
                        PAGES_FETCHED.with_label_values(&["cancelled"]).inc();
                        return Ok(PageOutcome::Cancelled);
                    }
                    cached = self.cache_page(page.items) => cached,
                };

                pagination = self.pagination.lock().await;
                if epoch.is_cancelled() {
                    PAGES_FETCHED.with_label_values(&["cancelled"]).inc();
                    return Ok(PageOutcome::Cancelled);
                }
                let count = cached.len();
                self.store.upsert_many(cached).await;
                count
            }
            CachingMode::Lazy => {
                let items: Vec<Photo> = page
                    .items
                    .into_iter()
                    .map(|mut photo| {
                        if photo.thumbnail_url().is_some() && !photo.is_loaded() {
                            photo.loading_status = LoadingStatus::Loading;
                        }
                        photo
                    })
                    .collect();
                let count = items.len();
                self.store.upsert_many(items.clone()).await;
                for photo in items {
                    self.start_caching(photo).await;
                }
                count
            }
        };
        self.finish_fetch(&mut pagination);

        PAGES_FETCHED.with_label_values(&["appended"]).inc();
        info!(
            query = %request.query,
            page = request.page,
            count,
            has_more = pagination.cursor.has_more(),
            "Page appended"
        );

        Ok(PageOutcome::Appended {
            page: request.page,
            count,
        })
    }

    fn finish_fetch(&self, pagination: &mut Pagination) {
        if pagination.state == FeedState::Fetching {
            pagination.state = FeedState::Ready;
        }
        self.status_tx.send_replace(LoadingStatus::Ready);
    }

    /// Cache every photo of a page concurrently; keep only the successes.
    async fn cache_page(&self, items: Vec<Photo>) -> Vec<Photo> {
        let cache = self.cache.as_ref();
        let jobs = items.into_iter().map(|photo| async move {
            let Some(url) = photo.thumbnail_url().map(str::to_string) else {
                debug!(photo_id = %photo.id, "Photo has no thumbnail, dropping from batch");
                return None;
            };
            match cache.ensure_cached(&url).await {
                Ok(path) => Some(photo.with_cached_location(path)),
                Err(e) => {
                    warn!(photo_id = %photo.id, url = %url, error = %e, "Failed to cache thumbnail");
                    None
                }
            }
        });

        join_all(jobs).await.into_iter().flatten().collect()
    }

    /// Start the background caching task for one photo, unless one is running.
    async fn start_caching(&self, photo: Photo) {
        let Some(url) = photo.thumbnail_url().map(str::to_string) else {
            return;
        };

        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let key = photo.id.clone();
        let id = photo.id;
        self.registry
            .get_or_start(&key, move |token| cache_photo(store, cache, id, url, token))
            .await;
    }
}

impl Drop for PhotoFeed {
    fn drop(&mut self) {
        self.root.cancel();
        self.registry.shutdown();
    }
}

/// Cache one thumbnail and attach the result to its record.
async fn cache_photo(
    store: Arc<PhotoStore>,
    cache: Arc<dyn ByteCache>,
    id: String,
    url: String,
    token: CancellationToken,
) {
    let path: PathBuf = match cache.ensure_cached(&url).await {
        Ok(path) => path,
        Err(e) => {
            warn!(photo_id = %id, url = %url, error = %e, "Failed to cache thumbnail");
            return;
        }
    };

    // The token is checked under the store lock so a reset that has already
    // cancelled this task can never see the write land afterwards.
    let applied = store
        .update(&id, |photo| {
            if token.is_cancelled() {
                return false;
            }
            photo.cached_location = Some(path);
            photo.loading_status = LoadingStatus::Loaded;
            true
        })
        .await;

    if applied {
        trace!(photo_id = %id, "Thumbnail attached");
    } else {
        debug!(photo_id = %id, "Dropped thumbnail for cancelled or removed photo");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockByteCache, MockFetcher};

    fn feed_with(
        config: FeedConfig,
        fetcher: Arc<MockFetcher>,
        cache: Arc<MockByteCache>,
    ) -> PhotoFeed {
        PhotoFeed::new(config, fetcher, cache)
    }

    #[tokio::test]
    async fn test_request_without_query_is_skipped() {
        let fetcher = Arc::new(MockFetcher::new());
        let feed = feed_with(
            FeedConfig::default(),
            Arc::clone(&fetcher),
            Arc::new(MockByteCache::new()),
        );

        let outcome = feed.request_next_page().await.unwrap();

        assert_eq!(outcome, PageOutcome::Skipped);
        assert_eq!(fetcher.request_count().await, 0);
        assert!(feed.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_same_query_is_noop() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher
            .push_page(fixtures::page(&["a", "b"], 1, 3))
            .await;
        let feed = feed_with(
            FeedConfig::default(),
            Arc::clone(&fetcher),
            Arc::new(MockByteCache::new()),
        );

        assert!(feed.set_query("cats").await.unwrap());
        feed.request_next_page().await.unwrap();

        assert!(!feed.set_query("  cats ").await.unwrap());
        assert_eq!(feed.cursor().await.page(), 2);
        assert_eq!(feed.store().len().await, 2);
    }

    #[tokio::test]
    async fn test_blank_query_clears() {
        let feed = feed_with(
            FeedConfig::default(),
            Arc::new(MockFetcher::new()),
            Arc::new(MockByteCache::new()),
        );

        feed.set_query("cats").await.unwrap();
        assert!(feed.set_query("   ").await.unwrap());
        assert!(feed.query().await.is_none());
    }

    #[tokio::test]
    async fn test_status_summary() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher
            .push_page(fixtures::page(&["a", "b"], 1, 4))
            .await;
        let feed = feed_with(
            FeedConfig::default(),
            fetcher,
            Arc::new(MockByteCache::new()),
        );

        feed.set_query("dogs").await.unwrap();
        feed.request_next_page().await.unwrap();
        feed.wait_for_caching().await;

        let status = feed.status().await;
        assert_eq!(status.state, FeedState::Ready);
        assert_eq!(status.query.as_deref(), Some("dogs"));
        assert_eq!(status.page, 2);
        assert_eq!(status.total_pages, Some(4));
        assert!(status.has_more);
        assert_eq!(status.photo_count, 2);
        assert_eq!(status.caching_tasks, 0);
        assert_eq!(status.caching, CachingMode::Lazy);
    }

    #[tokio::test]
    async fn test_operations_after_shutdown() {
        let fetcher = Arc::new(MockFetcher::new());
        let feed = feed_with(
            FeedConfig::default(),
            Arc::clone(&fetcher),
            Arc::new(MockByteCache::new()),
        );
        feed.set_query("cats").await.unwrap();

        feed.shutdown().await;

        assert_eq!(feed.state().await, FeedState::Closed);
        assert_eq!(
            feed.request_next_page().await.unwrap(),
            PageOutcome::Skipped
        );
        assert!(matches!(feed.reset().await, Err(FeedError::Closed)));
        assert!(matches!(
            feed.set_query("dogs").await,
            Err(FeedError::Closed)
        ));
        assert!(matches!(feed.search("dogs").await, Err(FeedError::Closed)));
        assert_eq!(fetcher.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_loading_status_signal() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.push_page(fixtures::page(&["a"], 1, 1)).await;
        let feed = feed_with(
            FeedConfig::default(),
            fetcher,
            Arc::new(MockByteCache::new()),
        );
        let status = feed.watch_status();

        feed.set_query("cats").await.unwrap();
        assert_eq!(*status.borrow(), LoadingStatus::Ready);

        feed.request_next_page().await.unwrap();
        assert_eq!(*status.borrow(), LoadingStatus::Ready);
    }
}
