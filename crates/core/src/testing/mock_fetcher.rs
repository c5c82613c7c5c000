//! Mock photo fetcher for testing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};

use crate::fetcher::{FetchError, PageRequest, PhotoFetcher};
use crate::photo::PhotoPage;

/// Mock implementation of the PhotoFetcher trait.
///
/// Responses are scripted in order with [`push_page`](Self::push_page) and
/// [`push_error`](Self::push_error). Once the script runs out, every request
/// gets an empty page. Fetches can be held open with
/// [`pause`](Self::pause) to observe the feed mid-request.
pub struct MockFetcher {
    responses: Arc<RwLock<VecDeque<Result<PhotoPage, FetchError>>>>,
    requests: Arc<RwLock<Vec<PageRequest>>>,
    seen: watch::Sender<usize>,
    paused: watch::Sender<bool>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl std::fmt::Debug for MockFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFetcher")
            .field("requests", &*self.seen.borrow())
            .field("paused", &*self.paused.borrow())
            .finish()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        let (seen, _) = watch::channel(0);
        let (paused, _) = watch::channel(false);
        Self {
            responses: Arc::new(RwLock::new(VecDeque::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            seen,
            paused,
            delay: Arc::new(RwLock::new(None)),
        }
    }

    /// Queue a page as the next response.
    pub async fn push_page(&self, page: PhotoPage) {
        self.responses.write().await.push_back(Ok(page));
    }

    /// Queue an error as the next response.
    pub async fn push_error(&self, error: FetchError) {
        self.responses.write().await.push_back(Err(error));
    }

    /// Delay every response.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Hold every fetch open until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// All requests received so far, in order.
    pub async fn requests(&self) -> Vec<PageRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Wait until at least `count` requests have arrived.
    pub async fn wait_for_requests(&self, count: usize) {
        let mut rx = self.seen.subscribe();
        let _ = rx.wait_for(|seen| *seen >= count).await;
    }
}

#[async_trait]
impl PhotoFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<PhotoPage, FetchError> {
        self.requests.write().await.push(request.clone());
        self.seen.send_modify(|seen| *seen += 1);

        let mut paused = self.paused.subscribe();
        let _ = paused.wait_for(|paused| !*paused).await;

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| {
                Ok(PhotoPage {
                    items: Vec::new(),
                    page_number: request.page,
                    total_pages: request.page,
                    total: 0,
                })
            })
    }
}
