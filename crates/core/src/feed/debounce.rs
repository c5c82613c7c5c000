//! Debounced search input.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::orchestrator::PhotoFeed;
use super::types::PageOutcome;

/// Pending keystrokes buffered between the caller and the worker.
const INPUT_CHANNEL_CAPACITY: usize = 64;

/// Collapses rapid search input into one search after a quiet period.
///
/// Every submitted text restarts the quiet period; when it elapses the latest
/// text is searched in the background. A search that is still fetching when
/// the next one starts is cancelled. Blank text is ignored. The worker stops
/// once the debouncer is dropped and its last search has finished.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    tx: mpsc::Sender<String>,
}

impl SearchDebouncer {
    /// Spawn the debounce worker for `feed`.
    pub fn spawn(feed: Arc<PhotoFeed>, quiet: Duration) -> Self {
        let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        tokio::spawn(run(feed, rx, quiet));
        Self { tx }
    }

    /// Submit search text. Returns false if the worker has stopped.
    pub async fn submit(&self, text: impl Into<String>) -> bool {
        self.tx.send(text.into()).await.is_ok()
    }
}

async fn run(feed: Arc<PhotoFeed>, mut rx: mpsc::Receiver<String>, quiet: Duration) {
    let mut current: Option<JoinHandle<()>> = None;

    while let Some(mut latest) = rx.recv().await {
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(text) => latest = text,
                    None => break,
                },
                _ = tokio::time::sleep(quiet) => break,
            }
        }

        let query = latest.trim().to_string();
        if query.is_empty() {
            debug!("Ignoring blank search input");
            continue;
        }

        // The new search resets the feed, which cancels the previous fetch.
        if current.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!(query = %query, "Superseding running search");
        }
        current = Some(tokio::spawn(search(Arc::clone(&feed), query)));
    }

    if let Some(task) = current {
        let _ = task.await;
    }
    debug!("Search debouncer stopped");
}

async fn search(feed: Arc<PhotoFeed>, query: String) {
    match feed.search(&query).await {
        Ok(PageOutcome::Cancelled) => {
            debug!(query = %query, "Debounced search superseded");
        }
        Ok(outcome) => {
            debug!(query = %query, ?outcome, "Debounced search finished");
        }
        Err(e) => {
            warn!(query = %query, error = %e, "Debounced search failed");
        }
    }
}
