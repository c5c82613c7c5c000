//! Task registry implementation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::metrics::{CACHE_TASKS, CACHE_TASKS_ACTIVE};

/// Result of [`TaskRegistry::get_or_start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The work was registered and spawned.
    Started,
    /// A task for this id was already registered; the work was dropped.
    AlreadyRunning,
}

#[derive(Debug)]
struct TaskEntry {
    ticket: u64,
    token: CancellationToken,
}

#[derive(Debug)]
struct RegistryInner {
    tasks: Mutex<HashMap<String, TaskEntry>>,
    next_ticket: AtomicU64,
    root: CancellationToken,
    active: watch::Sender<usize>,
}

impl RegistryInner {
    fn set_active(&self, count: usize) {
        self.active.send_replace(count);
        CACHE_TASKS_ACTIVE.set(count as i64);
    }

    /// Remove the registration for `id` only if it still belongs to `ticket`.
    async fn finish(&self, id: &str, ticket: u64) {
        let mut tasks = self.tasks.lock().await;
        if tasks.get(id).is_some_and(|entry| entry.ticket == ticket) {
            tasks.remove(id);
            trace!(photo_id = id, "Caching task finished");
            self.set_active(tasks.len());
        }
    }
}

/// Tracks in-flight background tasks keyed by photo id.
///
/// At most one task per id is registered at a time. Cancellation is
/// cooperative: each task receives a [`CancellationToken`] and is raced
/// against it, so a cancelled task stops at its next await point. Cloning the
/// registry yields another handle to the same set of tasks.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        let (active, _) = watch::channel(0);
        Self {
            inner: Arc::new(RegistryInner {
                tasks: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(1),
                root: CancellationToken::new(),
                active,
            }),
        }
    }

    /// Start `work` for `id` unless a task for `id` is already registered.
    ///
    /// `work` receives the task's cancellation token. The registration is
    /// removed when the work finishes, whatever its outcome.
    pub async fn get_or_start<F, Fut>(&self, id: &str, work: F) -> StartOutcome
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.inner.tasks.lock().await;
        if tasks.contains_key(id) {
            trace!(photo_id = id, "Caching task already running");
            return StartOutcome::AlreadyRunning;
        }

        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let token = self.inner.root.child_token();
        tasks.insert(
            id.to_string(),
            TaskEntry {
                ticket,
                token: token.clone(),
            },
        );
        self.inner.set_active(tasks.len());
        CACHE_TASKS.with_label_values(&["started"]).inc();

        let future = work(token.clone());
        let inner = Arc::clone(&self.inner);
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!(photo_id = %id, "Caching task observed cancellation");
                }
                _ = future => {}
            }
            inner.finish(&id, ticket).await;
        });

        StartOutcome::Started
    }

    /// Remove the registration for `id` without cancelling it.
    pub async fn complete(&self, id: &str) {
        let mut tasks = self.inner.tasks.lock().await;
        if tasks.remove(id).is_some() {
            self.inner.set_active(tasks.len());
        }
    }

    /// Cancel the task for `id`, if any, and remove its registration.
    pub async fn cancel(&self, id: &str) -> bool {
        let mut tasks = self.inner.tasks.lock().await;
        match tasks.remove(id) {
            Some(entry) => {
                entry.token.cancel();
                self.inner.set_active(tasks.len());
                CACHE_TASKS.with_label_values(&["cancelled"]).inc();
                debug!(photo_id = id, "Cancelled caching task");
                true
            }
            None => false,
        }
    }

    /// Cancel every registered task and clear the registry.
    pub async fn cancel_all(&self) -> usize {
        let mut tasks = self.inner.tasks.lock().await;
        let cancelled = tasks.len();
        for (_, entry) in tasks.drain() {
            entry.token.cancel();
        }
        self.inner.set_active(0);

        if cancelled > 0 {
            CACHE_TASKS
                .with_label_values(&["cancelled"])
                .inc_by(cancelled as u64);
            debug!(cancelled, "Cancelled all caching tasks");
        }
        cancelled
    }

    pub async fn is_running(&self, id: &str) -> bool {
        self.inner.tasks.lock().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.inner.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.tasks.lock().await.is_empty()
    }

    /// Wait until no task is registered.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.active.subscribe();
        // The sender lives in `inner`, which we hold, so this cannot fail.
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    /// Cancel every task ever started through this registry, synchronously.
    ///
    /// Registrations are left in place; tasks remove themselves as they stop.
    pub fn shutdown(&self) {
        self.inner.root.cancel();
    }
}
