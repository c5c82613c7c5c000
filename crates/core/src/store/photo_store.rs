//! Photo store implementation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, watch, RwLock};
use tracing::trace;

use crate::photo::Photo;

/// Default capacity of the ordered update channel.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// A snapshot published after a store mutation.
#[derive(Debug, Clone)]
pub struct StoreUpdate {
    /// Monotonic revision, incremented once per visible change.
    pub revision: u64,
    pub photos: Arc<[Photo]>,
}

#[derive(Debug, Default)]
struct StoreInner {
    photos: Vec<Photo>,
    index: HashMap<String, usize>,
    revision: u64,
}

impl StoreInner {
    fn rebuild_index(&mut self) {
        self.index.clear();
        for (position, photo) in self.photos.iter().enumerate() {
            self.index.insert(photo.id.clone(), position);
        }
    }
}

/// Concurrency-safe ordered collection of photos keyed by id.
///
/// All operations take the inner lock, so they are serialized with respect to
/// each other and readers never observe a partially applied batch.
#[derive(Debug)]
pub struct PhotoStore {
    inner: RwLock<StoreInner>,
    updates: broadcast::Sender<StoreUpdate>,
    current: watch::Sender<StoreUpdate>,
}

impl Default for PhotoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotoStore {
    pub fn new() -> Self {
        Self::with_capacity(UPDATE_CHANNEL_CAPACITY)
    }

    /// Create a store whose ordered update channel buffers `capacity` updates
    /// per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity.max(1));
        let (current, _) = watch::channel(StoreUpdate {
            revision: 0,
            photos: Arc::from(Vec::new()),
        });

        Self {
            inner: RwLock::new(StoreInner::default()),
            updates,
            current,
        }
    }

    /// Subscribe to every snapshot, in the order mutations were applied.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.updates.subscribe()
    }

    /// Watch the latest snapshot only.
    pub fn watch(&self) -> watch::Receiver<StoreUpdate> {
        self.current.subscribe()
    }

    /// Copy of the current ordered sequence.
    pub async fn snapshot(&self) -> Vec<Photo> {
        self.inner.read().await.photos.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.photos.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.photos.is_empty()
    }

    /// Position of `id` in the ordered sequence.
    pub async fn index_of(&self, id: &str) -> Option<usize> {
        self.inner.read().await.index.get(id).copied()
    }

    pub async fn get(&self, id: &str) -> Option<Photo> {
        let inner = self.inner.read().await;
        inner
            .index
            .get(id)
            .and_then(|&position| inner.photos.get(position))
            .cloned()
    }

    /// Insert or overwrite records by id.
    ///
    /// Existing ids are replaced at their current position; new ids are
    /// appended in input order.
    pub async fn upsert_many(&self, records: Vec<Photo>) {
        if records.is_empty() {
            return;
        }

        let mut inner = self.inner.write().await;
        let mut replaced = 0usize;
        let mut appended = 0usize;

        for photo in records {
            if let Some(&position) = inner.index.get(&photo.id) {
                inner.photos[position] = photo;
                replaced += 1;
            } else {
                let position = inner.photos.len();
                inner.index.insert(photo.id.clone(), position);
                inner.photos.push(photo);
                appended += 1;
            }
        }

        trace!(replaced, appended, total = inner.photos.len(), "Upserted photos");
        self.publish(&mut inner);
    }

    /// Discard the collection and rebuild it from `records`.
    ///
    /// Later duplicates of an id overwrite the earlier entry in place, so the
    /// one-record-per-id invariant holds for any input.
    pub async fn replace_all(&self, records: Vec<Photo>) {
        let mut inner = self.inner.write().await;
        if inner.photos.is_empty() && records.is_empty() {
            return;
        }

        inner.photos.clear();
        inner.index.clear();
        for photo in records {
            if let Some(&position) = inner.index.get(&photo.id) {
                inner.photos[position] = photo;
            } else {
                let position = inner.photos.len();
                inner.index.insert(photo.id.clone(), position);
                inner.photos.push(photo);
            }
        }

        trace!(total = inner.photos.len(), "Replaced all photos");
        self.publish(&mut inner);
    }

    /// Remove every record matching `predicate`. Returns how many were removed.
    pub async fn remove_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Photo) -> bool,
    {
        let mut inner = self.inner.write().await;
        let before = inner.photos.len();
        inner.photos.retain(|photo| !predicate(photo));
        let removed = before - inner.photos.len();

        if removed > 0 {
            inner.rebuild_index();
            trace!(removed, total = inner.photos.len(), "Removed photos");
            self.publish(&mut inner);
        }

        removed
    }

    /// Mutate the record for `id` in place.
    ///
    /// `f` runs under the write lock and returns whether it changed the record;
    /// a snapshot is only published when it did. Returns false when the id is
    /// unknown or `f` declined the change.
    pub async fn update<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Photo) -> bool,
    {
        let mut inner = self.inner.write().await;
        let Some(&position) = inner.index.get(id) else {
            return false;
        };

        if !f(&mut inner.photos[position]) {
            return false;
        }

        self.publish(&mut inner);
        true
    }

    fn publish(&self, inner: &mut StoreInner) {
        inner.revision += 1;
        let update = StoreUpdate {
            revision: inner.revision,
            photos: Arc::from(inner.photos.clone()),
        };
        // No subscribers is fine.
        let _ = self.updates.send(update.clone());
        self.current.send_replace(update);
    }
}
