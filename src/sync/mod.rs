//! Optimistic synchronisation between the local store and the backend.
//!
//! Every request is its own future. The store lock is taken only for the
//! synchronous bookkeeping on either side of a request and is never held
//! across an `.await`, so any number of persists and deletes can be in flight
//! while the overlay keeps reading the store.

mod error;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::model::{AnnotationId, ImageId};
use crate::store::{AnnotationStore, LocalKey, Reconciled, RemovePlan};
use crate::wire::{self, AnnotationRecord, NewAnnotationRecord};

pub use error::{BackendError, SyncError};
pub use memory::MemoryBackend;

/// Store shared between the session and in-flight requests.
pub type SharedStore = Arc<Mutex<AnnotationStore>>;

/// Remote annotation collection for images.
#[async_trait]
pub trait AnnotationBackend: Send + Sync {
    /// All annotations of an image, in backend order.
    async fn list_annotations(&self, image_id: ImageId) -> Result<Vec<AnnotationRecord>, BackendError>;

    /// Store a new annotation; returns it with its assigned id.
    async fn create_annotation(&self, record: NewAnnotationRecord) -> Result<AnnotationRecord, BackendError>;

    /// Delete an annotation by id.
    async fn delete_annotation(&self, id: AnnotationId) -> Result<(), BackendError>;
}

/// Backend work caused by an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRequest {
    /// Save a newly added entry.
    Persist(LocalKey),
    /// Erase an entry.
    Remove(LocalKey),
}

/// Result of running a [`SyncRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Persisted(Reconciled),
    Removed(RemovePlan),
}

/// Runs store/backend round trips.
pub struct AnnotationSync<B> {
    backend: Arc<B>,
    store: SharedStore,
}

impl<B> Clone for AnnotationSync<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            store: Arc::clone(&self.store),
        }
    }
}

impl<B: AnnotationBackend> AnnotationSync<B> {
    pub fn new(backend: Arc<B>, store: SharedStore) -> Self {
        Self { backend, store }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Run one request produced by the session.
    pub async fn run(&self, request: SyncRequest) -> Result<SyncOutcome, SyncError> {
        match request {
            SyncRequest::Persist(key) => self.persist(key).await.map(SyncOutcome::Persisted),
            SyncRequest::Remove(key) => self.remove(key).await.map(SyncOutcome::Removed),
        }
    }

    /// Send a pending (or failed) entry to the backend and fold the answer in.
    ///
    /// On failure the entry is kept and marked failed. If the entry was erased
    /// while the create was in flight, the new backend record is deleted again
    /// and [`Reconciled::Orphaned`] is returned.
    pub async fn persist(&self, key: LocalKey) -> Result<Reconciled, SyncError> {
        let request = self.store.lock().begin_persist(key)?;

        let payload = match wire::encode(&request.annotation, request.image_id) {
            Ok(payload) => payload,
            Err(e) => {
                self.store.lock().mark_failed(key, e.to_string());
                return Err(e.into());
            }
        };

        let record = match self.backend.create_annotation(payload).await {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Failed to save annotation {}: {}", key, e);
                self.store.lock().mark_failed(key, e.to_string());
                return Err(e.into());
            }
        };

        let confirmed = wire::decode(&record).unwrap_or_else(|e| {
            log::debug!("Backend echoed an unreadable record ({}), keeping local copy", e);
            request.annotation
        });
        let reconciled = self.store.lock().confirm(key, record.id, confirmed);

        if let Reconciled::Orphaned(id) = reconciled {
            if let Err(e) = self.backend.delete_annotation(id).await {
                log::warn!("Failed to delete orphaned annotation {}: {}", id, e);
                return Err(e.into());
            }
        }
        Ok(reconciled)
    }

    /// Remove an entry.
    ///
    /// Unsynced entries go away locally without a request. Confirmed entries
    /// stay until the backend acknowledges the delete; on failure they remain
    /// and the error is returned. A delete for an id the backend no longer has
    /// counts as done.
    pub async fn remove(&self, key: LocalKey) -> Result<RemovePlan, SyncError> {
        let plan = self.store.lock().begin_remove(key);

        if let RemovePlan::Remote(id) = plan {
            match self.backend.delete_annotation(id).await {
                Ok(()) | Err(BackendError::NotFound(_)) => {
                    self.store.lock().finish_remove(id);
                }
                Err(e) => {
                    log::warn!("Failed to delete annotation {}: {}", id, e);
                    return Err(e.into());
                }
            }
        }
        Ok(plan)
    }

    /// Replace the store contents with the backend's annotations for
    /// `image_id`. Returns false if the image changed while the list request
    /// was in flight.
    pub async fn reload(&self, image_id: ImageId) -> Result<bool, SyncError> {
        let records = self.backend.list_annotations(image_id).await.map_err(|e| {
            log::warn!("Failed to load annotations for image {}: {}", image_id, e);
            e
        })?;
        let annotations = wire::decode_all(&records);
        Ok(self.store.lock().replace_all(image_id, annotations))
    }

    /// Persist every failed entry again, one after another.
    pub async fn retry_failed(&self) -> Vec<(LocalKey, Result<Reconciled, SyncError>)> {
        let keys = self.store.lock().failed();
        if !keys.is_empty() {
            log::info!("Retrying {} failed annotations", keys.len());
        }

        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push((key, self.persist(key).await));
        }
        results
    }
}
