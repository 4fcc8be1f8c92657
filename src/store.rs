//! Local annotation collection for the current image.
//!
//! Entries are added optimistically as pending and later reconciled with the
//! backend's answer. The store itself is synchronous; the async round trips
//! live in [`crate::sync`], which calls the `begin_*` / `confirm` /
//! `mark_failed` / `finish_remove` pairs around each request.
//!
//! Ordering: confirmed entries first (in backend order), then pending and
//! failed entries in creation order.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::model::{Annotation, AnnotationId, ImageId};
use crate::sync::SyncError;

/// Local handle for a store entry. Stable for the entry's lifetime, unlike
/// the backend id which only exists after confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalKey(u64);

impl fmt::Display for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local#{}", self.0)
    }
}

/// Synchronisation state of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Created locally, backend has not answered yet.
    Pending,
    /// Backend record; the annotation carries its id.
    Confirmed,
    /// Backend rejected or never received the create. Kept visible so it can
    /// be retried or discarded.
    Failed { reason: String },
}

/// One annotation plus its local bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEntry {
    key: LocalKey,
    annotation: Annotation,
    status: SyncStatus,
}

impl StoreEntry {
    pub fn key(&self) -> LocalKey {
        self.key
    }

    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    /// Not yet confirmed by the backend (pending or failed).
    pub fn is_pending(&self) -> bool {
        self.status != SyncStatus::Confirmed
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SyncStatus::Failed { .. })
    }
}

/// Everything the backend needs to create one annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistRequest {
    pub key: LocalKey,
    pub image_id: ImageId,
    pub annotation: Annotation,
}

/// How a backend confirmation was folded into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The pending entry was replaced by the confirmed record.
    Replaced,
    /// The pending entry had been wiped by a reload of the same image; the
    /// confirmed record was inserted.
    Inserted,
    /// A record with this id was already present; the pending entry was dropped.
    Duplicate,
    /// The entry was erased while its create was in flight. The backend now
    /// holds a record nobody wants; the caller should delete it.
    Orphaned(AnnotationId),
    /// The confirmation belongs to an image that is no longer displayed.
    Stale,
}

/// What removing an entry requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovePlan {
    /// Entry had no backend id and was removed locally; no request needed.
    Local,
    /// Entry stays until the backend confirms deleting this id.
    Remote(AnnotationId),
    /// No such entry.
    Missing,
}

/// Annotations of the currently displayed image.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    image_id: Option<ImageId>,
    entries: Vec<StoreEntry>,
    next_key: u64,
    /// Creates handed to the backend and not yet answered, with their image.
    in_flight: HashMap<LocalKey, ImageId>,
    /// Entries erased while their create was in flight.
    abandoned: HashSet<LocalKey>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Image whose annotations are held.
    pub fn image_id(&self) -> Option<ImageId> {
        self.image_id
    }

    /// Get the number of annotations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no annotations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = &StoreEntry> {
        self.entries.iter()
    }

    /// Annotations in display order.
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.entries.iter().map(|e| &e.annotation)
    }

    /// Get an entry by local key.
    pub fn get(&self, key: LocalKey) -> Option<&StoreEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Get an entry by backend id.
    pub fn find_by_id(&self, id: AnnotationId) -> Option<&StoreEntry> {
        self.entries.iter().find(|e| e.annotation.id == Some(id))
    }

    /// Keys of entries whose create failed.
    pub fn failed(&self) -> Vec<LocalKey> {
        self.entries
            .iter()
            .filter(|e| e.is_failed())
            .map(|e| e.key)
            .collect()
    }

    /// Point the store at another image and drop everything shown for the
    /// previous one. In-flight creates keep their bookkeeping so late answers
    /// can still be reconciled.
    pub fn set_image(&mut self, image_id: ImageId) {
        if self.image_id != Some(image_id) {
            log::debug!("Annotation store now tracks image {}", image_id);
        }
        self.image_id = Some(image_id);
        self.entries.clear();
    }

    /// Optimistically append an annotation as pending.
    pub fn add(&mut self, mut annotation: Annotation) -> LocalKey {
        let key = LocalKey(self.next_key);
        self.next_key += 1;
        annotation.id = None;
        log::info!(
            "Added pending {} annotation '{}' ({})",
            annotation.kind().as_str(),
            annotation.label,
            key
        );
        self.entries.push(StoreEntry {
            key,
            annotation,
            status: SyncStatus::Pending,
        });
        key
    }

    /// Mark an entry as handed to the backend and return what to send.
    ///
    /// Works for pending entries and for failed ones being retried.
    pub fn begin_persist(&mut self, key: LocalKey) -> Result<PersistRequest, SyncError> {
        let image_id = self.image_id.ok_or(SyncError::NoImage)?;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.key == key)
            .ok_or(SyncError::UnknownEntry(key))?;

        if entry.status == SyncStatus::Confirmed {
            return Err(SyncError::AlreadyConfirmed(key));
        }
        if self.in_flight.contains_key(&key) {
            return Err(SyncError::AlreadyInFlight(key));
        }

        entry.status = SyncStatus::Pending;
        self.in_flight.insert(key, image_id);
        Ok(PersistRequest {
            key,
            image_id,
            annotation: entry.annotation.clone(),
        })
    }

    /// Fold a successful create into the store.
    pub fn confirm(&mut self, key: LocalKey, id: AnnotationId, mut confirmed: Annotation) -> Reconciled {
        let image_id = self.in_flight.remove(&key);
        confirmed.id = Some(id);

        if self.abandoned.remove(&key) {
            log::info!("Annotation {} was erased before the backend confirmed it", id);
            return Reconciled::Orphaned(id);
        }

        if let Some(index) = self.entries.iter().position(|e| e.key == key) {
            if self.entries[index].status == SyncStatus::Confirmed {
                log::warn!("{} already confirmed, annotation {} is a second copy", key, id);
                return Reconciled::Orphaned(id);
            }
            self.entries.remove(index);
            if self.find_by_id(id).is_some() {
                log::debug!("Dropping pending {}: annotation {} already present", key, id);
                return Reconciled::Duplicate;
            }
            self.insert_confirmed(key, confirmed);
            log::info!("Annotation {} confirmed ({})", id, key);
            return Reconciled::Replaced;
        }

        let same_image = image_id.is_some() && image_id == self.image_id;
        if same_image && self.find_by_id(id).is_none() {
            self.insert_confirmed(key, confirmed);
            log::info!("Annotation {} confirmed after reload ({})", id, key);
            return Reconciled::Inserted;
        }

        log::debug!("Ignoring confirmation of annotation {} for a previous image", id);
        Reconciled::Stale
    }

    /// Record a failed create. The entry stays visible with `Failed` status.
    /// Returns false if the entry no longer exists.
    pub fn mark_failed(&mut self, key: LocalKey, reason: impl Into<String>) -> bool {
        self.in_flight.remove(&key);
        if self.abandoned.remove(&key) {
            return false;
        }

        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.status = SyncStatus::Failed {
                    reason: reason.into(),
                };
                true
            }
            None => false,
        }
    }

    /// Start removing an entry.
    ///
    /// Entries without a backend id are dropped immediately. If their create
    /// is still in flight the key is remembered so the eventual confirmation
    /// comes back as [`Reconciled::Orphaned`].
    pub fn begin_remove(&mut self, key: LocalKey) -> RemovePlan {
        let Some(index) = self.entries.iter().position(|e| e.key == key) else {
            return RemovePlan::Missing;
        };

        match self.entries[index].annotation.id {
            Some(id) => RemovePlan::Remote(id),
            None => {
                self.entries.remove(index);
                if self.in_flight.contains_key(&key) {
                    self.abandoned.insert(key);
                }
                log::info!("Removed unsynced annotation {}", key);
                RemovePlan::Local
            }
        }
    }

    /// Drop the entry for a backend id after a successful delete. Returns
    /// false if it was already gone.
    pub fn finish_remove(&mut self, id: AnnotationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.annotation.id != Some(id));
        let removed = self.entries.len() != before;
        if removed {
            log::info!("Deleted annotation {}", id);
        }
        removed
    }

    /// Drop every failed entry. Returns how many were discarded.
    pub fn discard_failed(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.is_failed());
        before - self.entries.len()
    }

    /// Replace the collection with the backend's records for `image_id`.
    ///
    /// Records without an id are skipped and duplicate ids keep their first
    /// occurrence. Returns false (and changes nothing) if `image_id` is not
    /// the image the store tracks.
    pub fn replace_all(&mut self, image_id: ImageId, records: Vec<Annotation>) -> bool {
        if self.image_id.is_some_and(|current| current != image_id) {
            log::debug!("Ignoring reload for stale image {}", image_id);
            return false;
        }
        self.image_id = Some(image_id);
        self.entries.clear();

        let mut seen = HashSet::new();
        for annotation in records {
            let Some(id) = annotation.id else {
                log::warn!("Skipping backend annotation without id");
                continue;
            };
            if !seen.insert(id) {
                log::warn!("Skipping duplicate backend annotation {}", id);
                continue;
            }
            let key = LocalKey(self.next_key);
            self.next_key += 1;
            self.entries.push(StoreEntry {
                key,
                annotation,
                status: SyncStatus::Confirmed,
            });
        }
        log::info!("Loaded {} annotations for image {}", self.entries.len(), image_id);
        true
    }

    /// Insert at the end of the confirmed block, ahead of pending entries.
    fn insert_confirmed(&mut self, key: LocalKey, annotation: Annotation) {
        let index = self
            .entries
            .iter()
            .position(|e| e.status != SyncStatus::Confirmed)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            index,
            StoreEntry {
                key,
                annotation,
                status: SyncStatus::Confirmed,
            },
        );
    }
}
