//! In-process backend used by the replay tool and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::calibration::{Calibration, CalibrationSource};
use crate::model::{AnnotationId, ImageId};
use crate::wire::{AnnotationRecord, NewAnnotationRecord};

use super::{AnnotationBackend, BackendError};

/// Types the backend accepts on create, including ones the overlay cannot draw.
const ACCEPTED_TYPES: &[&str] = &["point", "polygon", "measurement", "circle", "rectangle"];

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<AnnotationRecord>,
    next_id: AnnotationId,
    calibrations: HashMap<ImageId, Calibration>,
    failing_creates: usize,
    failing_deletes: usize,
    offline: bool,
    create_calls: usize,
    delete_calls: usize,
}

/// Annotation and calibration backend held in memory.
///
/// Supports failure injection and can hold create requests at a gate so tests
/// can act while a persist is in flight.
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    create_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_id: 1,
                ..MemoryState::default()
            }),
            create_gate: Mutex::new(None),
        }
    }

    /// Seed a stored record directly; returns its id.
    pub fn insert_record(
        &self,
        image_id: ImageId,
        annotation_type: &str,
        data: serde_json::Value,
    ) -> AnnotationId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.records.push(AnnotationRecord {
            id,
            image_id,
            annotation_type: annotation_type.to_string(),
            data,
        });
        id
    }

    /// Stored records of an image.
    pub fn records(&self, image_id: ImageId) -> Vec<AnnotationRecord> {
        self.state
            .lock()
            .records
            .iter()
            .filter(|r| r.image_id == image_id)
            .cloned()
            .collect()
    }

    pub fn set_calibration(&self, image_id: ImageId, calibration: Calibration) {
        self.state.lock().calibrations.insert(image_id, calibration);
    }

    /// Reject every request with a network error while set.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Reject the next `count` creates.
    pub fn fail_next_creates(&self, count: usize) {
        self.state.lock().failing_creates = count;
    }

    /// Reject the next `count` deletes.
    pub fn fail_next_deletes(&self, count: usize) {
        self.state.lock().failing_deletes = count;
    }

    /// Hold create requests until permits are added to the returned gate.
    /// Each permit lets one create through.
    pub fn hold_creates(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.create_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Let creates through without waiting again.
    pub fn release_creates(&self) {
        if let Some(gate) = self.create_gate.lock().take() {
            gate.close();
        }
    }

    /// Number of create requests received (including held and failed ones).
    pub fn create_calls(&self) -> usize {
        self.state.lock().create_calls
    }

    /// Number of delete requests received.
    pub fn delete_calls(&self) -> usize {
        self.state.lock().delete_calls
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.state.lock().offline {
            return Err(BackendError::network("backend unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl AnnotationBackend for MemoryBackend {
    async fn list_annotations(&self, image_id: ImageId) -> Result<Vec<AnnotationRecord>, BackendError> {
        self.check_online()?;
        Ok(self.records(image_id))
    }

    async fn create_annotation(&self, record: NewAnnotationRecord) -> Result<AnnotationRecord, BackendError> {
        self.state.lock().create_calls += 1;

        let gate = self.create_gate.lock().clone();
        if let Some(gate) = gate {
            // A closed gate means creates were released for good.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.check_online()?;
        let mut state = self.state.lock();
        if state.failing_creates > 0 {
            state.failing_creates -= 1;
            return Err(BackendError::rejected(500, "injected create failure"));
        }
        if !ACCEPTED_TYPES.contains(&record.annotation_type.as_str()) {
            return Err(BackendError::rejected(
                400,
                format!("Invalid annotation type: {}", record.annotation_type),
            ));
        }

        let id = state.next_id;
        state.next_id += 1;
        let stored = record.into_record(id);
        state.records.push(stored.clone());
        Ok(stored)
    }

    async fn delete_annotation(&self, id: AnnotationId) -> Result<(), BackendError> {
        self.check_online()?;
        let mut state = self.state.lock();
        state.delete_calls += 1;
        if state.failing_deletes > 0 {
            state.failing_deletes -= 1;
            return Err(BackendError::rejected(500, "injected delete failure"));
        }

        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return Err(BackendError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl CalibrationSource for MemoryBackend {
    async fn fetch_calibration(&self, image_id: ImageId) -> Result<Option<Calibration>, BackendError> {
        self.check_online()?;
        Ok(self.state.lock().calibrations.get(&image_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_point(image_id: ImageId) -> NewAnnotationRecord {
        NewAnnotationRecord {
            image_id,
            annotation_type: "point".to_string(),
            data: json!({"x": 1.0, "y": 2.0}),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let backend = MemoryBackend::new();
        let a = backend.create_annotation(new_point(1)).await.expect("created");
        let b = backend.create_annotation(new_point(2)).await.expect("created");
        assert!(b.id > a.id);
        assert_eq!(backend.records(1), vec![a]);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_type() {
        let backend = MemoryBackend::new();
        let mut record = new_point(1);
        record.annotation_type = "freehand".to_string();
        let err = backend.create_annotation(record).await.expect_err("rejected");
        assert!(matches!(err, BackendError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let backend = MemoryBackend::new();
        assert_eq!(
            backend.delete_annotation(99).await,
            Err(BackendError::NotFound(99))
        );
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let backend = MemoryBackend::new();
        backend.fail_next_creates(1);
        assert!(backend.create_annotation(new_point(1)).await.is_err());
        assert!(backend.create_annotation(new_point(1)).await.is_ok());
        assert_eq!(backend.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_offline_calibration_fetch_fails() {
        let backend = MemoryBackend::new();
        backend.set_calibration(1, Calibration::new(0.05));
        assert!(backend.fetch_calibration(1).await.expect("online").is_some());
        assert!(backend.fetch_calibration(2).await.expect("online").is_none());
        backend.set_offline(true);
        assert!(backend.fetch_calibration(1).await.is_err());
    }

    #[tokio::test]
    async fn test_held_create_waits_for_permit() {
        let backend = Arc::new(MemoryBackend::new());
        let gate = backend.hold_creates();

        let task = tokio::spawn({
            let backend = Arc::clone(&backend);
            async move { backend.create_annotation(new_point(1)).await }
        });
        while backend.create_calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(backend.records(1).is_empty());

        gate.add_permits(1);
        let created = task.await.expect("task joined").expect("created");
        assert_eq!(backend.records(1), vec![created]);
    }
}
