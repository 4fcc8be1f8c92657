//! Overlay session: the state owned by one image viewer.
//!
//! Ties the tool state machine, the annotation store, calibration and the
//! backend together. Pointer handling is synchronous and returns the backend
//! work it caused as a [`SyncRequest`]; the host decides when to run it
//! (usually by spawning [`AnnotationSync::run`] on a clone of
//! [`OverlaySession::sync_handle`]), so drawing never waits on the network.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::calibration::{Calibration, CalibrationProvider, CalibrationSource};
use crate::config::OverlayConfig;
use crate::export::{FeatureCollection, GeoReference, feature_collection};
use crate::geometry::Point;
use crate::keybindings::{KeyAction, KeyBindings, KeyCode};
use crate::model::{Annotation, AnnotationTool, DrawingState, ImageId, PaletteColor};
use crate::overlay::{Overlay, OverlayStyle, build_overlay};
use crate::store::{AnnotationStore, LocalKey, Reconciled};
use crate::sync::{
    AnnotationBackend, AnnotationSync, SharedStore, SyncError, SyncOutcome, SyncRequest,
};
use crate::tools::{ToolContext, ToolInput, ToolOutcome, ToolState};
use crate::viewport::Viewport;

/// Kind of pointer activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Click,
    /// Double activation. Closes an open polygon and never adds a vertex;
    /// hosts must report it instead of a second click, not after one.
    DoubleClick,
}

/// A pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub screen: Point,
}

impl PointerEvent {
    pub fn click(x: f64, y: f64) -> Self {
        Self {
            kind: PointerKind::Click,
            screen: Point::new(x, y),
        }
    }

    pub fn double_click(x: f64, y: f64) -> Self {
        Self {
            kind: PointerKind::DoubleClick,
            screen: Point::new(x, y),
        }
    }
}

/// Annotation overlay state for one viewer.
pub struct OverlaySession<B> {
    sync: AnnotationSync<B>,
    tools: ToolState,
    calibration: CalibrationProvider,
    color: PaletteColor,
    keybindings: KeyBindings,
    style: OverlayStyle,
    /// Eraser tolerance in screen pixels.
    hit_tolerance: f64,
}

impl<B> OverlaySession<B>
where
    B: AnnotationBackend + CalibrationSource,
{
    pub fn new(backend: Arc<B>, config: &OverlayConfig) -> Self {
        let store: SharedStore = Arc::new(Mutex::new(AnnotationStore::new()));
        Self {
            sync: AnnotationSync::new(backend, store),
            tools: ToolState::new(),
            calibration: CalibrationProvider::new(),
            color: config.preferences.default_color,
            keybindings: config.keybindings.clone(),
            style: OverlayStyle::from(&config.preferences),
            hit_tolerance: config.preferences.hit_tolerance,
        }
    }

    /// A handle for running requests concurrently with further interaction.
    pub fn sync_handle(&self) -> AnnotationSync<B> {
        self.sync.clone()
    }

    pub fn store(&self) -> &SharedStore {
        self.sync.store()
    }

    /// The displayed image, once one has been selected.
    pub fn image_id(&self) -> Option<ImageId> {
        self.sync.store().lock().image_id()
    }

    pub fn tool(&self) -> AnnotationTool {
        self.tools.tool()
    }

    pub fn draft(&self) -> &DrawingState {
        self.tools.draft()
    }

    pub fn color(&self) -> PaletteColor {
        self.color
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.current()
    }

    pub fn keybindings(&self) -> &KeyBindings {
        &self.keybindings
    }

    /// Switch tools, discarding any open draft.
    pub fn set_tool(&mut self, tool: AnnotationTool) -> bool {
        self.tools.set_tool(tool)
    }

    /// Colour for annotations created from now on.
    pub fn set_color(&mut self, color: PaletteColor) {
        self.color = color;
    }

    /// The global abort input.
    pub fn cancel(&mut self) -> bool {
        self.tools.cancel()
    }

    /// Apply a key press. Returns the action taken, if the key is bound.
    pub fn handle_key(&mut self, key: KeyCode) -> Option<KeyAction> {
        let action = self.keybindings.action_for_key(key)?;
        match action {
            KeyAction::SelectTool(tool) => {
                self.tools.set_tool(tool);
            }
            KeyAction::Cancel => {
                self.tools.cancel();
            }
        }
        Some(action)
    }

    /// Feed a pointer event to the active tool.
    ///
    /// Events outside the image are ignored. A completed shape is added to
    /// the store as pending right away; an eraser hit is resolved against the
    /// overlay. Either way the backend work is returned, not started.
    pub fn pointer(&mut self, event: PointerEvent, viewport: &Viewport) -> Option<SyncRequest> {
        log::trace!("Pointer {:?} at ({:.1}, {:.1})", event.kind, event.screen.x, event.screen.y);

        if self.image_id().is_none() {
            log::debug!("Pointer ignored: no image selected");
            return None;
        }
        let at = viewport.screen_to_image_pixel(event.screen)?;
        if !viewport.contains_image_point(at) {
            log::trace!("Pointer outside image at ({:.1}, {:.1})", at.x, at.y);
            return None;
        }

        let input = match event.kind {
            PointerKind::Click => ToolInput::Click(at),
            PointerKind::DoubleClick => ToolInput::Close(at),
        };
        let annotation_count = self.sync.store().lock().len();
        let ctx = ToolContext {
            annotation_count,
            calibration: self.calibration.current(),
            color: self.color,
        };

        match self.tools.handle(input, &ctx) {
            ToolOutcome::Commit(annotation) => {
                let key = self.sync.store().lock().add(annotation);
                Some(SyncRequest::Persist(key))
            }
            ToolOutcome::Erase(at) => {
                let tolerance = viewport.screen_distance_to_image(self.hit_tolerance);
                let hit = self.overlay().hit_test(at, tolerance);
                if hit.is_none() {
                    log::debug!("Eraser: nothing at ({:.1}, {:.1})", at.x, at.y);
                }
                hit.map(SyncRequest::Remove)
            }
            ToolOutcome::Drafting | ToolOutcome::Ignored => None,
        }
    }

    /// Run a request to completion.
    pub async fn run(&self, request: SyncRequest) -> Result<SyncOutcome, SyncError> {
        self.sync.run(request).await
    }

    /// Display another image.
    ///
    /// Cancels the open draft, empties the store, then loads the new image's
    /// annotations and calibration concurrently. A failed calibration fetch
    /// degrades to pixel units; a failed list is returned with the store left
    /// empty.
    pub async fn switch_image(&mut self, image_id: ImageId) -> Result<(), SyncError> {
        if self.tools.cancel() {
            log::debug!("Draft discarded by image switch");
        }
        self.sync.store().lock().set_image(image_id);
        self.calibration.clear(image_id);
        log::info!("Switching to image {}", image_id);

        let (listed, calibration) = tokio::join!(
            self.sync.reload(image_id),
            self.sync.backend().fetch_calibration(image_id)
        );
        self.calibration.apply(image_id, calibration);
        listed.map(|_| ())
    }

    /// Save every failed entry again.
    pub async fn retry_failed(&self) -> Vec<(LocalKey, Result<Reconciled, SyncError>)> {
        self.sync.retry_failed().await
    }

    /// Drop every failed entry locally.
    pub fn discard_failed(&self) -> usize {
        let discarded = self.sync.store().lock().discard_failed();
        if discarded > 0 {
            log::info!("Discarded {} failed annotations", discarded);
        }
        discarded
    }

    /// Snapshot of the annotations in display order.
    pub fn annotations(&self) -> Vec<Annotation> {
        self.sync.store().lock().annotations().cloned().collect()
    }

    /// Build the scene to paint.
    pub fn overlay(&self) -> Overlay {
        let style = OverlayStyle {
            draft_color: self.color,
            ..self.style
        };
        let store = self.sync.store().lock();
        build_overlay(&store, &self.tools, self.calibration.current(), &style)
    }

    /// Export the current image's annotations as GeoJSON.
    pub fn export_geojson(&self, georef: Option<&GeoReference>) -> Option<FeatureCollection> {
        let image_id = self.image_id()?;
        Some(feature_collection(image_id, &self.annotations(), georef))
    }
}
