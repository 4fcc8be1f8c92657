//! Aerial Annotate - measurement overlay for aerial imagery
//!
//! Draw points, polygons and distance measurements on top of a drone image,
//! label them in metres using the image's ground sample distance, and keep
//! them in sync with a remote annotation collection.
//!
//! The entry point for hosts is [`OverlaySession`]: feed it pointer and key
//! events, run the [`SyncRequest`]s it returns, and paint its [`Overlay`].

pub mod calibration;
pub mod config;
pub mod constants;
pub mod export;
pub mod geometry;
pub mod keybindings;
pub mod model;
pub mod overlay;
pub mod session;
pub mod store;
pub mod sync;
pub mod tools;
pub mod units;
pub mod viewport;
pub mod wire;

#[cfg(test)]
mod tests;

pub use calibration::{Calibration, CalibrationProvider, CalibrationSource};
pub use config::{ConfigError, LogLevel, OverlayConfig};
pub use geometry::Point;
pub use keybindings::{KeyAction, KeyBindings, KeyCode};
pub use model::{Annotation, AnnotationId, AnnotationKind, AnnotationShape, AnnotationTool, DrawingState, ImageId, PaletteColor};
pub use overlay::{Overlay, OverlayItem, Primitive, build_overlay};
pub use session::{OverlaySession, PointerEvent, PointerKind};
pub use store::{AnnotationStore, LocalKey, Reconciled, RemovePlan, SyncStatus};
pub use sync::{AnnotationBackend, AnnotationSync, BackendError, MemoryBackend, SyncError, SyncOutcome, SyncRequest};
pub use viewport::{Transform, Viewport};
