//! Session-level tests.
//!
//! These drive [`crate::OverlaySession`] against the in-memory backend, the
//! same way a host viewer would.

mod scenario_tests;

use std::sync::Arc;

use crate::config::OverlayConfig;
use crate::geometry::Point;
use crate::model::ImageId;
use crate::session::{OverlaySession, PointerEvent};
use crate::sync::{MemoryBackend, SyncRequest};
use crate::viewport::Viewport;

/// Viewport where screen coordinates equal image pixels on a 100x100 image.
fn viewport() -> Viewport {
    Viewport::new(Point::new(0.0, 0.0), (100.0, 100.0), (100.0, 100.0))
}

/// A session with `image_id` loaded from `backend`.
async fn session_on(backend: &Arc<MemoryBackend>, image_id: ImageId) -> OverlaySession<MemoryBackend> {
    let mut session = OverlaySession::new(Arc::clone(backend), &OverlayConfig::default());
    session.switch_image(image_id).await.expect("image loads");
    session
}

fn click(session: &mut OverlaySession<MemoryBackend>, x: f64, y: f64) -> Option<SyncRequest> {
    session.pointer(PointerEvent::click(x, y), &viewport())
}

fn double_click(session: &mut OverlaySession<MemoryBackend>, x: f64, y: f64) -> Option<SyncRequest> {
    session.pointer(PointerEvent::double_click(x, y), &viewport())
}

/// Yield until the backend has received `count` create requests.
async fn wait_for_creates(backend: &MemoryBackend, count: usize) {
    while backend.create_calls() < count {
        tokio::task::yield_now().await;
    }
}
