//! Drawing scenarios from first click to backend record.

use std::sync::Arc;

use super::{click, double_click, session_on, viewport, wait_for_creates};
use crate::calibration::Calibration;
use crate::export::geojson::Geometry;
use crate::geometry::Point;
use crate::keybindings::{KeyAction, KeyCode};
use crate::model::{AnnotationShape, AnnotationTool, DrawingState, PaletteColor};
use crate::session::PointerEvent;
use crate::store::{Reconciled, RemovePlan, SyncStatus};
use crate::sync::{MemoryBackend, SyncError, SyncOutcome, SyncRequest};
use crate::viewport::{Transform, Viewport};

#[tokio::test]
async fn test_polygon_closed_with_three_vertices() {
    let backend = Arc::new(MemoryBackend::new());
    let mut session = session_on(&backend, 1).await;
    session.set_tool(AnnotationTool::Polygon);

    assert_eq!(click(&mut session, 0.0, 0.0), None);
    assert_eq!(click(&mut session, 10.0, 0.0), None);
    assert_eq!(click(&mut session, 10.0, 10.0), None);
    let Some(request @ SyncRequest::Persist(key)) = double_click(&mut session, 10.0, 10.0) else {
        panic!("Expected a persist request");
    };
    assert!(!session.draft().is_drawing());

    // Visible as pending before the backend answers
    let entry_status = session.store().lock().get(key).map(|e| e.status().clone());
    assert_eq!(entry_status, Some(SyncStatus::Pending));

    let outcome = session.run(request).await.expect("persisted");
    assert_eq!(outcome, SyncOutcome::Persisted(Reconciled::Replaced));

    let annotations = session.annotations();
    assert_eq!(annotations.len(), 1);
    match &annotations[0].shape {
        AnnotationShape::Polygon {
            vertices,
            area_pixels,
            area_square_meters,
        } => {
            assert_eq!(vertices.len(), 3);
            assert!((area_pixels - 50.0).abs() < 1e-9);
            assert_eq!(*area_square_meters, None);
        }
        other => panic!("Expected polygon, got {:?}", other),
    }
    assert_eq!(annotations[0].label, "50px²");

    let records = backend.records(1);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].annotation_type, "polygon");
    assert_eq!(annotations[0].id, Some(records[0].id));
}

#[tokio::test]
async fn test_calibrated_polygon_label() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_calibration(1, Calibration::new(0.1));
    let mut session = session_on(&backend, 1).await;
    session.set_tool(AnnotationTool::Polygon);

    click(&mut session, 0.0, 0.0);
    click(&mut session, 10.0, 0.0);
    click(&mut session, 10.0, 10.0);
    assert!(double_click(&mut session, 10.0, 10.0).is_some());

    let annotations = session.annotations();
    assert_eq!(annotations[0].label, "0.5 m²");
    assert_eq!(session.overlay().legend, "GSD 10.00 cm/px");
}

#[tokio::test]
async fn test_short_polygon_close_keeps_draft() {
    let backend = Arc::new(MemoryBackend::new());
    let mut session = session_on(&backend, 1).await;
    session.set_tool(AnnotationTool::Polygon);

    click(&mut session, 0.0, 0.0);
    click(&mut session, 10.0, 0.0);
    assert_eq!(double_click(&mut session, 10.0, 0.0), None);
    assert!(session.annotations().is_empty());
    assert_eq!(
        session.draft(),
        &DrawingState::Polygon {
            vertices: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]
        }
    );

    // Third vertex still accepted, then the close succeeds
    assert_eq!(click(&mut session, 10.0, 10.0), None);
    assert!(double_click(&mut session, 10.0, 10.0).is_some());
    assert_eq!(session.annotations().len(), 1);
}

#[tokio::test]
async fn test_cancel_then_click_starts_new_measurement() {
    let backend = Arc::new(MemoryBackend::new());
    let mut session = session_on(&backend, 1).await;
    session.set_tool(AnnotationTool::Measurement);

    click(&mut session, 0.0, 0.0);
    assert_eq!(session.handle_key(KeyCode::Escape), Some(KeyAction::Cancel));
    assert_eq!(session.tool(), AnnotationTool::Measurement);

    assert_eq!(click(&mut session, 5.0, 5.0), None);
    assert!(session.annotations().is_empty());
    assert_eq!(
        session.draft(),
        &DrawingState::Measurement {
            start: Point::new(5.0, 5.0)
        }
    );
    assert_eq!(backend.create_calls(), 0);
}

#[tokio::test]
async fn test_tool_switch_discards_polygon_draft() {
    let backend = Arc::new(MemoryBackend::new());
    let mut session = session_on(&backend, 1).await;
    session.set_tool(AnnotationTool::Polygon);

    click(&mut session, 0.0, 0.0);
    click(&mut session, 10.0, 0.0);
    assert!(session.overlay().draft.is_some());

    assert_eq!(
        session.handle_key(KeyCode::char('v')),
        Some(KeyAction::SelectTool(AnnotationTool::Select))
    );
    assert!(!session.draft().is_drawing());
    assert!(session.overlay().draft.is_none());
    assert!(session.annotations().is_empty());

    // Select passes clicks through
    assert_eq!(click(&mut session, 50.0, 50.0), None);
}

#[tokio::test]
async fn test_remove_before_persist_runs_is_local() {
    let backend = Arc::new(MemoryBackend::new());
    let mut session = session_on(&backend, 1).await;
    session.set_tool(AnnotationTool::Point);

    let Some(SyncRequest::Persist(key)) = click(&mut session, 20.0, 20.0) else {
        panic!("Expected a persist request");
    };
    let outcome = session.run(SyncRequest::Remove(key)).await.expect("removed");
    assert_eq!(outcome, SyncOutcome::Removed(RemovePlan::Local));
    assert!(session.annotations().is_empty());

    // The queued persist now has nothing to send
    assert!(matches!(
        session.run(SyncRequest::Persist(key)).await,
        Err(SyncError::UnknownEntry(_))
    ));
    assert_eq!(backend.create_calls(), 0);
    assert_eq!(backend.delete_calls(), 0);
}

#[tokio::test]
async fn test_remove_while_persist_in_flight_deletes_orphan() {
    let backend = Arc::new(MemoryBackend::new());
    let gate = backend.hold_creates();
    let mut session = session_on(&backend, 1).await;
    session.set_tool(AnnotationTool::Point);

    let Some(request) = click(&mut session, 20.0, 20.0) else {
        panic!("Expected a persist request");
    };
    let persist = tokio::spawn({
        let sync = session.sync_handle();
        async move { sync.run(request).await }
    });
    wait_for_creates(&backend, 1).await;

    // Erase the pending point while its create is held
    session.set_tool(AnnotationTool::Eraser);
    let Some(erase @ SyncRequest::Remove(_)) = click(&mut session, 21.0, 20.0) else {
        panic!("Expected a remove request");
    };
    assert_eq!(
        session.run(erase).await.expect("removed"),
        SyncOutcome::Removed(RemovePlan::Local)
    );
    assert!(session.annotations().is_empty());

    gate.add_permits(1);
    let outcome = persist.await.expect("task joined").expect("persisted");
    let SyncOutcome::Persisted(Reconciled::Orphaned(_)) = outcome else {
        panic!("Expected orphaned confirmation, got {:?}", outcome);
    };

    assert!(session.annotations().is_empty());
    assert!(backend.records(1).is_empty());
    assert_eq!(backend.delete_calls(), 1);
}

#[tokio::test]
async fn test_eraser_deletes_confirmed_shape() {
    let backend = Arc::new(MemoryBackend::new());
    let mut session = session_on(&backend, 1).await;
    session.set_tool(AnnotationTool::Measurement);
    click(&mut session, 10.0, 10.0);
    let request = click(&mut session, 30.0, 10.0).expect("measurement committed");
    session.run(request).await.expect("persisted");

    // Clicks on shapes only reach the eraser
    session.set_tool(AnnotationTool::Point);
    assert!(matches!(
        click(&mut session, 28.0, 10.0),
        Some(SyncRequest::Persist(_))
    ));

    session.set_tool(AnnotationTool::Eraser);
    assert_eq!(click(&mut session, 60.0, 60.0), None);
    let Some(erase) = click(&mut session, 12.0, 11.0) else {
        panic!("Expected the measurement line to be hit");
    };
    let outcome = session.run(erase).await.expect("deleted");
    assert!(matches!(outcome, SyncOutcome::Removed(RemovePlan::Remote(_))));

    let remaining = session.annotations();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].label, "Point 2");
    assert!(backend.records(1).is_empty());
}

#[tokio::test]
async fn test_pointer_mapping_uses_viewport() {
    let backend = Arc::new(MemoryBackend::new());
    let mut session = session_on(&backend, 1).await;
    session.set_tool(AnnotationTool::Point);
    session.set_color(PaletteColor::Yellow);

    // 1000x1000 image shown at 2x zoom in a 100x100 element offset by (50, 50)
    let zoomed = Viewport::new(Point::new(50.0, 50.0), (100.0, 100.0), (1000.0, 1000.0))
        .with_transform(Transform::new(2.0, 0.0, 0.0));
    let request = session.pointer(PointerEvent::click(110.0, 100.0), &zoomed);
    assert!(request.is_some());

    let annotations = session.annotations();
    assert_eq!(annotations[0].shape, AnnotationShape::Point { at: Point::new(550.0, 500.0) });
    assert_eq!(annotations[0].color, PaletteColor::Yellow);

    // Off the image
    let outside = Viewport::new(Point::new(0.0, 0.0), (200.0, 100.0), (100.0, 100.0));
    assert_eq!(session.pointer(PointerEvent::click(10.0, 50.0), &outside), None);
    assert_eq!(session.annotations().len(), 1);
}

#[tokio::test]
async fn test_image_switch_cancels_draft_and_reloads() {
    let backend = Arc::new(MemoryBackend::new());
    backend.insert_record(
        2,
        "point",
        serde_json::json!({"x": 5.0, "y": 5.0, "label": "Well", "color": "#00FF00"}),
    );
    backend.insert_record(2, "circle", serde_json::json!({"center": {"x": 1, "y": 1}, "radius": 4}));
    backend.set_calibration(2, Calibration::estimated_default());

    let mut session = session_on(&backend, 1).await;
    session.set_tool(AnnotationTool::Polygon);
    click(&mut session, 0.0, 0.0);
    click(&mut session, 10.0, 0.0);

    session.switch_image(2).await.expect("image loads");
    assert!(!session.draft().is_drawing());
    assert_eq!(session.tool(), AnnotationTool::Polygon);
    assert_eq!(session.image_id(), Some(2));

    let annotations = session.annotations();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].label, "Well");
    assert_eq!(annotations[0].color, PaletteColor::Green);
    assert!(session.calibration().is_some_and(|c| c.is_estimated()));
    assert_eq!(session.overlay().legend, "GSD 3.00 cm/px (estimated)");
}

#[tokio::test]
async fn test_viewport_needs_an_image() {
    let backend = Arc::new(MemoryBackend::new());
    let mut session = crate::session::OverlaySession::new(
        Arc::clone(&backend),
        &crate::config::OverlayConfig::default(),
    );
    session.set_tool(AnnotationTool::Point);
    assert_eq!(session.pointer(PointerEvent::click(5.0, 5.0), &viewport()), None);
    assert!(session.export_geojson(None).is_none());
}

#[tokio::test]
async fn test_export_includes_pending_annotations() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_calibration(1, Calibration::new(0.5));
    let mut session = session_on(&backend, 1).await;

    session.set_tool(AnnotationTool::Measurement);
    click(&mut session, 0.0, 0.0);
    let saved = click(&mut session, 20.0, 0.0).expect("measurement committed");
    session.run(saved).await.expect("persisted");

    session.set_tool(AnnotationTool::Point);
    click(&mut session, 40.0, 40.0).expect("point committed");

    let collection = session.export_geojson(None).expect("image selected");
    assert_eq!(collection.features.len(), 2);

    let line = &collection.features[0];
    assert_eq!(line.geometry, Geometry::LineString(vec![[0.0, 0.0], [20.0, 0.0]]));
    assert_eq!(line.properties.distance_m, Some(10.0));
    assert_eq!(line.properties.label, "10.00 m");
    assert!(line.properties.annotation_id.is_some());

    let point = &collection.features[1];
    assert_eq!(point.geometry, Geometry::Point([40.0, 40.0]));
    assert_eq!(point.properties.annotation_id, None);
    assert_eq!(point.properties.image_id, 1);
}
