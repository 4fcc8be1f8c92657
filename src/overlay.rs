//! Overlay shapes for rendering on top of the image.
//!
//! [`build_overlay`] turns the store and the open draft into a flat list of
//! drawing primitives in image coordinates. Labels are taken from the
//! annotations as computed at creation time; nothing is measured here.

use crate::calibration::Calibration;
use crate::config::Preferences;
use crate::constants::overlay::{
    DRAFT_ALPHA, DRAFT_DASH, ENDPOINT_RADIUS, MARKER_RADIUS, PENDING_ALPHA, POLYGON_FILL_ALPHA,
};
use crate::geometry::{self, Point};
use crate::model::{AnnotationShape, AnnotationTool, DrawingState, PaletteColor};
use crate::store::{AnnotationStore, LocalKey, SyncStatus};
use crate::tools::ToolState;
use crate::units;

/// A single drawing primitive in image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Filled circle. Radius is in screen pixels.
    Marker { at: Point, radius: f64 },
    /// Line segment, dashed when `dash` is set.
    Line {
        from: Point,
        to: Point,
        dash: Option<f64>,
    },
    /// Polygon outline, optionally filled.
    Polygon {
        vertices: Vec<Point>,
        closed: bool,
        /// Fill opacity; None draws the outline only
        fill_alpha: Option<f32>,
        dash: Option<f64>,
    },
    /// Text anchored at a point.
    Label { at: Point, text: String },
}

/// One rendered shape with styling.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    /// Store entry this item draws; None for the draft.
    pub target: Option<LocalKey>,
    /// Stroke colour (RGBA, 0.0-1.0)
    pub color: [f32; 4],
    /// Whether pointer events on this item reach the eraser.
    pub interactive: bool,
    /// Sync state of the entry; None for the draft.
    pub status: Option<SyncStatus>,
    pub primitives: Vec<Primitive>,
}

impl OverlayItem {
    /// Whether `point` (image coordinates) lies on this item.
    fn hit(&self, point: Point, tolerance: f64) -> bool {
        self.primitives.iter().any(|primitive| match primitive {
            Primitive::Marker { at, .. } => geometry::distance(*at, point) <= tolerance,
            Primitive::Line { from, to, .. } => {
                geometry::distance_to_segment(point, *from, *to) <= tolerance
            }
            Primitive::Polygon {
                vertices, closed, ..
            } => {
                let n = vertices.len();
                let edges = if *closed { n } else { n.saturating_sub(1) };
                (*closed && geometry::polygon_contains(vertices, point))
                    || (0..edges).any(|i| {
                        geometry::distance_to_segment(point, vertices[i], vertices[(i + 1) % n])
                            <= tolerance
                    })
            }
            Primitive::Label { .. } => false,
        })
    }
}

/// Sizes used when building primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub marker_radius: f64,
    pub endpoint_radius: f64,
    pub draft_dash: f64,
    pub fill_alpha: f32,
    /// Colour of the open draft.
    pub draft_color: PaletteColor,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            marker_radius: MARKER_RADIUS,
            endpoint_radius: ENDPOINT_RADIUS,
            draft_dash: DRAFT_DASH,
            fill_alpha: POLYGON_FILL_ALPHA,
            draft_color: PaletteColor::default(),
        }
    }
}

impl From<&Preferences> for OverlayStyle {
    fn from(preferences: &Preferences) -> Self {
        Self {
            marker_radius: preferences.marker_radius,
            draft_dash: preferences.draft_dash,
            draft_color: preferences.default_color,
            ..Self::default()
        }
    }
}

/// A collection of overlay items to render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    /// Committed and pending annotations, in store order.
    pub items: Vec<OverlayItem>,
    /// The in-progress draft, painted last.
    pub draft: Option<OverlayItem>,
    /// How labels were derived, e.g. "GSD 3.00 cm/px".
    pub legend: String,
}

impl Overlay {
    /// Create a new empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item to the overlay.
    pub fn push(&mut self, item: OverlayItem) {
        self.items.push(item);
    }

    /// Set the draft shape.
    pub fn set_draft(&mut self, draft: Option<OverlayItem>) {
        self.draft = draft;
    }

    /// Check if the overlay is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.draft.is_none()
    }

    /// Items in paint order: annotations first, then the draft.
    pub fn paint_order(&self) -> impl Iterator<Item = &OverlayItem> {
        self.items.iter().chain(self.draft.iter())
    }

    /// Topmost interactive item under `point` (image coordinates).
    pub fn hit_test(&self, point: Point, tolerance: f64) -> Option<LocalKey> {
        self.items
            .iter()
            .rev()
            .filter(|item| item.interactive)
            .find(|item| item.hit(point, tolerance))
            .and_then(|item| item.target)
    }
}

/// Build an overlay from annotations and drawing state.
pub fn build_overlay(
    store: &AnnotationStore,
    tools: &ToolState,
    calibration: Option<&Calibration>,
    style: &OverlayStyle,
) -> Overlay {
    let mut overlay = Overlay::new();
    let interactive = tools.tool() == AnnotationTool::Eraser;

    for entry in store.iter() {
        let ann = entry.annotation();
        let alpha = match entry.status() {
            SyncStatus::Confirmed => 1.0,
            SyncStatus::Pending | SyncStatus::Failed { .. } => PENDING_ALPHA,
        };

        let label = Primitive::Label {
            at: ann.label_anchor,
            text: ann.label.clone(),
        };
        let primitives = match &ann.shape {
            AnnotationShape::Point { at } => vec![
                Primitive::Marker {
                    at: *at,
                    radius: style.marker_radius,
                },
                label,
            ],
            AnnotationShape::Measurement { start, end, .. } => vec![
                Primitive::Line {
                    from: *start,
                    to: *end,
                    dash: None,
                },
                Primitive::Marker {
                    at: *start,
                    radius: style.endpoint_radius,
                },
                Primitive::Marker {
                    at: *end,
                    radius: style.endpoint_radius,
                },
                label,
            ],
            AnnotationShape::Polygon { vertices, .. } => vec![
                Primitive::Polygon {
                    vertices: vertices.clone(),
                    closed: true,
                    fill_alpha: Some(style.fill_alpha),
                    dash: None,
                },
                label,
            ],
        };

        overlay.push(OverlayItem {
            target: Some(entry.key()),
            color: ann.color.rgba(alpha),
            interactive,
            status: Some(entry.status().clone()),
            primitives,
        });
    }

    let draft_primitives = match tools.draft() {
        DrawingState::Idle => None,
        DrawingState::Measurement { start } => Some(vec![Primitive::Marker {
            at: *start,
            radius: style.endpoint_radius,
        }]),
        DrawingState::Polygon { vertices } => {
            let mut primitives = vec![Primitive::Polygon {
                vertices: vertices.clone(),
                closed: false,
                fill_alpha: None,
                dash: Some(style.draft_dash),
            }];
            primitives.extend(vertices.iter().map(|v| Primitive::Marker {
                at: *v,
                radius: style.endpoint_radius,
            }));
            Some(primitives)
        }
    };
    overlay.set_draft(draft_primitives.map(|primitives| OverlayItem {
        target: None,
        color: style.draft_color.rgba(DRAFT_ALPHA),
        interactive: false,
        status: None,
        primitives,
    }));

    overlay.legend = units::scale_legend(calibration);
    overlay
}
