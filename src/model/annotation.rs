//! Annotation tool types and data structures.

use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::constants::MIN_POLYGON_VERTICES;
use crate::geometry::{self, Point};
use crate::model::PaletteColor;
use crate::units;

/// Backend-assigned identifier for an annotation.
pub type AnnotationId = u64;

/// Backend identifier for an image.
pub type ImageId = u64;

/// Annotation tools available in the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationTool {
    /// No drawing; clicks pass through to the image surface
    #[default]
    Select,
    /// Single-click point markers
    Point,
    /// Click-per-vertex polygons, closed with a double click
    Polygon,
    /// Two-click distance measurement
    Measurement,
    /// Click on a shape to delete it
    Eraser,
}

impl AnnotationTool {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationTool::Select => "Select",
            AnnotationTool::Point => "Point",
            AnnotationTool::Polygon => "Polygon",
            AnnotationTool::Measurement => "Measurement",
            AnnotationTool::Eraser => "Eraser",
        }
    }

    /// Get all available annotation tools.
    pub fn all() -> &'static [AnnotationTool] {
        &[
            AnnotationTool::Select,
            AnnotationTool::Point,
            AnnotationTool::Polygon,
            AnnotationTool::Measurement,
            AnnotationTool::Eraser,
        ]
    }

    /// Check if this tool creates annotations.
    pub fn is_drawing_tool(&self) -> bool {
        matches!(
            self,
            AnnotationTool::Point | AnnotationTool::Polygon | AnnotationTool::Measurement
        )
    }
}

/// Kind of a committed annotation, as named by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Point,
    Polygon,
    Measurement,
}

impl AnnotationKind {
    /// Backend `annotation_type` string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Point => "point",
            AnnotationKind::Polygon => "polygon",
            AnnotationKind::Measurement => "measurement",
        }
    }
}

/// Shape data for an annotation (in image coordinates).
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationShape {
    /// Single point marker.
    Point { at: Point },
    /// Straight-line distance between two points.
    Measurement {
        start: Point,
        end: Point,
        distance_pixels: f64,
        /// Only known when the image was calibrated at creation time.
        distance_meters: Option<f64>,
    },
    /// Closed polygon. Always holds at least three vertices.
    Polygon {
        vertices: Vec<Point>,
        area_pixels: f64,
        /// Only known when the image was calibrated at creation time.
        area_square_meters: Option<f64>,
    },
}

impl AnnotationShape {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationShape::Point { .. } => AnnotationKind::Point,
            AnnotationShape::Measurement { .. } => AnnotationKind::Measurement,
            AnnotationShape::Polygon { .. } => AnnotationKind::Polygon,
        }
    }
}

/// A committed or pending annotation.
///
/// Label and label anchor are computed once, at creation, so rendering needs
/// no geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Backend id; `None` until the backend confirms creation.
    pub id: Option<AnnotationId>,
    /// The shape geometry.
    pub shape: AnnotationShape,
    /// Display label.
    pub label: String,
    /// Where the label is drawn.
    pub label_anchor: Point,
    /// Palette colour, fixed at creation.
    pub color: PaletteColor,
}

impl Annotation {
    /// A point annotation with a free-text label.
    pub fn point(at: Point, label: impl Into<String>, color: PaletteColor) -> Self {
        Self {
            id: None,
            shape: AnnotationShape::Point { at },
            label: label.into(),
            label_anchor: at,
            color,
        }
    }

    /// A measurement between two points, labelled in metres when calibrated.
    pub fn measurement(
        start: Point,
        end: Point,
        calibration: Option<&Calibration>,
        color: PaletteColor,
    ) -> Self {
        let distance_pixels = geometry::distance(start, end);
        let measured = units::distance_label(distance_pixels, calibration);
        Self {
            id: None,
            shape: AnnotationShape::Measurement {
                start,
                end,
                distance_pixels,
                distance_meters: measured.metric,
            },
            label: measured.label,
            label_anchor: geometry::midpoint(start, end),
            color,
        }
    }

    /// A polygon labelled with its area. Returns None with fewer than three
    /// vertices.
    pub fn polygon(
        vertices: Vec<Point>,
        calibration: Option<&Calibration>,
        color: PaletteColor,
    ) -> Option<Self> {
        if vertices.len() < MIN_POLYGON_VERTICES {
            return None;
        }

        let area_pixels = geometry::polygon_area(&vertices);
        let measured = units::area_label(area_pixels, calibration);
        let label_anchor = geometry::centroid(&vertices);
        Some(Self {
            id: None,
            shape: AnnotationShape::Polygon {
                vertices,
                area_pixels,
                area_square_meters: measured.metric,
            },
            label: measured.label,
            label_anchor,
            color,
        })
    }

    /// Attach a backend id.
    pub fn with_id(mut self, id: AnnotationId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn kind(&self) -> AnnotationKind {
        self.shape.kind()
    }

    /// True until the backend has assigned an id.
    pub fn is_pending(&self) -> bool {
        self.id.is_none()
    }
}

/// Draft state for an annotation currently being drawn.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DrawingState {
    /// Not currently drawing anything.
    #[default]
    Idle,
    /// Measurement waiting for its second click.
    Measurement { start: Point },
    /// Polygon vertices added so far.
    Polygon { vertices: Vec<Point> },
}

impl DrawingState {
    /// Check if a draft is open.
    pub fn is_drawing(&self) -> bool {
        !matches!(self, DrawingState::Idle)
    }
}
