//! Backend record format.
//!
//! The backend stores annotations as `{id, image_id, annotation_type, data}`
//! with a free-form JSON `data` object per type. This module converts between
//! those records and [`Annotation`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::MIN_POLYGON_VERTICES;
use crate::geometry::{self, Point};
use crate::model::{Annotation, AnnotationId, AnnotationKind, AnnotationShape, ImageId, PaletteColor};
use crate::units;

/// Errors decoding backend records.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("Unsupported annotation type: {0}")]
    UnsupportedType(String),

    #[error("Malformed {kind} data: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Polygon has {0} vertices, at least 3 required")]
    TooFewVertices(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A stored annotation as returned by list/create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub annotation_type: String,
    pub data: serde_json::Value,
}

/// Create payload; the backend assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnnotationRecord {
    pub image_id: ImageId,
    pub annotation_type: String,
    pub data: serde_json::Value,
}

impl NewAnnotationRecord {
    /// Attach a backend id.
    pub fn into_record(self, id: AnnotationId) -> AnnotationRecord {
        AnnotationRecord {
            id,
            image_id: self.image_id,
            annotation_type: self.annotation_type,
            data: self.data,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct XY {
    x: f64,
    y: f64,
}

impl From<Point> for XY {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<XY> for Point {
    fn from(p: XY) -> Self {
        Point::new(p.x, p.y)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PointData {
    x: f64,
    y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PolygonData {
    points: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    #[serde(
        rename = "areaM2",
        alias = "area_m2",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    area_m2: Option<f64>,
    #[serde(
        rename = "areaPx",
        alias = "area_px",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    area_px: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MeasurementData {
    start: XY,
    end: XY,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    distance_pixels: Option<f64>,
    #[serde(
        rename = "distanceM",
        alias = "distance_meters",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    distance_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

fn color_from(hex: Option<&str>) -> PaletteColor {
    match hex {
        Some(hex) => PaletteColor::from_hex(hex).unwrap_or_else(|| {
            log::debug!("Unknown annotation colour {}, using default", hex);
            PaletteColor::default()
        }),
        None => PaletteColor::default(),
    }
}

fn malformed(kind: AnnotationKind) -> impl FnOnce(serde_json::Error) -> WireError {
    move |source| WireError::Malformed {
        kind: kind.as_str(),
        source,
    }
}

/// Build the create payload for an annotation.
pub fn encode(annotation: &Annotation, image_id: ImageId) -> Result<NewAnnotationRecord, WireError> {
    let label = Some(annotation.label.clone());
    let color = Some(annotation.color.hex().to_string());

    let data = match &annotation.shape {
        AnnotationShape::Point { at } => serde_json::to_value(PointData {
            x: at.x,
            y: at.y,
            label,
            color,
        })?,
        AnnotationShape::Measurement {
            start,
            end,
            distance_pixels,
            distance_meters,
        } => serde_json::to_value(MeasurementData {
            start: (*start).into(),
            end: (*end).into(),
            distance_pixels: Some(*distance_pixels),
            distance_m: *distance_meters,
            label,
            color,
        })?,
        AnnotationShape::Polygon {
            vertices,
            area_pixels,
            area_square_meters,
        } => serde_json::to_value(PolygonData {
            points: vertices.iter().map(|p| [p.x, p.y]).collect(),
            label,
            color,
            area_m2: *area_square_meters,
            area_px: Some(*area_pixels),
        })?,
    };

    Ok(NewAnnotationRecord {
        image_id,
        annotation_type: annotation.kind().as_str().to_string(),
        data,
    })
}

/// Decode one backend record.
///
/// Derived values (pixel length and area, label anchor) are recomputed from
/// the geometry. A missing label is regenerated from the stored measurements.
pub fn decode(record: &AnnotationRecord) -> Result<Annotation, WireError> {
    let annotation = match record.annotation_type.as_str() {
        "point" => {
            let data: PointData = serde_json::from_value(record.data.clone())
                .map_err(malformed(AnnotationKind::Point))?;
            let at = Point::new(data.x, data.y);
            Annotation::point(
                at,
                data.label.unwrap_or_else(|| "Point".to_string()),
                color_from(data.color.as_deref()),
            )
        }
        "measurement" => {
            let data: MeasurementData = serde_json::from_value(record.data.clone())
                .map_err(malformed(AnnotationKind::Measurement))?;
            let start = Point::from(data.start);
            let end = Point::from(data.end);
            let distance_pixels = geometry::distance(start, end);
            let label = data.label.unwrap_or_else(|| match data.distance_m {
                Some(meters) => units::format_distance(meters),
                None => units::format_pixel_distance(distance_pixels),
            });
            Annotation {
                id: None,
                shape: AnnotationShape::Measurement {
                    start,
                    end,
                    distance_pixels,
                    distance_meters: data.distance_m,
                },
                label,
                label_anchor: geometry::midpoint(start, end),
                color: color_from(data.color.as_deref()),
            }
        }
        "polygon" => {
            let data: PolygonData = serde_json::from_value(record.data.clone())
                .map_err(malformed(AnnotationKind::Polygon))?;
            if data.points.len() < MIN_POLYGON_VERTICES {
                return Err(WireError::TooFewVertices(data.points.len()));
            }
            let vertices: Vec<Point> = data.points.iter().map(|&[x, y]| Point::new(x, y)).collect();
            let area_pixels = geometry::polygon_area(&vertices);
            let label = data.label.unwrap_or_else(|| match data.area_m2 {
                Some(square_meters) => units::format_area(square_meters),
                None => units::format_pixel_area(area_pixels),
            });
            let label_anchor = geometry::centroid(&vertices);
            Annotation {
                id: None,
                shape: AnnotationShape::Polygon {
                    vertices,
                    area_pixels,
                    area_square_meters: data.area_m2,
                },
                label,
                label_anchor,
                color: color_from(data.color.as_deref()),
            }
        }
        other => return Err(WireError::UnsupportedType(other.to_string())),
    };

    Ok(annotation.with_id(record.id))
}

/// Decode a list response, skipping records this overlay cannot display.
pub fn decode_all(records: &[AnnotationRecord]) -> Vec<Annotation> {
    records
        .iter()
        .filter_map(|record| match decode(record) {
            Ok(annotation) => Some(annotation),
            Err(e) => {
                log::warn!("Skipping annotation {}: {}", record.id, e);
                None
            }
        })
        .collect()
}
