//! GeoJSON FeatureCollection export.
//!
//! # Format Structure
//!
//! ```json
//! {
//!   "type": "FeatureCollection",
//!   "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:OGC:1.3:CRS84" } },
//!   "features": [
//!     {
//!       "type": "Feature",
//!       "geometry": { "type": "Polygon", "coordinates": [[[lon, lat], ...]] },
//!       "properties": { "annotation_id": 1, "type": "polygon", "label": "12.5 m²", ... }
//!     }
//!   ]
//! }
//! ```
//!
//! Pixel coordinates are converted with a flat-earth offset from the image
//! centre, which is adequate for the footprint of a single drone image.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_ESTIMATED_GSD_M;
use crate::constants::geo::{CRS_IMAGE_PIXEL, CRS_WGS84, METERS_PER_DEGREE};
use crate::geometry::Point;
use crate::model::{Annotation, AnnotationId, AnnotationKind, AnnotationShape, ImageId};

/// Where an image sits on the ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoReference {
    /// Latitude of the image centre in degrees.
    pub center_lat: f64,
    /// Longitude of the image centre in degrees.
    pub center_lon: f64,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Metres per pixel.
    #[serde(default = "default_gsd")]
    pub gsd_m: f64,
}

fn default_gsd() -> f64 {
    DEFAULT_ESTIMATED_GSD_M
}

impl GeoReference {
    /// Convert an image pixel to `[lon, lat]`.
    pub fn pixel_to_lon_lat(&self, p: Point) -> [f64; 2] {
        let dx_m = (p.x - f64::from(self.width) / 2.0) * self.gsd_m;
        // Pixel Y grows downwards
        let dy_m = -(p.y - f64::from(self.height) / 2.0) * self.gsd_m;

        let dlat = dy_m / METERS_PER_DEGREE;
        let dlon = dx_m / (METERS_PER_DEGREE * self.center_lat.to_radians().cos());
        [self.center_lon + dlon, self.center_lat + dlat]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub crs: Crs,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Named coordinate reference system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crs {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: CrsProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrsProperties {
    pub name: String,
}

impl Crs {
    fn named(name: &str) -> Self {
        Self {
            kind: "name".to_string(),
            properties: CrsProperties {
                name: name.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Geometry,
    pub properties: FeatureProperties,
}

/// GeoJSON geometry. Coordinates are `[x, y]` or `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
    Polygon(Vec<Vec<[f64; 2]>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    /// Backend id; null for annotations not yet saved
    pub annotation_id: Option<AnnotationId>,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub label: String,
    /// Hex colour
    pub color: String,
    pub image_id: ImageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_m2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

/// Build a FeatureCollection for one image's annotations.
///
/// With a [`GeoReference`] coordinates are `[lon, lat]` in CRS84; without one
/// they stay in image pixels.
pub fn feature_collection(
    image_id: ImageId,
    annotations: &[Annotation],
    georef: Option<&GeoReference>,
) -> FeatureCollection {
    let to_coord = |p: Point| match georef {
        Some(georef) => georef.pixel_to_lon_lat(p),
        None => [p.x, p.y],
    };

    let features = annotations
        .iter()
        .map(|ann| {
            let mut properties = FeatureProperties {
                annotation_id: ann.id,
                kind: ann.kind(),
                label: ann.label.clone(),
                color: ann.color.hex().to_string(),
                image_id,
                area_m2: None,
                distance_m: None,
            };

            let geometry = match &ann.shape {
                AnnotationShape::Point { at } => Geometry::Point(to_coord(*at)),
                AnnotationShape::Measurement {
                    start,
                    end,
                    distance_meters,
                    ..
                } => {
                    properties.distance_m = *distance_meters;
                    Geometry::LineString(vec![to_coord(*start), to_coord(*end)])
                }
                AnnotationShape::Polygon {
                    vertices,
                    area_square_meters,
                    ..
                } => {
                    properties.area_m2 = *area_square_meters;
                    let mut ring: Vec<[f64; 2]> = vertices.iter().map(|v| to_coord(*v)).collect();
                    // Close the ring
                    if let Some(first) = ring.first().copied() {
                        ring.push(first);
                    }
                    Geometry::Polygon(vec![ring])
                }
            };

            Feature {
                kind: "Feature".to_string(),
                geometry,
                properties,
            }
        })
        .collect();

    FeatureCollection {
        kind: "FeatureCollection".to_string(),
        crs: Crs::named(if georef.is_some() { CRS_WGS84 } else { CRS_IMAGE_PIXEL }),
        features,
    }
}
