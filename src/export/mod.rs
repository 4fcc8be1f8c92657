//! Annotation export.
//!
//! - **GeoJSON**: FeatureCollection in lon/lat for georeferenced images, or in
//!   image pixels otherwise. Opens in QGIS, Google Earth and similar tools.

pub mod geojson;

pub use geojson::{FeatureCollection, GeoReference, feature_collection};
