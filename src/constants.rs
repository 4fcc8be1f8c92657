//! Global constants for the annotation overlay.

/// Backend heuristic GSD (metres/pixel) used when image metadata has none.
/// Typical for a drone flying at about 100 m.
pub const DEFAULT_ESTIMATED_GSD_M: f64 = 0.03;

/// Minimum number of vertices required for a committed polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Unit conversion thresholds. Persisted labels depend on these values.
pub mod units {
    /// Distances at or above this many metres are shown in kilometres.
    pub const KILOMETER_THRESHOLD_M: f64 = 1000.0;
    /// Areas at or above this many square metres are shown in hectares.
    pub const HECTARE_THRESHOLD_M2: f64 = 10_000.0;
    /// Square metres per hectare.
    pub const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;
}

/// Overlay styling defaults.
pub mod overlay {
    /// Marker radius in screen pixels
    pub const MARKER_RADIUS: f64 = 6.0;
    /// Endpoint marker radius for measurement lines
    pub const ENDPOINT_RADIUS: f64 = 4.0;
    /// Eraser hit tolerance in screen pixels
    pub const HIT_TOLERANCE: f64 = 8.0;
    /// Dash length for the open polygon draft outline
    pub const DRAFT_DASH: f64 = 5.0;
    /// Fill opacity for committed polygons
    pub const POLYGON_FILL_ALPHA: f32 = 0.3;
    /// Stroke opacity for entries the backend has not confirmed
    pub const PENDING_ALPHA: f32 = 0.6;
    /// Stroke opacity for the in-progress draft
    pub const DRAFT_ALPHA: f32 = 0.8;
}

/// Zoom limits for the image viewport.
pub mod zoom {
    /// Minimum zoom factor
    pub const MIN: f64 = 0.1;
    /// Maximum zoom factor
    pub const MAX: f64 = 20.0;
}

/// Earth-surface approximation used for pixel to lon/lat export.
pub mod geo {
    /// Metres per degree of latitude (and of longitude at the equator).
    pub const METERS_PER_DEGREE: f64 = 111_320.0;
    /// CRS name for geographic exports.
    pub const CRS_WGS84: &str = "urn:ogc:def:crs:OGC:1.3:CRS84";
    /// CRS name for exports left in image pixel space.
    pub const CRS_IMAGE_PIXEL: &str = "image-pixel";
}
