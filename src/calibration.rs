//! Ground sample distance (GSD) calibration for the current image.
//!
//! A calibration says how many metres one image pixel covers. It is fetched
//! once per image; when none is available every label falls back to pixel
//! units.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_ESTIMATED_GSD_M;
use crate::model::ImageId;
use crate::sync::BackendError;

/// Per-image calibration record.
///
/// Field names follow the backend's `/images/{id}/gsd` response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Metres per pixel.
    #[serde(rename = "gsd_m")]
    pub meters_per_pixel: f64,
    /// Centimetres per pixel.
    #[serde(rename = "gsd_cm")]
    pub centimeters_per_pixel: f64,
    /// Source image width in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// Source image height in pixels.
    #[serde(default)]
    pub height: Option<u32>,
    /// True when the value is a heuristic fallback rather than derived from
    /// image metadata.
    #[serde(rename = "is_estimated", default)]
    pub estimated: bool,
}

impl Calibration {
    /// Create a metadata-derived calibration.
    pub fn new(meters_per_pixel: f64) -> Self {
        Self {
            meters_per_pixel,
            centimeters_per_pixel: meters_per_pixel * 100.0,
            width: None,
            height: None,
            estimated: false,
        }
    }

    /// The backend's heuristic default (typical drone flight height).
    pub fn estimated_default() -> Self {
        Self::new(DEFAULT_ESTIMATED_GSD_M).estimated(true)
    }

    /// Attach the source image dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the estimated flag.
    pub fn estimated(mut self, estimated: bool) -> Self {
        self.estimated = estimated;
        self
    }

    /// Whether this calibration is a heuristic guess.
    pub fn is_estimated(&self) -> bool {
        self.estimated
    }

    /// A calibration is only usable with a finite, positive scale.
    pub fn is_usable(&self) -> bool {
        self.meters_per_pixel.is_finite() && self.meters_per_pixel > 0.0
    }
}

/// Read-only source of calibration records, keyed by image.
#[async_trait]
pub trait CalibrationSource: Send + Sync {
    /// Fetch the calibration for an image. `Ok(None)` means "not available".
    async fn fetch_calibration(&self, image_id: ImageId)
        -> Result<Option<Calibration>, BackendError>;
}

/// Holds the calibration of the currently displayed image.
#[derive(Debug, Clone, Default)]
pub struct CalibrationProvider {
    image_id: Option<ImageId>,
    current: Option<Calibration>,
}

impl CalibrationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calibration for the current image, if any usable one is known.
    pub fn current(&self) -> Option<&Calibration> {
        self.current.as_ref()
    }

    /// The image the current calibration belongs to.
    pub fn image_id(&self) -> Option<ImageId> {
        self.image_id
    }

    /// Forget the previous image's calibration.
    pub fn clear(&mut self, image_id: ImageId) {
        self.image_id = Some(image_id);
        self.current = None;
    }

    /// Apply the result of a fetch for `image_id`.
    ///
    /// Errors and unusable records degrade to "no calibration". Results for
    /// an image that is no longer current are dropped.
    pub fn apply(
        &mut self,
        image_id: ImageId,
        result: Result<Option<Calibration>, BackendError>,
    ) -> Option<&Calibration> {
        if self.image_id.is_some_and(|current| current != image_id) {
            log::debug!("Ignoring calibration for stale image {}", image_id);
            return self.current.as_ref();
        }
        self.image_id = Some(image_id);

        self.current = match result {
            Ok(Some(calibration)) if calibration.is_usable() => {
                log::info!(
                    "Calibration for image {}: {:.4} m/px{}",
                    image_id,
                    calibration.meters_per_pixel,
                    if calibration.estimated { " (estimated)" } else { "" }
                );
                Some(calibration)
            }
            Ok(Some(calibration)) => {
                log::warn!(
                    "Ignoring unusable calibration for image {}: {} m/px",
                    image_id,
                    calibration.meters_per_pixel
                );
                None
            }
            Ok(None) => {
                log::info!("No calibration for image {}, using pixel units", image_id);
                None
            }
            Err(e) => {
                log::warn!("Failed to fetch calibration for image {}: {}", image_id, e);
                None
            }
        };
        self.current.as_ref()
    }
}
