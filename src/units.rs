//! Pixel to real-world unit conversion and label formatting.
//!
//! The formatting thresholds are fixed: labels are persisted with the
//! annotations, so changing them would make new labels disagree with stored
//! ones.

use crate::calibration::Calibration;
use crate::constants::units::{HECTARE_THRESHOLD_M2, KILOMETER_THRESHOLD_M, SQUARE_METERS_PER_HECTARE};

/// Convert a pixel distance to metres.
pub fn pixels_to_meters(pixel_distance: f64, calibration: &Calibration) -> f64 {
    pixel_distance * calibration.meters_per_pixel
}

/// Convert a pixel area to square metres.
pub fn pixel_area_to_square_meters(pixel_area: f64, calibration: &Calibration) -> f64 {
    pixel_area * calibration.meters_per_pixel * calibration.meters_per_pixel
}

/// Format a distance in metres, switching to kilometres at 1000 m.
pub fn format_distance(meters: f64) -> String {
    if meters < KILOMETER_THRESHOLD_M {
        format!("{:.2} m", meters)
    } else {
        format!("{:.2} km", meters / KILOMETER_THRESHOLD_M)
    }
}

/// Format an area in square metres, switching to hectares at 10 000 m².
pub fn format_area(square_meters: f64) -> String {
    if square_meters < HECTARE_THRESHOLD_M2 {
        format!("{:.1} m²", square_meters)
    } else {
        format!("{:.2} ha", square_meters / SQUARE_METERS_PER_HECTARE)
    }
}

/// Pixel-unit distance label used when no calibration is available.
pub fn format_pixel_distance(pixels: f64) -> String {
    format!("{:.0}px", pixels)
}

/// Pixel-unit area label used when no calibration is available.
pub fn format_pixel_area(square_pixels: f64) -> String {
    format!("{:.0}px²", square_pixels)
}

/// A derived measurement: the metric value (when calibrated) and its label.
#[derive(Debug, Clone, PartialEq)]
pub struct Measured {
    /// Value in metres or square metres; `None` without calibration.
    pub metric: Option<f64>,
    /// Display label.
    pub label: String,
}

/// Label a pixel distance, in metres when calibrated and pixels otherwise.
pub fn distance_label(pixel_distance: f64, calibration: Option<&Calibration>) -> Measured {
    match calibration {
        Some(calibration) => {
            let meters = pixels_to_meters(pixel_distance, calibration);
            Measured {
                metric: Some(meters),
                label: format_distance(meters),
            }
        }
        None => Measured {
            metric: None,
            label: format_pixel_distance(pixel_distance),
        },
    }
}

/// Label a pixel area, in m²/ha when calibrated and pixels otherwise.
pub fn area_label(pixel_area: f64, calibration: Option<&Calibration>) -> Measured {
    match calibration {
        Some(calibration) => {
            let square_meters = pixel_area_to_square_meters(pixel_area, calibration);
            Measured {
                metric: Some(square_meters),
                label: format_area(square_meters),
            }
        }
        None => Measured {
            metric: None,
            label: format_pixel_area(pixel_area),
        },
    }
}

/// Legend line describing how labels are scaled.
pub fn scale_legend(calibration: Option<&Calibration>) -> String {
    match calibration {
        Some(c) if c.is_estimated() => format!("GSD {:.2} cm/px (estimated)", c.centimeters_per_pixel),
        Some(c) => format!("GSD {:.2} cm/px", c.centimeters_per_pixel),
        None => "Pixel units".to_string(),
    }
}
