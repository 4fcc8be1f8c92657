//! Screen/image coordinate mapping.
//!
//! The image is fitted into the host element, centred, then scaled by the
//! user zoom and offset by the pan. All annotation geometry lives in image
//! pixels; only pointer events and rendering touch screen space.

use crate::constants::zoom;
use crate::geometry::Point;

/// Represents pan/zoom transform state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Transform {
    /// Create a new transform with the given zoom and pan.
    pub fn new(zoom: f64, pan_x: f64, pan_y: f64) -> Self {
        Self { zoom, pan_x, pan_y }
    }

    /// Create an identity transform (zoom=1, no pan).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Calculate zoom-to-cursor transformation.
    ///
    /// This keeps the point under the cursor fixed while zooming.
    /// The new zoom is clamped to the supported range.
    pub fn zoom_to_cursor(&self, new_zoom: f64, cursor: Point, widget_center: Point) -> Transform {
        let new_zoom = new_zoom.clamp(zoom::MIN, zoom::MAX);

        // Cursor position relative to widget center
        let cursor_rel_x = cursor.x - widget_center.x;
        let cursor_rel_y = cursor.y - widget_center.y;

        // Zoomed-space point under cursor (before zoom)
        let img_x = (cursor_rel_x - self.pan_x) / self.zoom;
        let img_y = (cursor_rel_y - self.pan_y) / self.zoom;

        Transform {
            zoom: new_zoom,
            pan_x: cursor_rel_x - img_x * new_zoom,
            pan_y: cursor_rel_y - img_y * new_zoom,
        }
    }

    /// Apply a pan delta to the transform.
    pub fn pan_by(&self, dx: f64, dy: f64) -> Transform {
        Transform {
            zoom: self.zoom,
            pan_x: self.pan_x + dx,
            pan_y: self.pan_y + dy,
        }
    }

    /// Zoom in by a factor (e.g., 1.2 for 20% zoom in).
    pub fn zoom_in(&self, factor: f64) -> Transform {
        Transform {
            zoom: (self.zoom * factor).min(zoom::MAX),
            ..*self
        }
    }

    /// Zoom out by a factor (e.g., 1.2 for 20% zoom out).
    pub fn zoom_out(&self, factor: f64) -> Transform {
        Transform {
            zoom: (self.zoom / factor).max(zoom::MIN),
            ..*self
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Where and how the image is shown on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Top-left of the host element in screen coordinates.
    pub origin: Point,
    /// Host element width and height in screen pixels.
    pub size: (f64, f64),
    /// Natural (full-resolution) image width and height.
    pub image_size: (f64, f64),
    pub transform: Transform,
}

impl Viewport {
    /// A viewport with identity transform.
    pub fn new(origin: Point, size: (f64, f64), image_size: (f64, f64)) -> Self {
        Self {
            origin,
            size,
            image_size,
            transform: Transform::identity(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Screen-space centre of the host element.
    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.0 / 2.0,
            self.origin.y + self.size.1 / 2.0,
        )
    }

    /// Screen pixels per image pixel.
    ///
    /// Zero if the element or the image has no area.
    pub fn scale(&self) -> f64 {
        let (w, h) = self.size;
        let (iw, ih) = self.image_size;
        if w <= 0.0 || h <= 0.0 || iw <= 0.0 || ih <= 0.0 {
            return 0.0;
        }
        (w / iw).min(h / ih) * self.transform.zoom
    }

    /// Convert a screen position to image pixels.
    ///
    /// Returns None when the viewport is degenerate. The result may lie
    /// outside the image; see [`Viewport::contains_image_point`].
    pub fn screen_to_image_pixel(&self, screen: Point) -> Option<Point> {
        let scale = self.scale();
        if scale <= 0.0 || !scale.is_finite() {
            return None;
        }
        let center = self.center();
        Some(Point::new(
            (screen.x - center.x - self.transform.pan_x) / scale + self.image_size.0 / 2.0,
            (screen.y - center.y - self.transform.pan_y) / scale + self.image_size.1 / 2.0,
        ))
    }

    /// Convert image pixels to a screen position.
    pub fn image_to_screen(&self, image: Point) -> Point {
        let scale = self.scale();
        let center = self.center();
        Point::new(
            center.x + self.transform.pan_x + (image.x - self.image_size.0 / 2.0) * scale,
            center.y + self.transform.pan_y + (image.y - self.image_size.1 / 2.0) * scale,
        )
    }

    /// Whether an image-space point lies on the image.
    pub fn contains_image_point(&self, point: Point) -> bool {
        point.x >= 0.0 && point.y >= 0.0 && point.x <= self.image_size.0 && point.y <= self.image_size.1
    }

    /// Convert a screen-pixel distance to image pixels at the current zoom.
    pub fn screen_distance_to_image(&self, distance: f64) -> f64 {
        let scale = self.scale();
        if scale > 0.0 { distance / scale } else { distance }
    }
}
