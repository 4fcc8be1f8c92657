//! Pixel-space geometry used by the drawing tools.
//!
//! Everything here works in image pixel coordinates. Conversion to metres
//! happens in [`crate::units`].

use serde::{Deserialize, Serialize};

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        distance(*self, *other)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Euclidean distance between two points, in pixels.
pub fn distance(p1: Point, p2: Point) -> f64 {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    (dx * dx + dy * dy).sqrt()
}

/// Polygon area in square pixels using the Shoelace formula.
///
/// The sum wraps around from the last vertex to the first and the sign is
/// discarded, so winding direction does not matter. Self-intersecting input
/// is not detected; its area is computed as-is. Returns 0 for fewer than
/// three vertices.
pub fn polygon_area(vertices: &[Point]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }

    let n = vertices.len();
    let twice_area: f64 = (0..n)
        .map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();

    twice_area.abs() / 2.0
}

/// Arithmetic mean of the vertices.
///
/// This is not the area-weighted centroid; it is only used to place labels.
/// Returns the origin for an empty slice.
pub fn centroid(vertices: &[Point]) -> Point {
    if vertices.is_empty() {
        return Point::default();
    }

    let n = vertices.len() as f64;
    let (sum_x, sum_y) = vertices
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sum_x / n, sum_y / n)
}

/// Midpoint of a segment.
pub fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Shortest distance from `p` to the segment `a`–`b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return distance(p, a);
    }

    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    distance(p, Point::new(a.x + t * dx, a.y + t * dy))
}

/// Check if a point is inside a closed polygon (ray casting algorithm).
pub fn polygon_contains(vertices: &[Point], point: Point) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = vertices.len();

    let mut j = n - 1;
    for i in 0..n {
        let vi = vertices[i];
        let vj = vertices[j];

        if ((vi.y > point.y) != (vj.y > point.y))
            && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn test_distance_345() {
        let d = distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
        assert!((d - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Point::new(-2.5, 7.0);
        let b = Point::new(11.0, -3.25);
        assert_eq!(distance(a, b), distance(b, a));
        assert_eq!(a.distance_to(&b), distance(a, b));
    }

    #[test]
    fn test_unit_square_area() {
        let square = pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!((polygon_area(&square) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_area_ignores_winding() {
        let mut shape = pts(&[(0.0, 0.0), (40.0, 5.0), (35.0, 30.0), (8.0, 22.0), (3.0, 12.0)]);
        let forward = polygon_area(&shape);
        shape.reverse();
        let reversed = polygon_area(&shape);
        assert!(forward > 0.0);
        assert!((forward - reversed).abs() < EPSILON);
    }

    #[test]
    fn test_area_triangle() {
        let triangle = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        assert!((polygon_area(&triangle) - 50.0).abs() < EPSILON);
    }

    #[test]
    fn test_area_degenerate_inputs() {
        assert_eq!(polygon_area(&[]), 0.0);
        assert_eq!(polygon_area(&pts(&[(1.0, 1.0), (5.0, 5.0)])), 0.0);
        // Collinear vertices enclose nothing
        let line = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        assert!(polygon_area(&line).abs() < EPSILON);
    }

    #[test]
    fn test_area_self_intersecting_is_computed_as_is() {
        // Bow-tie: the two lobes cancel out in the signed sum
        let bowtie = pts(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)]);
        assert!(polygon_area(&bowtie).abs() < EPSILON);
    }

    #[test]
    fn test_centroid_is_vertex_mean() {
        let triangle = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let c = centroid(&triangle);
        assert!((c.x - 20.0 / 3.0).abs() < EPSILON);
        assert!((c.y - 10.0 / 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(
            midpoint(Point::new(0.0, 0.0), Point::new(4.0, -2.0)),
            Point::new(2.0, -1.0)
        );
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((distance_to_segment(Point::new(5.0, 3.0), a, b) - 3.0).abs() < EPSILON);
        // Past the end clamps to the endpoint
        assert!((distance_to_segment(Point::new(13.0, 4.0), a, b) - 5.0).abs() < EPSILON);
        // Zero-length segment
        assert!((distance_to_segment(Point::new(3.0, 4.0), a, a) - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_polygon_contains() {
        let square = pts(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        assert!(polygon_contains(&square, Point::new(50.0, 50.0)));
        assert!(!polygon_contains(&square, Point::new(150.0, 50.0)));
        assert!(!polygon_contains(&square[..2], Point::new(50.0, 0.0)));
    }
}
