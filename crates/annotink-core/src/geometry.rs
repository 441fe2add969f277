//! Canvas geometry and the image/canvas/window transform pipeline.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Default padding applied around the image so that objects with negative or
/// near-edge coordinates remain paintable.
pub const DEFAULT_OFFSET: f64 = 100.0;

/// A snapshot of the canvas view state.
///
/// Object coordinates in the upstream model live in image space; they pass
/// through `to_canvas` before touching the scene and through `to_window`
/// before being compared with pointer positions. Geometry values are replaced
/// wholesale on every view change, never mutated field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Current zoom level.
    pub scale: f64,
    /// Canvas rotation in degrees. Multiples of 90 are the common case,
    /// arbitrary values are supported.
    pub angle: f64,
    /// Vertical position of the canvas inside the viewport.
    pub top: f64,
    /// Horizontal position of the canvas inside the viewport.
    pub left: f64,
    /// Fixed padding between image space and canvas space.
    pub offset: f64,
    /// Size of the canvas surface (image plus padding).
    pub canvas: Size,
    /// Size of the source image.
    pub image: Size,
    /// Grid cell size.
    pub grid: Size,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            scale: 1.0,
            angle: 0.0,
            top: 0.0,
            left: 0.0,
            offset: DEFAULT_OFFSET,
            canvas: Size::ZERO,
            image: Size::ZERO,
            grid: Size::new(100.0, 100.0),
        }
    }
}

impl Geometry {
    /// Create a geometry for an image of the given size, with the default
    /// padding on every side.
    pub fn for_image(image: Size) -> Self {
        Self {
            canvas: Size::new(
                image.width + DEFAULT_OFFSET * 2.0,
                image.height + DEFAULT_OFFSET * 2.0,
            ),
            image,
            ..Self::default()
        }
    }

    /// Translate a flat `[x0, y0, x1, y1, ...]` point array from image space
    /// to canvas space by applying the fixed padding offset.
    pub fn to_canvas(&self, points: &[f64]) -> Vec<f64> {
        debug_assert!(points.len() % 2 == 0, "point array must hold x/y pairs");
        points.iter().map(|coord| coord + self.offset).collect()
    }

    /// Translate a flat point array from canvas space back to image space.
    /// Exact inverse of [`Geometry::to_canvas`].
    pub fn from_canvas(&self, points: &[f64]) -> Vec<f64> {
        debug_assert!(points.len() % 2 == 0, "point array must hold x/y pairs");
        points.iter().map(|coord| coord - self.offset).collect()
    }

    /// The affine transform mapping canvas space to window (viewport) space.
    ///
    /// The canvas surface is scaled, rotated about its scaled center, and
    /// positioned at `(left, top)` inside the viewport.
    pub fn window_transform(&self) -> Affine {
        let center = Point::new(
            self.canvas.width * self.scale / 2.0,
            self.canvas.height * self.scale / 2.0,
        );
        Affine::translate(Vec2::new(self.left, self.top))
            * Affine::rotate_about(self.angle.to_radians(), center)
            * Affine::scale(self.scale)
    }

    /// Map a flat canvas-space point array into window coordinates.
    pub fn to_window(&self, points: &[f64]) -> Vec<f64> {
        map_points(points, self.window_transform())
    }

    /// Map a flat window-space point array (e.g. pointer events) back into
    /// canvas coordinates. Inverse of [`Geometry::to_window`] up to float
    /// tolerance.
    pub fn from_window(&self, points: &[f64]) -> Vec<f64> {
        map_points(points, self.window_transform().inverse())
    }

    /// Map a single canvas-space point into window coordinates.
    pub fn point_to_window(&self, point: Point) -> Point {
        self.window_transform() * point
    }

    /// Map a single window-space point into canvas coordinates.
    pub fn point_from_window(&self, point: Point) -> Point {
        self.window_transform().inverse() * point
    }
}

/// Map a flat point array through an affine transform.
fn map_points(points: &[f64], affine: Affine) -> Vec<f64> {
    debug_assert!(points.len() % 2 == 0, "point array must hold x/y pairs");
    let mut mapped = Vec::with_capacity(points.len());
    for pair in points.chunks_exact(2) {
        let p = affine * Point::new(pair[0], pair[1]);
        mapped.push(p.x);
        mapped.push(p.y);
    }
    mapped
}

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_angle(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// Angle of the direction vector `from -> to` in degrees, normalized into
/// `[0, 360)`. Coincident points yield 0 by convention, never NaN.
pub fn direction_angle(from: Point, to: Point) -> f64 {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
        return 0.0;
    }
    normalize_angle(dy.atan2(dx).to_degrees())
}
