// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The visible region of the plane.

use kurbo::{Point, Rect, Vec2};
use tessera_geo::Projection;

/// Axis bounds in plane units plus the pixel density of the surface showing them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    bounds: Rect,
    pixels_per_unit: Vec2,
}

impl Viewport {
    /// Create a viewport from plane bounds and pixels per plane unit on each axis.
    pub fn new(bounds: Rect, pixels_per_unit_x: f64, pixels_per_unit_y: f64) -> Self {
        Self {
            bounds: bounds.abs(),
            pixels_per_unit: Vec2::new(pixels_per_unit_x, pixels_per_unit_y),
        }
    }

    /// Create a viewport showing `bounds` on a `width_px` × `height_px` surface.
    pub fn from_pixel_size(bounds: Rect, width_px: f64, height_px: f64) -> Self {
        let bounds = bounds.abs();
        Self::new(
            bounds,
            width_px / bounds.width(),
            height_px / bounds.height(),
        )
    }

    /// Plane bounds, with `x0 <= x1` and `y0 <= y1`.
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Pixels per plane unit on each axis.
    pub const fn pixels_per_unit(&self) -> Vec2 {
        self.pixels_per_unit
    }

    /// Center of the bounds.
    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    /// The bounds grown by `fraction` of the width and height on each side.
    pub fn padded(&self, fraction: f64) -> Rect {
        self.bounds
            .inflate(self.bounds.width() * fraction, self.bounds.height() * fraction)
    }

    /// Whether every edge of `other` is within `epsilon` of the matching edge of the bounds.
    pub fn same_bounds(&self, other: &Rect, epsilon: f64) -> bool {
        let a = self.bounds;
        let b = other.abs();
        (a.x0 - b.x0).abs() <= epsilon
            && (a.y0 - b.y0).abs() <= epsilon
            && (a.x1 - b.x1).abs() <= epsilon
            && (a.y1 - b.y1).abs() <= epsilon
    }

    /// Ground distance from the center to the corner of the viewport.
    ///
    /// The ground size of one pixel at the center, measured with
    /// [`Projection::ground_distance`], is scaled by the center-to-corner
    /// distance in pixels. The result may be NaN when the projection cannot
    /// unproject the center.
    pub fn ground_span(&self, projection: &dyn Projection) -> f64 {
        let ppu = self.pixels_per_unit;
        let center = self.center();
        let one_pixel = center + Vec2::new(1.0 / ppu.x, 1.0 / ppu.y);
        let per_pixel =
            projection.ground_distance(projection.unproject(center), projection.unproject(one_pixel));
        let half_diagonal_px =
            (0.5 * self.bounds.width() * ppu.x).hypot(0.5 * self.bounds.height() * ppu.y);
        per_pixel * half_diagonal_px
    }
}
