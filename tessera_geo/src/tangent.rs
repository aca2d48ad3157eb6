// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stereographic projection onto a plane tangent to the Earth.

use kurbo::Point;

use crate::latlon::{EARTH_RADIUS_M, LatLon};
use crate::projection::Projection;

type Vec3 = [f64; 3];

#[inline]
fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
fn unit_sphere(at: LatLon) -> Vec3 {
    let (lat, lon) = (at.lat_rad(), at.lon_rad());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// A plane tangent to the Earth at a reference position.
///
/// Plane units are meters. The reference position maps to `origin`, +x points
/// local east and +y points local north. The mapping is stereographic: it is
/// conformal and well behaved over a hemisphere, but tiles near the far side of
/// the globe are badly skewed, which is why the tile index rejects inverted
/// outlines.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TangentPlane {
    reference: LatLon,
    origin: Point,
    radius: f64,
    normal: Vec3,
    east: Vec3,
    north: Vec3,
}

impl TangentPlane {
    /// Tangent plane at `reference`, which maps to `(0, 0)`.
    pub fn new(reference: LatLon) -> Self {
        Self::with_origin(reference, Point::ZERO)
    }

    /// Tangent plane at `reference`, which maps to `origin`.
    pub fn with_origin(reference: LatLon, origin: Point) -> Self {
        let normal = unit_sphere(reference);
        let [x, y, _] = normal;
        let len = x.hypot(y);
        // At the poles local east is undefined; pick the +y axis.
        let east = if len > 0.0 {
            [-y / len, x / len, 0.0]
        } else {
            [0.0, 1.0, 0.0]
        };
        let north = cross(normal, east);
        Self {
            reference,
            origin,
            radius: EARTH_RADIUS_M,
            normal,
            east,
            north,
        }
    }

    /// The point of tangency.
    pub const fn reference(&self) -> LatLon {
        self.reference
    }

    /// Plane coordinates of the point of tangency.
    pub const fn origin(&self) -> Point {
        self.origin
    }
}

impl Projection for TangentPlane {
    fn project(&self, at: LatLon) -> Point {
        let p = unit_sphere(at);
        let div = 1.0 + dot(p, self.normal);
        let scale = 2.0 * self.radius / div;
        Point::new(
            self.origin.x + scale * dot(p, self.east),
            self.origin.y + scale * dot(p, self.north),
        )
    }

    fn unproject(&self, point: Point) -> LatLon {
        let a = (point.x - self.origin.x) / self.radius;
        let b = (point.y - self.origin.y) / self.radius;
        let beta = 4.0 / (4.0 + a * a + b * b);
        let mut p = [0.0; 3];
        for (i, out) in p.iter_mut().enumerate() {
            let on_plane = self.normal[i] + a * self.east[i] + b * self.north[i];
            *out = beta * on_plane + (beta - 1.0) * self.normal[i];
        }
        LatLon::from_radians(p[2].clamp(-1.0, 1.0).asin(), p[1].atan2(p[0]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reference_maps_to_origin() {
        let plane = TangentPlane::with_origin(LatLon::new(40.0, -70.0), Point::new(5.0, 7.0));
        let p = plane.project(LatLon::new(40.0, -70.0));
        assert_abs_diff_eq!(p.x, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 7.0, epsilon = 1e-6);
    }

    #[test]
    fn axes_point_east_and_north() {
        let plane = TangentPlane::new(LatLon::new(10.0, 20.0));
        let east = plane.project(LatLon::new(10.0, 20.1));
        let north = plane.project(LatLon::new(10.1, 20.0));
        assert!(east.x > 0.0, "east must map to +x, got {east:?}");
        assert_abs_diff_eq!(east.y, 0.0, epsilon = 50.0);
        assert!(north.y > 0.0, "north must map to +y, got {north:?}");
        assert_abs_diff_eq!(north.x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn roundtrip_near_reference() {
        let plane = TangentPlane::new(LatLon::new(-33.0, 151.0));
        for at in [
            LatLon::new(-33.0, 151.0),
            LatLon::new(-30.5, 155.0),
            LatLon::new(-40.0, 140.0),
        ] {
            let back = plane.unproject(plane.project(at));
            assert_abs_diff_eq!(back.lat, at.lat, epsilon = 1e-9);
            assert_abs_diff_eq!(back.lon, at.lon, epsilon = 1e-9);
        }
    }

    #[test]
    fn polar_reference_is_well_defined() {
        let plane = TangentPlane::new(LatLon::new(90.0, 0.0));
        let p = plane.project(LatLon::new(80.0, 0.0));
        assert!(p.x.is_finite() && p.y.is_finite(), "polar plane must be finite");
    }
}
