// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The projection contract and the simple cylindrical projections.

use core::f64::consts::FRAC_PI_4;
use core::fmt::Debug;

use kurbo::Point;

use crate::latlon::{EARTH_RADIUS_M, LatLon, great_circle_distance};

/// A map projection between geographic positions and plane coordinates.
///
/// Implementations must be deterministic and free of interior mutation for the
/// duration of a visibility computation: the tile index samples them many times
/// and assumes the answers are consistent.
pub trait Projection: Debug + Send + Sync {
    /// Project a geographic position onto the plane.
    fn project(&self, at: LatLon) -> Point;

    /// Map a plane point back to a geographic position.
    fn unproject(&self, point: Point) -> LatLon;

    /// Ground distance between two positions.
    ///
    /// Zoom level selection compares this against tile length scales, so both must
    /// use the same unit. The default is the great-circle distance in meters.
    fn ground_distance(&self, a: LatLon, b: LatLon) -> f64 {
        great_circle_distance(a, b, EARTH_RADIUS_M)
    }
}

/// Equirectangular projection: `x = lon · k`, `y = lat · k`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlateCarree {
    units_per_degree: f64,
}

impl PlateCarree {
    /// Plane units are degrees.
    pub const fn new() -> Self {
        Self {
            units_per_degree: 1.0,
        }
    }

    /// Use `units_per_degree` plane units for each degree of latitude or longitude.
    pub fn with_units_per_degree(units_per_degree: f64) -> Self {
        debug_assert!(
            units_per_degree > 0.0,
            "units_per_degree must be strictly positive"
        );
        Self { units_per_degree }
    }

    /// Plane units per degree.
    pub const fn units_per_degree(&self) -> f64 {
        self.units_per_degree
    }
}

impl Default for PlateCarree {
    fn default() -> Self {
        Self::new()
    }
}

impl Projection for PlateCarree {
    fn project(&self, at: LatLon) -> Point {
        Point::new(at.lon * self.units_per_degree, at.lat * self.units_per_degree)
    }

    fn unproject(&self, point: Point) -> LatLon {
        LatLon::new(
            point.y / self.units_per_degree,
            point.x / self.units_per_degree,
        )
    }
}

/// Spherical Mercator projection with plane units equal to the sphere's radius units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Mercator {
    radius: f64,
}

impl Mercator {
    /// Mercator on a sphere of [`EARTH_RADIUS_M`]; plane units are meters at the equator.
    pub const fn new() -> Self {
        Self {
            radius: EARTH_RADIUS_M,
        }
    }

    /// Mercator on a sphere of the given radius.
    pub fn with_radius(radius: f64) -> Self {
        debug_assert!(radius > 0.0, "radius must be strictly positive");
        Self { radius }
    }

    /// Sphere radius.
    pub const fn radius(&self) -> f64 {
        self.radius
    }
}

impl Default for Mercator {
    fn default() -> Self {
        Self::new()
    }
}

impl Projection for Mercator {
    fn project(&self, at: LatLon) -> Point {
        let x = self.radius * at.lon_rad();
        let y = self.radius * (FRAC_PI_4 + 0.5 * at.lat_rad()).tan().ln();
        Point::new(x, y)
    }

    fn unproject(&self, point: Point) -> LatLon {
        let lat = 2.0 * (point.y / self.radius).exp().atan() - 2.0 * FRAC_PI_4;
        let lon = point.x / self.radius;
        LatLon::from_radians(lat, lon)
    }

    fn ground_distance(&self, a: LatLon, b: LatLon) -> f64 {
        great_circle_distance(a, b, self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn plate_carree_scales_degrees() {
        let proj = PlateCarree::with_units_per_degree(2.0);
        let p = proj.project(LatLon::new(-10.0, 30.0));
        assert_eq!(p, Point::new(60.0, -20.0), "x is longitude, y is latitude");
        assert_eq!(proj.unproject(p), LatLon::new(-10.0, 30.0), "roundtrip");
    }

    #[test]
    fn mercator_equator_and_roundtrip() {
        let proj = Mercator::new();
        let on_equator = proj.project(LatLon::new(0.0, 45.0));
        assert_abs_diff_eq!(on_equator.y, 0.0, epsilon = 1e-6);

        let at = LatLon::new(60.0, -135.0);
        let back = proj.unproject(proj.project(at));
        assert_abs_diff_eq!(back.lat, at.lat, epsilon = 1e-9);
        assert_abs_diff_eq!(back.lon, at.lon, epsilon = 1e-9);
    }

    #[test]
    fn mercator_is_finite_near_the_poles_after_clamping() {
        let proj = Mercator::new();
        let p = proj.project(LatLon::new(90.0, 0.0).clamped());
        assert!(p.y.is_finite(), "clamped pole must project to a finite point");
        assert!(p.y > 0.0, "north maps to +y");
    }

    #[test]
    fn mercator_ground_distance_uses_its_radius() {
        let proj = Mercator::with_radius(1.0);
        let d = proj.ground_distance(LatLon::new(0.0, 0.0), LatLon::new(0.0, 90.0));
        assert_abs_diff_eq!(d, core::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }
}
