// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Latitude/longitude values and spherical helpers.

/// Mean radius of the Earth in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Distance, in degrees, kept between clamped coordinates and the poles or the antimeridian.
pub const ANTIMERIDIAN_EPSILON: f64 = 1e-5;

/// A geographic position in degrees.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LatLon {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl LatLon {
    /// Create a position from degrees.
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Create a position from radians.
    #[inline]
    pub fn from_radians(lat: f64, lon: f64) -> Self {
        Self::new(lat.to_degrees(), lon.to_degrees())
    }

    /// Latitude in radians.
    #[inline]
    pub fn lat_rad(self) -> f64 {
        self.lat.to_radians()
    }

    /// Longitude in radians.
    #[inline]
    pub fn lon_rad(self) -> f64 {
        self.lon.to_radians()
    }

    /// Both components are finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// This position with [`clamp_lat`] and [`clamp_lon`] applied.
    #[inline]
    pub fn clamped(self) -> Self {
        Self::new(clamp_lat(self.lat), clamp_lon(self.lon))
    }

    /// Great-circle distance to `other` on a sphere of the given radius.
    #[inline]
    pub fn distance_to(self, other: Self, radius: f64) -> f64 {
        great_circle_distance(self, other, radius)
    }
}

/// Clamp a latitude to `[-90 + ε, 90 - ε]`.
#[inline]
pub fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-90.0 + ANTIMERIDIAN_EPSILON, 90.0 - ANTIMERIDIAN_EPSILON)
}

/// Clamp a longitude to `[-180 + ε, 180 - ε]`.
#[inline]
pub fn clamp_lon(lon: f64) -> f64 {
    lon.clamp(-180.0 + ANTIMERIDIAN_EPSILON, 180.0 - ANTIMERIDIAN_EPSILON)
}

/// Haversine distance between two positions on a sphere of the given radius.
///
/// The result is in the units of `radius`.
pub fn great_circle_distance(a: LatLon, b: LatLon, radius: f64) -> f64 {
    let phi1 = a.lat_rad();
    let phi2 = b.lat_rad();
    let half_dphi = 0.5 * (phi2 - phi1);
    let half_dlambda = 0.5 * (b.lon - a.lon).to_radians();
    let h = half_dphi.sin().powi(2) + phi1.cos() * phi2.cos() * half_dlambda.sin().powi(2);
    // Rounding can push `h` slightly above 1 for antipodal points.
    2.0 * radius * h.sqrt().min(1.0).asin()
}
