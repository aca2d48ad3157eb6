// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tile keys and key enumeration helpers.

use core::fmt;
use core::hash::{Hash, Hasher};

use tessera_geo::LatLon;
use thiserror::Error;

/// Reasons a [`SpatialKey`] or [`KeyGrid`] can be rejected.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum KeyError {
    /// A bound or the length scale is NaN or infinite.
    #[error("tile key values must be finite")]
    NonFinite,
    /// `min_lat > max_lat`.
    #[error("inverted latitude range {min}..{max}")]
    InvertedLatitude {
        /// Southern bound.
        min: f64,
        /// Northern bound.
        max: f64,
    },
    /// `min_lon > max_lon`; tiles may not wrap across the antimeridian.
    #[error("inverted longitude range {min}..{max} (tiles may not straddle the antimeridian)")]
    InvertedLongitude {
        /// Western bound.
        min: f64,
        /// Eastern bound.
        max: f64,
    },
    /// A latitude outside `[-90, 90]`.
    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    /// A longitude outside `[-180, 180]`.
    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    /// A grid cell size that is not strictly positive.
    #[error("grid cell size must be strictly positive, got {0}")]
    InvalidCellSize(f64),
}

/// Identifies one tile: its geographic bounding box plus the zoom level it belongs to.
///
/// All keys sharing a `length_scale` form one zoom level; larger scales are coarser.
/// Keys are validated on construction, so every live key is finite, non-inverted, and
/// inside the globe. Equality and hashing are by value over all five fields.
#[derive(Copy, Clone, Debug)]
pub struct SpatialKey {
    length_scale: f64,
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl SpatialKey {
    /// Create a key. Bounds are in degrees.
    pub fn new(
        length_scale: f64,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Self, KeyError> {
        if ![length_scale, min_lat, max_lat, min_lon, max_lon]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(KeyError::NonFinite);
        }
        if min_lat > max_lat {
            return Err(KeyError::InvertedLatitude {
                min: min_lat,
                max: max_lat,
            });
        }
        if min_lon > max_lon {
            return Err(KeyError::InvertedLongitude {
                min: min_lon,
                max: max_lon,
            });
        }
        for lat in [min_lat, max_lat] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(KeyError::LatitudeOutOfRange(lat));
            }
        }
        for lon in [min_lon, max_lon] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(KeyError::LongitudeOutOfRange(lon));
            }
        }
        Ok(Self {
            length_scale,
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Zoom level discriminator.
    pub const fn length_scale(&self) -> f64 {
        self.length_scale
    }

    /// Southern bound in degrees.
    pub const fn min_lat(&self) -> f64 {
        self.min_lat
    }

    /// Northern bound in degrees.
    pub const fn max_lat(&self) -> f64 {
        self.max_lat
    }

    /// Western bound in degrees.
    pub const fn min_lon(&self) -> f64 {
        self.min_lon
    }

    /// Eastern bound in degrees.
    pub const fn max_lon(&self) -> f64 {
        self.max_lon
    }

    /// Corners in `[sw, se, ne, nw]` order, clamped away from the poles and antimeridian.
    pub fn corners(&self) -> [LatLon; 4] {
        [
            LatLon::new(self.min_lat, self.min_lon).clamped(),
            LatLon::new(self.min_lat, self.max_lon).clamped(),
            LatLon::new(self.max_lat, self.max_lon).clamped(),
            LatLon::new(self.max_lat, self.min_lon).clamped(),
        ]
    }

    /// Center of the bounding box.
    pub fn center(&self) -> LatLon {
        LatLon::new(
            0.5 * (self.min_lat + self.max_lat),
            0.5 * (self.min_lon + self.max_lon),
        )
    }

    /// Whether the bounding box contains `at` (edges inclusive).
    pub fn contains(&self, at: LatLon) -> bool {
        (self.min_lat..=self.max_lat).contains(&at.lat)
            && (self.min_lon..=self.max_lon).contains(&at.lon)
    }

    fn bits(&self) -> [u64; 5] {
        // `-0.0 == 0.0`, so both must hash the same.
        let norm = |v: f64| if v == 0.0 { 0_u64 } else { v.to_bits() };
        [
            norm(self.length_scale),
            norm(self.min_lat),
            norm(self.max_lat),
            norm(self.min_lon),
            norm(self.max_lon),
        ]
    }
}

impl PartialEq for SpatialKey {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for SpatialKey {}

impl Hash for SpatialKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl fmt::Display for SpatialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L{} [{}, {}]x[{}, {}]",
            self.length_scale, self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

/// Enumerates a regular latitude/longitude grid of keys for one zoom level.
///
/// Data sources typically build their key set as one grid per level, each
/// with its own cell size and length scale. The last row and column are clipped to
/// the grid bounds.
///
/// ```rust
/// use tessera_index::KeyGrid;
///
/// let keys = KeyGrid::new(1_000.0, 90.0).keys().unwrap();
/// assert_eq!(keys.len(), 2 * 4);
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KeyGrid {
    length_scale: f64,
    cell_lat: f64,
    cell_lon: f64,
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl KeyGrid {
    /// A whole-globe grid of square `cell_deg` cells at `length_scale`.
    pub fn new(length_scale: f64, cell_deg: f64) -> Self {
        Self {
            length_scale,
            cell_lat: cell_deg,
            cell_lon: cell_deg,
            min_lat: -90.0,
            max_lat: 90.0,
            min_lon: -180.0,
            max_lon: 180.0,
        }
    }

    /// Use distinct latitude and longitude cell sizes.
    #[must_use]
    pub fn with_cell_size(mut self, lat_deg: f64, lon_deg: f64) -> Self {
        self.cell_lat = lat_deg;
        self.cell_lon = lon_deg;
        self
    }

    /// Restrict the grid to a geographic box.
    #[must_use]
    pub fn with_bounds(mut self, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        self.min_lat = min_lat;
        self.max_lat = max_lat;
        self.min_lon = min_lon;
        self.max_lon = max_lon;
        self
    }

    /// Enumerate the keys row by row, south to north and west to east.
    pub fn keys(&self) -> Result<Vec<SpatialKey>, KeyError> {
        for cell in [self.cell_lat, self.cell_lon] {
            if !(cell.is_finite() && cell > 0.0) {
                return Err(KeyError::InvalidCellSize(cell));
            }
        }
        // Validates the outer bounds.
        SpatialKey::new(
            self.length_scale,
            self.min_lat,
            self.max_lat,
            self.min_lon,
            self.max_lon,
        )?;

        let rows = steps(self.min_lat, self.max_lat, self.cell_lat);
        let cols = steps(self.min_lon, self.max_lon, self.cell_lon);
        let mut out = Vec::with_capacity(rows.len() * cols.len());
        for &(lat0, lat1) in &rows {
            for &(lon0, lon1) in &cols {
                out.push(SpatialKey::new(self.length_scale, lat0, lat1, lon0, lon1)?);
            }
        }
        Ok(out)
    }
}

fn steps(min: f64, max: f64, cell: f64) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    let mut i = 0_u32;
    loop {
        let lo = min + f64::from(i) * cell;
        if lo >= max {
            break;
        }
        let hi = (min + f64::from(i + 1) * cell).min(max);
        out.push((lo, hi));
        i += 1;
    }
    out
}
