// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera Geo: geographic coordinates and map projections.
//!
//! This crate is the geometric collaborator consumed by the tile index and painter:
//!
//! - [`LatLon`]: a latitude/longitude pair in degrees.
//! - [`clamp_lat`] / [`clamp_lon`]: keep coordinates a small epsilon away from the
//!   poles and the antimeridian so projected tile outlines never degenerate.
//! - [`great_circle_distance`]: haversine distance on a sphere.
//! - [`Projection`]: a deterministic `project`/`unproject` pair plus a ground
//!   distance metric, with three implementations:
//!   [`PlateCarree`], [`Mercator`], and [`TangentPlane`].
//!
//! Plane coordinates are [`kurbo::Point`]s. Projections are expected to be
//! orientation preserving in a y-up plane: east maps to +x and north maps to +y.
//!
//! # Example
//!
//! ```rust
//! use tessera_geo::{LatLon, PlateCarree, Projection};
//!
//! let proj = PlateCarree::new();
//! let p = proj.project(LatLon::new(10.0, 20.0));
//! assert_eq!((p.x, p.y), (20.0, 10.0));
//!
//! let back = proj.unproject(p);
//! assert_eq!(back, LatLon::new(10.0, 20.0));
//! ```

mod latlon;
mod projection;
mod tangent;

pub use latlon::{
    ANTIMERIDIAN_EPSILON, EARTH_RADIUS_M, LatLon, clamp_lat, clamp_lon, great_circle_distance,
};
pub use projection::{Mercator, PlateCarree, Projection};
pub use tangent::TangentPlane;
