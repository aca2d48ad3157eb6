// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera Index: which geographic tiles are visible, and at which zoom level.
//!
//! A tile is named by a [`SpatialKey`]: a latitude/longitude box plus a length
//! scale that identifies its zoom level. Given a fixed key set and a
//! [`Projection`](tessera_geo::Projection), a [`VisibilityIndex`]:
//!
//! - projects every key into a sampled screen-space outline ([`VisibilityPolygon`]),
//!   dropping outlines that are not finite, flat, or inverted;
//! - groups keys by length scale ([`ZoomLevels`]);
//! - picks the level whose scale best matches the ground distance a [`Viewport`]
//!   spans;
//! - answers "which tiles at that level intersect the viewport?"
//!
//! Each level keeps its outlines' bounds in a broad-phase [`Backend`], and
//! candidates are confirmed with an exact outline/rectangle test.
//!
//! ## Features
//!
//! - `backend_grid` *(default)*: enables the uniform grid backend
//!   ([`backends::Grid`]), backed by `smallvec` cell lists. Without it every level
//!   uses a linear scan.
//!
//! # Example
//!
//! ```rust
//! use kurbo::Rect;
//! use tessera_geo::PlateCarree;
//! use tessera_index::{IndexConfig, KeyGrid, Viewport, VisibilityIndex};
//!
//! let proj = PlateCarree::new();
//!
//! // Two zoom levels over the whole globe; scales are ground distances in meters.
//! let mut keys = KeyGrid::new(500_000.0, 5.0).keys().unwrap();
//! keys.extend(KeyGrid::new(5_000_000.0, 45.0).keys().unwrap());
//! let index = VisibilityIndex::build(keys, &proj, &IndexConfig::default());
//! assert_eq!(index.zoom_levels().as_slice(), &[500_000.0, 5_000_000.0]);
//!
//! // A wide view selects the coarse level.
//! let world = Viewport::from_pixel_size(Rect::new(-180.0, -90.0, 180.0, 90.0), 1024.0, 512.0);
//! let visible = index.visible_tiles(&world, 0.02, &proj);
//! assert_eq!(visible.length_scale, Some(5_000_000.0));
//! assert_eq!(visible.keys.len(), 4 * 8);
//!
//! // A close view selects the fine level.
//! let close = Viewport::from_pixel_size(Rect::new(1.0, 1.0, 9.0, 9.0), 1024.0, 1024.0);
//! let visible = index.visible_tiles(&close, 0.02, &proj);
//! assert_eq!(visible.length_scale, Some(500_000.0));
//! assert_eq!(visible.keys.len(), 2 * 2);
//! ```

mod backend;
pub mod backends;
mod index;
mod key;
mod polygon;
pub(crate) mod util;
mod viewport;
mod zoom;

pub use backend::Backend;
pub use index::{BackendKind, IndexConfig, IndexConfigError, VisibilityIndex, VisibleTiles};
pub use key::{KeyError, KeyGrid, SpatialKey};
pub use polygon::{Degenerate, VisibilityPolygon};
pub use viewport::Viewport;
pub use zoom::ZoomLevels;
