// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera Painter: keep a renderer supplied with the tiles a viewport needs.
//!
//! A [`TilePainter`] ties together a host's [`TileSource`] (which tiles exist and
//! how to load one), a [`TileRenderer`] (what to do with the loaded ones), and a
//! [`Projection`](tessera_geo::Projection). On each [`paint`](TilePainter::paint):
//!
//! 1. the first call indexes every key of the source under the projection;
//! 2. an unchanged viewport with nothing newly loaded returns immediately;
//! 3. otherwise the visible tiles at the best zoom level are looked up in a
//!    [`TileCache`](tessera_cache::TileCache), which queues loads for the
//!    missing ones on a [`WorkerPool`](tessera_cache::WorkerPool);
//! 4. the tiles that are ready are handed to the renderer, even if some are
//!    still missing;
//! 5. later paints pick up tiles as they arrive, driven either by cache events
//!    ([`RefreshMode::Notify`], the default) or by recomputing every frame
//!    until the set is complete ([`RefreshMode::Poll`]).
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use kurbo::Rect;
//! use tessera_cache::{LoadError, WorkerPool};
//! use tessera_geo::PlateCarree;
//! use tessera_index::{KeyGrid, SpatialKey, Viewport};
//! use tessera_painter::{PainterConfig, TilePainter, TileSource};
//!
//! struct Labels;
//!
//! impl TileSource<String> for Labels {
//!     fn all_keys(&self) -> Vec<SpatialKey> {
//!         KeyGrid::new(1.0, 30.0).keys().unwrap()
//!     }
//!
//!     fn load_tile_data(&self, key: &SpatialKey) -> Result<String, LoadError> {
//!         Ok(key.to_string())
//!     }
//! }
//!
//! let pool = WorkerPool::new(2).unwrap();
//! let mut drawn = 0;
//! let mut painter = TilePainter::new(
//!     Arc::new(Labels),
//!     |tiles: Vec<(SpatialKey, Arc<String>)>| drawn = tiles.len(),
//!     Arc::new(PlateCarree::new()),
//!     &pool,
//!     PainterConfig::default(),
//! )
//! .unwrap();
//!
//! let viewport = Viewport::from_pixel_size(Rect::new(5.0, 5.0, 55.0, 55.0), 800.0, 800.0);
//! while !painter.paint(&viewport).is_complete() {
//!     std::thread::sleep(Duration::from_millis(1));
//! }
//! drop(painter);
//! assert_eq!(drawn, 2 * 2);
//! ```

mod config;
mod painter;
mod source;

use tessera_cache::PoolError;
use thiserror::Error;

pub use config::{ConfigError, PainterConfig, RefreshMode};
pub use painter::{PaintReport, TilePainter};
pub use source::{TileRenderer, TileSource};

/// Errors from creating a [`TilePainter`].
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration was rejected.
    #[error("invalid painter configuration")]
    InvalidConfig(#[from] ConfigError),
    /// The worker pool could not be started.
    #[error("worker pool unavailable")]
    Pool(#[from] PoolError),
}
