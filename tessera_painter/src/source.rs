// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-supplied capabilities: where tiles come from and where they go.

use std::sync::Arc;

use tessera_cache::{LoadError, Loader};
use tessera_index::SpatialKey;

/// A tiled data set.
///
/// [`all_keys`](Self::all_keys) is called on the render thread whenever the
/// index is (re)built. [`load_tile_data`](Self::load_tile_data) is called on
/// pool workers, concurrently for different keys.
pub trait TileSource<V>: Send + Sync + 'static {
    /// Every tile of every zoom level.
    fn all_keys(&self) -> Vec<SpatialKey>;

    /// Produce the payload of one tile.
    fn load_tile_data(&self, key: &SpatialKey) -> Result<V, LoadError>;
}

/// Receives the tiles that are ready to draw.
pub trait TileRenderer<V> {
    /// Replace everything previously handed over with `tiles`.
    ///
    /// `tiles` may be a strict subset of the visible set while loads are in
    /// flight, and may be empty.
    fn replace_tile_data(&mut self, tiles: Vec<(SpatialKey, Arc<V>)>);
}

impl<V, F> TileRenderer<V> for F
where
    F: FnMut(Vec<(SpatialKey, Arc<V>)>),
{
    fn replace_tile_data(&mut self, tiles: Vec<(SpatialKey, Arc<V>)>) {
        self(tiles);
    }
}

/// Adapts a [`TileSource`] to the cache's loader contract.
pub(crate) struct SourceLoader<V>(pub(crate) Arc<dyn TileSource<V>>);

impl<V: Send + Sync + 'static> Loader<SpatialKey, V> for SourceLoader<V> {
    fn load(&self, key: &SpatialKey) -> Result<V, LoadError> {
        self.0.load_tile_data(key)
    }
}
