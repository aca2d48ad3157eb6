// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tile painter.

use core::fmt;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use kurbo::Rect;
use tessera_cache::{CacheEvent, Lookup, TileCache, WorkerPool};
use tessera_geo::Projection;
use tessera_index::{SpatialKey, Viewport, VisibilityIndex};
use tracing::{info, trace};

use crate::Error;
use crate::config::{ConfigError, PainterConfig, RefreshMode};
use crate::source::{SourceLoader, TileRenderer, TileSource};

/// What a call to [`TilePainter::paint`] did.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PaintReport {
    /// Whether the visible set was recomputed and handed to the renderer.
    ///
    /// When `false`, nothing changed since the last recompute and the other
    /// fields repeat its numbers.
    pub recomputed: bool,
    /// The zoom level drawn, or `None` when no key survived indexing.
    pub length_scale: Option<f64>,
    /// Number of visible tiles.
    pub visible: usize,
    /// Number of visible tiles handed to the renderer.
    pub delivered: usize,
    /// Number of visible tiles still loading, failed, or backing off.
    pub missing: usize,
}

impl PaintReport {
    /// Whether every visible tile was delivered.
    pub const fn is_complete(&self) -> bool {
        self.missing == 0
    }
}

/// Drives tile visibility, loading, and delivery for one tiled data set.
///
/// Call [`paint`](Self::paint) from the render thread on every frame, or
/// whenever [`needs_repaint`](Self::needs_repaint) says so. Each paint that
/// sees a new viewport (or a newly arrived tile) recomputes the visible set,
/// asks the cache for each tile, and hands the ready ones to the renderer.
/// Loads never block the render thread.
pub struct TilePainter<V, R> {
    source: Arc<dyn TileSource<V>>,
    renderer: R,
    projection: Arc<dyn Projection>,
    cache: TileCache<SpatialKey, V>,
    events: Option<Receiver<CacheEvent<SpatialKey>>>,
    index: Option<VisibilityIndex>,
    last_viewport: Option<Rect>,
    last_report: PaintReport,
    dirty: bool,
    config: PainterConfig,
}

impl<V, R> TilePainter<V, R>
where
    V: Send + Sync + 'static,
    R: TileRenderer<V>,
{
    /// Create a painter whose loads run on `pool`.
    ///
    /// Nothing is indexed or loaded until the first [`paint`](Self::paint).
    pub fn new(
        source: Arc<dyn TileSource<V>>,
        renderer: R,
        projection: Arc<dyn Projection>,
        pool: &WorkerPool,
        config: PainterConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        let cache = TileCache::new(
            SourceLoader(Arc::clone(&source)),
            pool.clone(),
            config.cache,
        )
        .map_err(ConfigError::from)?;
        let events = match config.refresh {
            RefreshMode::Notify => Some(cache.subscribe()),
            RefreshMode::Poll => None,
        };
        Ok(Self {
            source,
            renderer,
            projection,
            cache,
            events,
            index: None,
            last_viewport: None,
            last_report: PaintReport::default(),
            dirty: false,
            config,
        })
    }

    /// Create a painter with its own [`WorkerPool`] of the default size.
    pub fn with_default_pool(
        source: Arc<dyn TileSource<V>>,
        renderer: R,
        projection: Arc<dyn Projection>,
        config: PainterConfig,
    ) -> Result<Self, Error> {
        let pool = WorkerPool::with_default_size()?;
        Self::new(source, renderer, projection, &pool, config)
    }

    /// Bring the renderer up to date with `viewport`.
    pub fn paint(&mut self, viewport: &Viewport) -> PaintReport {
        self.drain_events();
        let index = self.index.get_or_insert_with(|| {
            let keys = self.source.all_keys();
            let offered = keys.len();
            let index = VisibilityIndex::build(keys, &*self.projection, &self.config.index);
            info!(
                offered,
                retained = index.len(),
                dropped = index.dropped(),
                levels = index.zoom_levels().len(),
                "indexed tile source"
            );
            index
        });

        let unchanged = self
            .last_viewport
            .is_some_and(|last| viewport.same_bounds(&last, self.config.change_epsilon));
        if unchanged && !self.dirty {
            return PaintReport {
                recomputed: false,
                ..self.last_report
            };
        }
        self.dirty = false;
        self.last_viewport = Some(viewport.bounds());

        let visible =
            index.visible_tiles(viewport, self.config.viewport_padding, &*self.projection);
        self.cache.set_pinned(visible.keys.iter().copied());
        let mut ready = Vec::with_capacity(visible.keys.len());
        let mut missing = 0;
        let mut backing_off = false;
        for key in &visible.keys {
            match self.cache.lookup(key) {
                Lookup::Ready(value) => ready.push((*key, value)),
                Lookup::Loading => missing += 1,
                Lookup::Backoff => {
                    missing += 1;
                    backing_off = true;
                }
            }
        }
        let delivered = ready.len();
        self.renderer.replace_tile_data(ready);

        let poll = match self.config.refresh {
            RefreshMode::Poll => missing > 0,
            RefreshMode::Notify => backing_off,
        };
        if poll {
            self.last_viewport = None;
        }

        let report = PaintReport {
            recomputed: true,
            length_scale: visible.length_scale,
            visible: visible.keys.len(),
            delivered,
            missing,
        };
        trace!(?report, "painted tiles");
        self.last_report = report;
        report
    }

    /// Whether [`paint`](Self::paint) with an unchanged viewport would recompute.
    pub fn needs_repaint(&mut self) -> bool {
        self.drain_events();
        self.index.is_none() || self.last_viewport.is_none() || self.dirty
    }

    /// Replace the projection. The index is rebuilt on the next paint; loaded
    /// payloads are kept.
    pub fn set_projection(&mut self, projection: Arc<dyn Projection>) {
        self.projection = projection;
        self.invalidate_index();
    }

    /// Drop the index so the next paint asks the source for its keys again.
    pub fn invalidate_index(&mut self) {
        self.index = None;
        self.last_viewport = None;
    }

    /// The current index, if one has been built.
    pub fn index(&self) -> Option<&VisibilityIndex> {
        self.index.as_ref()
    }

    /// The payload cache.
    pub fn cache(&self) -> &TileCache<SpatialKey, V> {
        &self.cache
    }

    /// The render hook.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The render hook, mutably.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// The current projection.
    pub fn projection(&self) -> &Arc<dyn Projection> {
        &self.projection
    }

    /// The configuration the painter was created with.
    pub fn config(&self) -> &PainterConfig {
        &self.config
    }

    fn drain_events(&mut self) {
        let Some(events) = &self.events else {
            return;
        };
        for event in events.try_iter() {
            trace!(?event, "tile load finished");
            self.dirty = true;
        }
    }
}

impl<V, R> fmt::Debug for TilePainter<V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TilePainter")
            .field("projection", &self.projection)
            .field("indexed_keys", &self.index.as_ref().map(VisibilityIndex::len))
            .field("last_viewport", &self.last_viewport)
            .field("last_report", &self.last_report)
            .field("dirty", &self.dirty)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
