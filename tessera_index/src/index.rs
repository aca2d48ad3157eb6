// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-projection visibility index.

use core::cmp::Ordering;

use hashbrown::HashMap;
use kurbo::{Point, Rect};
use tessera_geo::Projection;
use thiserror::Error;
use tracing::{debug, info};

use crate::backend::Backend;
use crate::backends::FlatVec;
#[cfg(feature = "backend_grid")]
use crate::backends::Grid;
use crate::key::SpatialKey;
use crate::polygon::VisibilityPolygon;
#[cfg(feature = "backend_grid")]
use crate::util::isqrt_ceil;
use crate::viewport::Viewport;
use crate::zoom::ZoomLevels;

/// Broad-phase strategy used for each zoom level.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BackendKind {
    /// Linear scan over the level's outline bounds.
    Flat,
    /// Uniform hash grid over the level's outline bounds.
    ///
    /// With `cell_size: None` the cell size is derived from the level's extent so
    /// that roughly `√n × √n` cells cover it.
    #[cfg(feature = "backend_grid")]
    Grid {
        /// Cell edge length in plane units.
        cell_size: Option<f64>,
    },
}

impl Default for BackendKind {
    fn default() -> Self {
        #[cfg(feature = "backend_grid")]
        {
            Self::Grid { cell_size: None }
        }
        #[cfg(not(feature = "backend_grid"))]
        {
            Self::Flat
        }
    }
}

/// Invalid [`IndexConfig`] values.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum IndexConfigError {
    /// `edge_samples` was zero.
    #[error("edge_samples must be at least 1")]
    ZeroEdgeSamples,
    /// An explicit grid cell size that is not finite and strictly positive.
    #[error("grid cell size must be finite and strictly positive, got {0}")]
    InvalidCellSize(f64),
}

/// How a [`VisibilityIndex`] is built.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IndexConfig {
    /// Segments per outline edge. Default: 5.
    pub edge_samples: usize,
    /// Broad-phase backend. Default: an automatically sized grid when the
    /// `backend_grid` feature is enabled, a flat scan otherwise.
    pub backend: BackendKind,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            edge_samples: 5,
            backend: BackendKind::default(),
        }
    }
}

impl IndexConfig {
    /// Set the number of segments per outline edge.
    #[must_use]
    pub fn with_edge_samples(mut self, edge_samples: usize) -> Self {
        self.edge_samples = edge_samples;
        self
    }

    /// Set the broad-phase backend.
    #[must_use]
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Check the configuration for values the index cannot work with.
    pub fn validate(&self) -> Result<(), IndexConfigError> {
        if self.edge_samples == 0 {
            return Err(IndexConfigError::ZeroEdgeSamples);
        }
        #[cfg(feature = "backend_grid")]
        if let BackendKind::Grid {
            cell_size: Some(cell),
        } = self.backend
            && !(cell.is_finite() && cell > 0.0)
        {
            return Err(IndexConfigError::InvalidCellSize(cell));
        }
        Ok(())
    }
}

/// Result of [`VisibilityIndex::visible_tiles`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisibleTiles {
    /// The zoom level that was queried, or `None` for an empty index.
    pub length_scale: Option<f64>,
    /// Visible keys at that level, sorted by `(min_lat, min_lon)`.
    pub keys: Vec<SpatialKey>,
}

#[derive(Debug)]
enum LevelBackend {
    Flat(FlatVec),
    #[cfg(feature = "backend_grid")]
    Grid(Grid),
}

impl LevelBackend {
    #[cfg_attr(
        not(feature = "backend_grid"),
        allow(unused_variables, reason = "Only the grid sizes itself from the outlines.")
    )]
    fn new(kind: BackendKind, outlines: &[Rect]) -> Self {
        match kind {
            BackendKind::Flat => Self::Flat(FlatVec::default()),
            #[cfg(feature = "backend_grid")]
            BackendKind::Grid { cell_size } => {
                let cell = cell_size.unwrap_or_else(|| auto_cell_size(outlines));
                if cell.is_finite() && cell > 0.0 {
                    Self::Grid(Grid::new(cell))
                } else {
                    Self::Flat(FlatVec::default())
                }
            }
        }
    }

    fn insert(&mut self, slot: usize, bounds: Rect) {
        match self {
            Self::Flat(b) => b.insert(slot, bounds),
            #[cfg(feature = "backend_grid")]
            Self::Grid(b) => b.insert(slot, bounds),
        }
    }

    fn visit_point<F: FnMut(usize)>(&self, point: Point, f: F) {
        match self {
            Self::Flat(b) => b.visit_point(point, f),
            #[cfg(feature = "backend_grid")]
            Self::Grid(b) => b.visit_point(point, f),
        }
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, f: F) {
        match self {
            Self::Flat(b) => b.visit_rect(rect, f),
            #[cfg(feature = "backend_grid")]
            Self::Grid(b) => b.visit_rect(rect, f),
        }
    }
}

/// Cell size giving roughly `√n × √n` cells over the union of `outlines`.
#[cfg(feature = "backend_grid")]
fn auto_cell_size(outlines: &[Rect]) -> f64 {
    let Some(extent) = outlines.iter().copied().reduce(|a, b| a.union(b)) else {
        return f64::NAN;
    };
    extent.width().max(extent.height()) / isqrt_ceil(outlines.len()) as f64
}

#[derive(Debug)]
struct Level {
    /// Entry index for each backend slot.
    entries: Vec<usize>,
    backend: LevelBackend,
}

/// Projected outlines of a fixed key set under one projection, grouped by zoom level.
///
/// The index is immutable once built. When the projection changes, build a new one.
///
/// ```rust
/// use kurbo::Rect;
/// use tessera_geo::PlateCarree;
/// use tessera_index::{IndexConfig, KeyGrid, Viewport, VisibilityIndex};
///
/// let proj = PlateCarree::new();
/// let keys = KeyGrid::new(1_000_000.0, 10.0).keys().unwrap();
/// let index = VisibilityIndex::build(keys, &proj, &IndexConfig::default());
///
/// let viewport = Viewport::from_pixel_size(Rect::new(1.0, 1.0, 15.0, 15.0), 512.0, 512.0);
/// let visible = index.visible_tiles(&viewport, 0.02, &proj);
/// assert_eq!(visible.length_scale, Some(1_000_000.0));
/// assert_eq!(visible.keys.len(), 2 * 2);
/// ```
#[derive(Debug)]
pub struct VisibilityIndex {
    entries: Vec<(SpatialKey, VisibilityPolygon)>,
    by_key: HashMap<SpatialKey, usize>,
    zoom: ZoomLevels,
    levels: Vec<Level>,
    dropped: usize,
}

impl VisibilityIndex {
    /// Project every key and index the usable outlines.
    ///
    /// Keys whose outline is not finite, has zero area, or is inverted under
    /// `projection` are dropped and counted in [`dropped`](Self::dropped).
    /// Duplicate keys are stored once.
    pub fn build(
        keys: impl IntoIterator<Item = SpatialKey>,
        projection: &dyn Projection,
        config: &IndexConfig,
    ) -> Self {
        let mut entries = Vec::new();
        let mut by_key = HashMap::new();
        let mut dropped = 0_usize;
        for key in keys {
            if by_key.contains_key(&key) {
                continue;
            }
            match VisibilityPolygon::build(&key, projection, config.edge_samples) {
                Ok(outline) => {
                    by_key.insert(key, entries.len());
                    entries.push((key, outline));
                }
                Err(reason) => {
                    debug!(%key, %reason, "dropping tile key");
                    dropped += 1;
                }
            }
        }

        let zoom = ZoomLevels::from_scales(entries.iter().map(|(k, _)| k.length_scale()));
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); zoom.len()];
        for (i, (key, _)) in entries.iter().enumerate() {
            if let Some(level) = zoom.index_at_or_before(key.length_scale()) {
                members[level].push(i);
            }
        }
        let levels = members
            .into_iter()
            .map(|level_entries| {
                let outlines: Vec<Rect> = level_entries
                    .iter()
                    .map(|&i| entries[i].1.bounds())
                    .collect();
                let mut backend = LevelBackend::new(config.backend, &outlines);
                for (slot, bounds) in outlines.into_iter().enumerate() {
                    backend.insert(slot, bounds);
                }
                Level {
                    entries: level_entries,
                    backend,
                }
            })
            .collect();

        info!(
            retained = entries.len(),
            dropped,
            levels = zoom.len(),
            "built visibility index"
        );
        Self {
            entries,
            by_key,
            zoom,
            levels,
            dropped,
        }
    }

    /// Number of retained keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key was retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys dropped for degenerate outlines.
    pub const fn dropped(&self) -> usize {
        self.dropped
    }

    /// Retained keys, in the order they were first seen.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = SpatialKey> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    /// The outline of `key`, if it was retained.
    pub fn polygon(&self, key: &SpatialKey) -> Option<&VisibilityPolygon> {
        self.by_key.get(key).map(|&i| &self.entries[i].1)
    }

    /// Distinct length scales of the retained keys.
    pub const fn zoom_levels(&self) -> &ZoomLevels {
        &self.zoom
    }

    /// Pick the zoom level for `viewport`.
    ///
    /// This is the largest length scale not exceeding the viewport's
    /// [ground span](Viewport::ground_span), or the finest level when every level
    /// is coarser. A single level is always chosen; an empty index has none.
    pub fn length_scale_for(&self, viewport: &Viewport, projection: &dyn Projection) -> Option<f64> {
        match self.zoom.len() {
            0 => None,
            1 => self.zoom.get(0),
            _ => self.zoom.select(viewport.ground_span(projection)),
        }
    }

    /// Keys at the selected zoom level whose outline intersects the viewport
    /// bounds grown by `padding` (a fraction of width and height per side).
    pub fn visible_tiles(
        &self,
        viewport: &Viewport,
        padding: f64,
        projection: &dyn Projection,
    ) -> VisibleTiles {
        let Some(length_scale) = self.length_scale_for(viewport, projection) else {
            return VisibleTiles::default();
        };
        let query = viewport.padded(padding);
        let mut keys = Vec::new();
        if let Some(level) = self.level(length_scale) {
            level.backend.visit_rect(query, |slot| {
                let (key, outline) = &self.entries[level.entries[slot]];
                if outline.intersects_rect(&query) {
                    keys.push(*key);
                }
            });
        }
        keys.sort_by(tile_order);
        VisibleTiles {
            length_scale: Some(length_scale),
            keys,
        }
    }

    /// Keys at `length_scale` whose outline contains `point`, sorted like
    /// [`visible_tiles`](Self::visible_tiles).
    pub fn tiles_at(&self, point: Point, length_scale: f64) -> Vec<SpatialKey> {
        let mut keys = Vec::new();
        if let Some(level) = self.level(length_scale) {
            level.backend.visit_point(point, |slot| {
                let (key, outline) = &self.entries[level.entries[slot]];
                if outline.contains_point(point) {
                    keys.push(*key);
                }
            });
        }
        keys.sort_by(tile_order);
        keys
    }

    fn level(&self, length_scale: f64) -> Option<&Level> {
        let i = self.zoom.index_at_or_before(length_scale)?;
        if self.zoom.get(i) != Some(length_scale) {
            return None;
        }
        self.levels.get(i)
    }
}

fn tile_order(a: &SpatialKey, b: &SpatialKey) -> Ordering {
    a.min_lat()
        .total_cmp(&b.min_lat())
        .then(a.min_lon().total_cmp(&b.min_lon()))
        .then(a.max_lat().total_cmp(&b.max_lat()))
        .then(a.max_lon().total_cmp(&b.max_lon()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyGrid;
    use tessera_geo::{LatLon, PlateCarree};

    /// Plate carrée whose ground distance is the plane distance times `k`.
    #[derive(Debug)]
    struct Scaled {
        k: f64,
    }

    impl Projection for Scaled {
        fn project(&self, at: LatLon) -> Point {
            Point::new(at.lon, at.lat)
        }

        fn unproject(&self, point: Point) -> LatLon {
            LatLon::new(point.y, point.x)
        }

        fn ground_distance(&self, a: LatLon, b: LatLon) -> f64 {
            self.k * (a.lat - b.lat).hypot(a.lon - b.lon)
        }
    }

    #[derive(Debug)]
    struct MirrorX;

    impl Projection for MirrorX {
        fn project(&self, at: LatLon) -> Point {
            Point::new(-at.lon, at.lat)
        }

        fn unproject(&self, point: Point) -> LatLon {
            LatLon::new(point.y, -point.x)
        }
    }

    fn two_level_keys() -> Vec<SpatialKey> {
        let mut keys = KeyGrid::new(10.0, 10.0)
            .with_bounds(0.0, 80.0, 0.0, 100.0)
            .keys()
            .unwrap();
        keys.extend(
            KeyGrid::new(100.0, 40.0)
                .with_bounds(0.0, 80.0, 0.0, 100.0)
                .keys()
                .unwrap(),
        );
        keys
    }

    #[test]
    fn example_scenario_selects_by_ground_span() {
        let viewport = Viewport::new(Rect::new(0.0, 0.0, 100.0, 100.0), 1.0, 1.0);
        let keys = two_level_keys();

        let fine = Scaled { k: 0.5 };
        let index = VisibilityIndex::build(keys.iter().copied(), &fine, &IndexConfig::default());
        assert_eq!(index.zoom_levels().as_slice(), &[10.0, 100.0], "two levels");
        assert_eq!(index.length_scale_for(&viewport, &fine), Some(10.0), "span ~50");
        let visible = index.visible_tiles(&viewport, 0.02, &fine);
        assert_eq!(visible.length_scale, Some(10.0), "fine level queried");
        assert_eq!(visible.keys.len(), 8 * 10, "every fine tile is on screen");

        let coarse = Scaled { k: 5.0 };
        let index = VisibilityIndex::build(keys, &coarse, &IndexConfig::default());
        assert_eq!(index.length_scale_for(&viewport, &coarse), Some(100.0), "span ~500");
        let visible = index.visible_tiles(&viewport, 0.02, &coarse);
        assert_eq!(visible.keys.len(), 2 * 3, "every coarse tile is on screen");
        assert!(
            visible.keys.iter().all(|k| k.length_scale() == 100.0),
            "only the selected level is returned"
        );
    }

    #[test]
    fn repeated_queries_are_identical() {
        let proj = Scaled { k: 0.5 };
        let viewport = Viewport::new(Rect::new(12.0, 3.0, 47.0, 38.0), 2.0, 2.0);
        let a = VisibilityIndex::build(two_level_keys(), &proj, &IndexConfig::default());
        let b = VisibilityIndex::build(two_level_keys(), &proj, &IndexConfig::default());
        let first = a.visible_tiles(&viewport, 0.02, &proj);
        assert_eq!(first, a.visible_tiles(&viewport, 0.02, &proj), "same index, same answer");
        assert_eq!(first, b.visible_tiles(&viewport, 0.02, &proj), "same build, same answer");
        assert!(!first.keys.is_empty(), "viewport overlaps tiles");
        assert!(
            first.keys.windows(2).all(|w| tile_order(&w[0], &w[1]) == Ordering::Less),
            "keys are sorted and unique"
        );
    }

    #[test]
    fn larger_viewports_never_select_finer_levels() {
        let proj = PlateCarree::new();
        let mut keys = Vec::new();
        for (scale, cell) in [(100_000.0, 5.0), (1_000_000.0, 15.0), (10_000_000.0, 45.0)] {
            keys.extend(KeyGrid::new(scale, cell).keys().unwrap());
        }
        let index = VisibilityIndex::build(keys, &proj, &IndexConfig::default());

        let mut last = 0.0;
        for half in [0.1, 1.0, 5.0, 20.0, 60.0, 90.0] {
            let viewport =
                Viewport::from_pixel_size(Rect::new(-half, -half, half, half), 1024.0, 1024.0);
            let scale = index.length_scale_for(&viewport, &proj).unwrap();
            assert!(scale >= last, "half width {half}: {scale} < {last}");
            last = scale;
        }
        assert_eq!(last, 10_000_000.0, "widest view reaches the coarsest level");
    }

    #[test]
    fn covering_keys_included_disjoint_keys_excluded() {
        let proj = PlateCarree::new();
        let covering = SpatialKey::new(1.0, -10.0, 10.0, -10.0, 10.0).unwrap();
        let disjoint = SpatialKey::new(1.0, 50.0, 60.0, 50.0, 60.0).unwrap();
        let index = VisibilityIndex::build([covering, disjoint], &proj, &IndexConfig::default());

        let viewport = Viewport::new(Rect::new(-1.0, -1.0, 1.0, 1.0), 100.0, 100.0);
        let visible = index.visible_tiles(&viewport, 0.02, &proj);
        assert_eq!(visible.keys, vec![covering], "only the covering key");
    }

    #[test]
    fn whole_globe_key_is_usable() {
        let proj = PlateCarree::new();
        let globe = SpatialKey::new(1.0, -90.0, 90.0, -180.0, 180.0).unwrap();
        let index = VisibilityIndex::build([globe], &proj, &IndexConfig::default());
        assert_eq!(index.len(), 1, "clamped globe outline is retained");
        assert_eq!(index.dropped(), 0, "nothing dropped");
        let outline = index.polygon(&globe).unwrap();
        assert!(outline.bounds().is_finite(), "finite outline bounds");

        let viewport = Viewport::new(Rect::new(170.0, 80.0, 200.0, 100.0), 1.0, 1.0);
        assert_eq!(
            index.visible_tiles(&viewport, 0.0, &proj).keys,
            vec![globe],
            "corner of the globe is visible"
        );
    }

    #[test]
    fn inverted_projection_drops_keys() {
        let index = VisibilityIndex::build(two_level_keys(), &MirrorX, &IndexConfig::default());
        assert!(index.is_empty(), "every outline is inverted");
        assert_eq!(index.dropped(), 80 + 6, "all keys counted as dropped");
        assert!(index.zoom_levels().is_empty(), "no levels without keys");

        let viewport = Viewport::new(Rect::new(-100.0, 0.0, 0.0, 100.0), 1.0, 1.0);
        assert_eq!(
            index.visible_tiles(&viewport, 0.02, &MirrorX),
            VisibleTiles::default(),
            "empty index yields nothing"
        );
    }

    #[test]
    fn duplicate_keys_are_stored_once() {
        let proj = PlateCarree::new();
        let key = SpatialKey::new(1.0, 0.0, 1.0, 0.0, 1.0).unwrap();
        let index = VisibilityIndex::build([key, key, key], &proj, &IndexConfig::default());
        assert_eq!(index.len(), 1, "deduplicated");
        assert_eq!(index.keys().collect::<Vec<_>>(), vec![key], "the one key");
    }

    #[test]
    fn backends_agree() {
        let proj = Scaled { k: 0.5 };
        let keys = two_level_keys();
        let flat = VisibilityIndex::build(
            keys.iter().copied(),
            &proj,
            &IndexConfig::default().with_backend(BackendKind::Flat),
        );
        let auto = VisibilityIndex::build(keys.iter().copied(), &proj, &IndexConfig::default());
        #[cfg(feature = "backend_grid")]
        let fixed = VisibilityIndex::build(
            keys.iter().copied(),
            &proj,
            &IndexConfig::default().with_backend(BackendKind::Grid {
                cell_size: Some(3.0),
            }),
        );

        for bounds in [
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(5.0, 5.0, 25.0, 25.0),
            Rect::new(-50.0, -50.0, -10.0, -10.0),
            Rect::new(33.3, 41.7, 58.2, 44.1),
        ] {
            let viewport = Viewport::new(bounds, 1.0, 1.0);
            let expected = flat.visible_tiles(&viewport, 0.02, &proj);
            assert_eq!(auto.visible_tiles(&viewport, 0.02, &proj), expected, "auto grid {bounds:?}");
            #[cfg(feature = "backend_grid")]
            assert_eq!(
                fixed.visible_tiles(&viewport, 0.02, &proj),
                expected,
                "fixed grid {bounds:?}"
            );
        }
    }

    #[test]
    fn point_lookup() {
        let proj = Scaled { k: 0.5 };
        let index = VisibilityIndex::build(two_level_keys(), &proj, &IndexConfig::default());
        let hits = index.tiles_at(Point::new(15.0, 25.0), 10.0);
        assert_eq!(hits.len(), 1, "one fine tile under the point");
        assert!(hits[0].contains(LatLon::new(25.0, 15.0)), "the tile around the point");
        assert!(index.tiles_at(Point::new(15.0, 25.0), 11.0).is_empty(), "unknown level");
    }

    #[test]
    fn config_validation() {
        assert_eq!(IndexConfig::default().validate(), Ok(()), "defaults are valid");
        assert_eq!(
            IndexConfig::default().with_edge_samples(0).validate(),
            Err(IndexConfigError::ZeroEdgeSamples),
            "zero samples"
        );
        #[cfg(feature = "backend_grid")]
        assert_eq!(
            IndexConfig::default()
                .with_backend(BackendKind::Grid {
                    cell_size: Some(-1.0)
                })
                .validate(),
            Err(IndexConfigError::InvalidCellSize(-1.0)),
            "negative cell size"
        );
    }
}
