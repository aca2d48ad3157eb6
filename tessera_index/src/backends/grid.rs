// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform grid backend for projected tile bounds.
//!
//! This backend buckets bounds into fixed-size grid cells and answers queries
//! by touching only the cells overlapping the query primitive. Tiles of one zoom
//! level are roughly the same size on screen, which makes a uniform grid a good
//! fit once the cell size is close to the typical tile size.

use core::fmt::Debug;

use hashbrown::{HashMap, HashSet};
use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::backend::Backend;
use crate::util::overlaps;

/// Map a coordinate to a grid coordinate along one axis, rounding towards -∞.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Grid cell indices are intentionally i32; out-of-range values are saturated."
)]
#[inline]
fn cell_coord(value: f64, origin: f64, cell_size: f64) -> i32 {
    debug_assert!(cell_size > 0.0, "grid cell_size must be strictly positive");
    let t = (value - origin) / cell_size;
    let coord = t as i32;

    // The cast above has already truncated (and saturated).
    if t < 0.0 && f64::from(coord) > t {
        coord.saturating_sub(1)
    } else {
        coord
    }
}

/// Uniform grid backend with fixed cell size.
pub struct Grid {
    cell_size: f64,
    origin: Point,
    cells: HashMap<(i32, i32), Cell>,
    slots: Vec<Option<Rect>>,
}

#[derive(Default)]
struct Cell {
    slots: SmallVec<[usize; 8]>,
}

impl Debug for Grid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let live_slots = self.slots.iter().filter(|s| s.is_some()).count();
        f.debug_struct("Grid")
            .field("cell_size", &self.cell_size)
            .field("origin", &self.origin)
            .field("live_slots", &live_slots)
            .field("cells", &self.cells.len())
            .finish_non_exhaustive()
    }
}

impl Grid {
    /// Create a new grid backend with the given cell size and origin at (0, 0).
    pub fn new(cell_size: f64) -> Self {
        Self::with_origin(cell_size, Point::ZERO)
    }

    /// Create a new grid backend with the given cell size and origin.
    pub fn with_origin(cell_size: f64, origin: Point) -> Self {
        debug_assert!(cell_size > 0.0, "cell_size must be strictly positive");
        Self {
            cell_size,
            origin,
            cells: HashMap::new(),
            slots: Vec::new(),
        }
    }

    /// Cell edge length in plane units.
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    fn cell_range(&self, rect: &Rect) -> ((i32, i32), (i32, i32)) {
        let x0 = cell_coord(rect.x0, self.origin.x, self.cell_size);
        let x1 = cell_coord(rect.x1, self.origin.x, self.cell_size);
        let y0 = cell_coord(rect.y0, self.origin.y, self.cell_size);
        let y1 = cell_coord(rect.y1, self.origin.y, self.cell_size);
        ((x0.min(x1), x0.max(x1)), (y0.min(y1), y0.max(y1)))
    }

    fn covered_cells(&self, bounds: &Rect) -> SmallVec<[(i32, i32); 4]> {
        let ((ix0, ix1), (iy0, iy1)) = self.cell_range(bounds);
        let mut out: SmallVec<[(i32, i32); 4]> = SmallVec::new();
        for ix in ix0..=ix1 {
            for iy in iy0..=iy1 {
                out.push((ix, iy));
            }
        }
        out
    }
}

impl Backend for Grid {
    fn insert(&mut self, slot: usize, bounds: Rect) {
        if self.slots.len() <= slot {
            self.slots.resize(slot + 1, None);
        }
        for cell in self.covered_cells(&bounds) {
            self.cells.entry(cell).or_default().slots.push(slot);
        }
        self.slots[slot] = Some(bounds);
    }

    fn visit_point<F: FnMut(usize)>(&self, point: Point, mut f: F) {
        let ix = cell_coord(point.x, self.origin.x, self.cell_size);
        let iy = cell_coord(point.y, self.origin.y, self.cell_size);
        let Some(cell) = self.cells.get(&(ix, iy)) else {
            return;
        };
        for &slot in &cell.slots {
            if let Some(Some(b)) = self.slots.get(slot)
                && overlaps(b, &Rect::from_points(point, point))
            {
                f(slot);
            }
        }
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, mut f: F) {
        let ((ix0, ix1), (iy0, iy1)) = self.cell_range(&rect);
        let mut seen: HashSet<usize> = HashSet::new();
        let mut visit_cell = |cell: &Cell| {
            for &slot in &cell.slots {
                if !seen.insert(slot) {
                    continue;
                }
                if let Some(Some(b)) = self.slots.get(slot)
                    && overlaps(b, &rect)
                {
                    f(slot);
                }
            }
        };

        let span = (i64::from(ix1) - i64::from(ix0) + 1) * (i64::from(iy1) - i64::from(iy0) + 1);
        let occupied = i64::try_from(self.cells.len()).unwrap_or(i64::MAX);
        if span > occupied {
            // Zoomed far out: walking the occupied cells is cheaper than the range.
            for (&(ix, iy), cell) in &self.cells {
                if (ix0..=ix1).contains(&ix) && (iy0..=iy1).contains(&iy) {
                    visit_cell(cell);
                }
            }
        } else {
            for ix in ix0..=ix1 {
                for iy in iy0..=iy1 {
                    if let Some(cell) = self.cells.get(&(ix, iy)) {
                        visit_cell(cell);
                    }
                }
            }
        }
    }
}
