// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Broad-phase backend trait over projected tile bounds.

use kurbo::{Point, Rect};

/// Broad-phase spatial backend used by each zoom level of a
/// [`VisibilityIndex`][crate::VisibilityIndex].
///
/// Backends only see axis-aligned bounds. They may report false positives (a slot
/// whose bounds overlap the query but whose outline does not); the index filters
/// those with the exact outline test. They must never miss a slot.
pub trait Backend {
    /// Insert a slot with its bounds.
    fn insert(&mut self, slot: usize, bounds: Rect);

    /// Visit slots whose bounds contain the point.
    fn visit_point<F: FnMut(usize)>(&self, point: Point, f: F);

    /// Visit slots whose bounds intersect the rectangle. Each slot is visited at most once.
    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, f: F);

    /// Query slots whose bounds intersect the rectangle.
    ///
    /// The default implementation collects [`visit_rect`][Backend::visit_rect].
    fn query_rect(&self, rect: Rect) -> Vec<usize> {
        let mut out = Vec::new();
        self.visit_rect(rect, |i| out.push(i));
        out
    }
}
