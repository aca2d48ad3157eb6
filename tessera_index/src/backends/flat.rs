// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linear-scan backend.

use kurbo::{Point, Rect};

use crate::backend::Backend;
use crate::util::overlaps;

/// Flat list of bounds, scanned linearly on every query.
#[derive(Clone, Debug, Default)]
pub struct FlatVec {
    slots: Vec<Option<Rect>>,
}

impl Backend for FlatVec {
    fn insert(&mut self, slot: usize, bounds: Rect) {
        if self.slots.len() <= slot {
            self.slots.resize(slot + 1, None);
        }
        self.slots[slot] = Some(bounds);
    }

    fn visit_point<F: FnMut(usize)>(&self, point: Point, mut f: F) {
        for (i, bounds) in self.slots.iter().enumerate() {
            if let Some(b) = bounds
                && b.x0 <= point.x
                && point.x <= b.x1
                && b.y0 <= point.y
                && point.y <= b.y1
            {
                f(i);
            }
        }
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, mut f: F) {
        for (i, bounds) in self.slots.iter().enumerate() {
            if let Some(b) = bounds
                && overlaps(b, &rect)
            {
                f(i);
            }
        }
    }
}
