// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Rect;

/// Returns the square root of the number, rounded up.
#[inline]
pub(crate) const fn isqrt_ceil(num: usize) -> usize {
    let s = num.isqrt();

    // This multiplication cannot overflow because `s` is the rounded-down square root of `num`,
    // i.e., `s * s` is guaranteed to be less than or equal to `num`.
    if s * s < num { s + 1 } else { s }
}

/// Edge-inclusive overlap test; rectangles that share an edge overlap.
#[inline]
pub(crate) fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}
