// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sorted zoom levels.

/// The distinct length scales of an index, sorted ascending.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ZoomLevels {
    scales: Vec<f64>,
}

impl ZoomLevels {
    /// Collect, sort, and deduplicate scales. Non-finite values are ignored.
    pub fn from_scales(scales: impl IntoIterator<Item = f64>) -> Self {
        let mut scales: Vec<f64> = scales.into_iter().filter(|s| s.is_finite()).collect();
        scales.sort_by(f64::total_cmp);
        // `-0.0` and `0.0` compare equal, so they collapse into one level.
        scales.dedup();
        Self { scales }
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.scales.len()
    }

    /// Whether there are no levels.
    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// Scale at `index`, finest first.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.scales.get(index).copied()
    }

    /// All scales, ascending.
    pub fn as_slice(&self) -> &[f64] {
        &self.scales
    }

    /// Index of the largest scale `≤ value`, if any.
    pub fn index_at_or_before(&self, value: f64) -> Option<usize> {
        self.scales.partition_point(|&s| s <= value).checked_sub(1)
    }

    /// The coarsest scale not exceeding `span`, or the finest scale when every
    /// level is coarser than `span`.
    ///
    /// With a single level that level is always chosen.
    pub fn select(&self, span: f64) -> Option<f64> {
        match self.scales.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => self.get(self.index_at_or_before(span).unwrap_or(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_and_deduplicated() {
        let levels = ZoomLevels::from_scales([100.0, 10.0, f64::NAN, 100.0, 1_000.0]);
        assert_eq!(levels.as_slice(), &[10.0, 100.0, 1_000.0], "ascending, unique, finite");
        assert_eq!(levels.len(), 3, "three levels");
        assert_eq!(levels.get(1), Some(100.0), "indexed access");
    }

    #[test]
    fn at_or_before() {
        let levels = ZoomLevels::from_scales([10.0, 100.0]);
        assert_eq!(levels.index_at_or_before(5.0), None, "below every level");
        assert_eq!(levels.index_at_or_before(10.0), Some(0), "exact match");
        assert_eq!(levels.index_at_or_before(99.0), Some(0), "between levels");
        assert_eq!(levels.index_at_or_before(1e9), Some(1), "above every level");
    }

    #[test]
    fn select_falls_back_to_finest() {
        let levels = ZoomLevels::from_scales([10.0, 100.0]);
        assert_eq!(levels.select(50.0), Some(10.0), "span between levels");
        assert_eq!(levels.select(500.0), Some(100.0), "span above every level");
        assert_eq!(levels.select(1.0), Some(10.0), "span below every level");
        assert_eq!(levels.select(f64::NAN), Some(10.0), "unusable span");
    }

    #[test]
    fn select_edge_cases() {
        assert_eq!(ZoomLevels::default().select(1.0), None, "no levels");
        let single = ZoomLevels::from_scales([42.0]);
        assert_eq!(single.select(1e-9), Some(42.0), "single level always wins");
        assert_eq!(single.select(1e9), Some(42.0), "single level always wins");
    }
}
