// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for the per-level broad phase.
//!
//! - `flat`: flat vector with linear scans (small, simple).
//! - `grid` (feature `backend_grid`): uniform hash grid with configurable cell size.

pub(crate) mod flat;
#[cfg(feature = "backend_grid")]
pub(crate) mod grid;

pub use flat::FlatVec;
#[cfg(feature = "backend_grid")]
pub use grid::Grid;
