// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Painter configuration.

use tessera_cache::{CacheConfig, CacheConfigError};
use tessera_index::{IndexConfig, IndexConfigError};
use thiserror::Error;

/// How the painter notices that a missing tile has arrived.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RefreshMode {
    /// Recompute on the next paint whenever the cache reports a finished load.
    ///
    /// Keys waiting out a failure backoff produce no event, so a frame with such
    /// a miss falls back to [`Poll`](Self::Poll).
    #[default]
    Notify,
    /// Recompute on every paint until no visible tile is missing.
    Poll,
}

/// Invalid [`PainterConfig`] values.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Viewport padding that is negative or not finite.
    #[error("viewport padding must be finite and non-negative, got {0}")]
    Padding(f64),
    /// Change epsilon that is negative or not finite.
    #[error("change epsilon must be finite and non-negative, got {0}")]
    ChangeEpsilon(f64),
    /// Invalid index configuration.
    #[error(transparent)]
    Index(#[from] IndexConfigError),
    /// Invalid cache configuration.
    #[error(transparent)]
    Cache(#[from] CacheConfigError),
}

/// Configuration of a [`TilePainter`](crate::TilePainter).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PainterConfig {
    /// Fraction of the viewport width and height added on each side before
    /// culling. Default: 0.02.
    pub viewport_padding: f64,
    /// Largest per-edge movement of the viewport bounds treated as "unchanged".
    /// Default: 1e-9.
    pub change_epsilon: f64,
    /// Default: [`RefreshMode::Notify`].
    pub refresh: RefreshMode,
    /// Visibility index settings.
    pub index: IndexConfig,
    /// Tile cache settings.
    pub cache: CacheConfig,
}

impl Default for PainterConfig {
    fn default() -> Self {
        Self {
            viewport_padding: 0.02,
            change_epsilon: 1e-9,
            refresh: RefreshMode::default(),
            index: IndexConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl PainterConfig {
    /// Set the viewport padding fraction.
    #[must_use]
    pub fn with_viewport_padding(mut self, padding: f64) -> Self {
        self.viewport_padding = padding;
        self
    }

    /// Set the viewport change epsilon.
    #[must_use]
    pub fn with_change_epsilon(mut self, epsilon: f64) -> Self {
        self.change_epsilon = epsilon;
        self
    }

    /// Set the refresh mode.
    #[must_use]
    pub fn with_refresh(mut self, refresh: RefreshMode) -> Self {
        self.refresh = refresh;
        self
    }

    /// Set the index configuration.
    #[must_use]
    pub fn with_index(mut self, index: IndexConfig) -> Self {
        self.index = index;
        self
    }

    /// Set the cache configuration.
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Check this configuration and the nested ones.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.viewport_padding.is_finite() && self.viewport_padding >= 0.0) {
            return Err(ConfigError::Padding(self.viewport_padding));
        }
        if !(self.change_epsilon.is_finite() && self.change_epsilon >= 0.0) {
            return Err(ConfigError::ChangeEpsilon(self.change_epsilon));
        }
        self.index.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}
