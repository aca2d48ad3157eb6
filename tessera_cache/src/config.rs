// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cache configuration.

use std::time::Duration;

use thiserror::Error;

/// How long resolved values are kept.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Retention {
    /// Keep every resolved value until it is invalidated.
    #[default]
    Unbounded,
    /// Keep at most `capacity` resolved values, evicting the least recently used.
    ///
    /// Loads in flight do not count towards the capacity and are never evicted.
    /// Neither are [pinned](crate::TileCache::set_pinned) keys, so the cache
    /// may hold more than `capacity` values while they are pinned.
    Lru {
        /// Maximum number of resolved values.
        capacity: usize,
    },
}

/// Invalid [`CacheConfig`] values.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CacheConfigError {
    /// An LRU cache with room for nothing.
    #[error("LRU capacity must be at least 1")]
    ZeroCapacity,
    /// The backoff cap is below the base backoff.
    #[error("max_retry_backoff ({max:?}) is below retry_backoff ({base:?})")]
    BackoffCap {
        /// Base backoff.
        base: Duration,
        /// Cap.
        max: Duration,
    },
}

/// Retention and retry policy of a [`TileCache`](crate::TileCache).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Default: [`Retention::Unbounded`].
    pub retention: Retention,
    /// Delay before a failed key is loaded again, multiplied by the number of
    /// consecutive failures. Zero, the default, retries on the next request.
    pub retry_backoff: Duration,
    /// Upper bound for the grown backoff. Default: 30 seconds.
    pub max_retry_backoff: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            retention: Retention::Unbounded,
            retry_backoff: Duration::ZERO,
            max_retry_backoff: Duration::from_secs(30),
        }
    }
}

impl CacheConfig {
    /// Set the retention policy.
    #[must_use]
    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    /// Set the base retry backoff.
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the retry backoff cap.
    #[must_use]
    pub fn with_max_retry_backoff(mut self, max: Duration) -> Self {
        self.max_retry_backoff = max;
        self
    }

    /// Check the configuration for values the cache cannot work with.
    pub fn validate(&self) -> Result<(), CacheConfigError> {
        if self.retention == (Retention::Lru { capacity: 0 }) {
            return Err(CacheConfigError::ZeroCapacity);
        }
        if self.max_retry_backoff < self.retry_backoff {
            return Err(CacheConfigError::BackoffCap {
                base: self.retry_backoff,
                max: self.max_retry_backoff,
            });
        }
        Ok(())
    }

    /// Backoff after `failures` consecutive failures.
    pub fn backoff_for(&self, failures: u32) -> Duration {
        self.retry_backoff
            .saturating_mul(failures)
            .min(self.max_retry_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert_eq!(CacheConfig::default().validate(), Ok(()), "defaults are valid");
        assert_eq!(
            CacheConfig::default()
                .with_retention(Retention::Lru { capacity: 0 })
                .validate(),
            Err(CacheConfigError::ZeroCapacity),
            "empty LRU"
        );
        assert!(
            matches!(
                CacheConfig::default()
                    .with_retry_backoff(Duration::from_secs(5))
                    .with_max_retry_backoff(Duration::from_secs(1))
                    .validate(),
                Err(CacheConfigError::BackoffCap { .. })
            ),
            "cap below base"
        );
    }

    #[test]
    fn backoff_grows_linearly_up_to_the_cap() {
        let config = CacheConfig::default()
            .with_retry_backoff(Duration::from_secs(2))
            .with_max_retry_backoff(Duration::from_secs(5));
        assert_eq!(config.backoff_for(1), Duration::from_secs(2), "first failure");
        assert_eq!(config.backoff_for(2), Duration::from_secs(4), "second failure");
        assert_eq!(config.backoff_for(3), Duration::from_secs(5), "capped");
        assert_eq!(config.backoff_for(u32::MAX), Duration::from_secs(5), "no overflow");
    }
}
