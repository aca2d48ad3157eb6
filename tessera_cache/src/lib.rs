// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera Cache: asynchronous tile payload loading.
//!
//! - [`WorkerPool`]: an explicitly constructed pool of named worker threads.
//!   Handles are cheap clones; the pool shuts down when the last one is dropped.
//! - [`TileCache`]: a key → `Arc<V>` cache whose [`get`](TileCache::get) never
//!   blocks. A miss queues exactly one load per key on the pool; concurrent
//!   misses for the same key share it.
//! - [`Loader`]: the loader contract, implemented by `Fn(&K) -> Result<V, LoadError>`
//!   closures.
//!
//! Failed loads are logged and released for retry, immediately or after a
//! growing backoff ([`CacheConfig::retry_backoff`]). Resolved values are kept
//! until invalidated, or bounded by an LRU [`Retention`] policy. Hosts that want
//! to redraw when a tile arrives can [`subscribe`](TileCache::subscribe) to
//! [`CacheEvent`]s instead of polling.
//!
//! There is no cancellation while the pool is alive: a queued load always runs
//! to completion. Its result is dropped only if the key was invalidated in the
//! meantime. Dropping the last pool handle discards loads that have not started.

mod cache;
mod config;
mod loader;
mod pool;

pub use cache::{CacheEvent, CacheStats, Lookup, TileCache};
pub use config::{CacheConfig, CacheConfigError, Retention};
pub use loader::{LoadError, Loader};
pub use pool::{PoolError, WorkerPool};
