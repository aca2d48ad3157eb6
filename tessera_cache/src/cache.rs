// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tile cache.

use core::fmt;
use core::hash::Hash;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::{CacheConfig, CacheConfigError, Retention};
use crate::loader::{LoadError, Loader};
use crate::pool::{WorkerPool, panic_message};

/// Result of [`TileCache::lookup`].
#[derive(Debug)]
pub enum Lookup<V> {
    /// The value is resolved.
    Ready(Arc<V>),
    /// A load is in flight, either already running or started by this call.
    Loading,
    /// No load is in flight and none will finish on its own: the last load
    /// failed and the key is waiting out its retry backoff, or the pool refused
    /// the job. Ask again later.
    Backoff,
}

impl<V> Lookup<V> {
    /// The resolved value, if any.
    pub fn ready(self) -> Option<Arc<V>> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Loading | Self::Backoff => None,
        }
    }
}

/// Notification sent to [subscribers](TileCache::subscribe) after a load finishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheEvent<K> {
    /// The key's value is now resolved.
    Loaded(K),
    /// The key's load failed.
    Failed(K),
}

/// Counters since the cache was created.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found a resolved value.
    pub hits: u64,
    /// Lookups that did not.
    pub misses: u64,
    /// Loads handed to the pool.
    pub loads_started: u64,
    /// Loads that produced a value.
    pub loads_completed: u64,
    /// Loads that failed or panicked.
    pub failures: u64,
    /// Resolved values evicted by the retention policy.
    pub evictions: u64,
}

enum Slot<V> {
    Loading {
        generation: u64,
        failures: u32,
    },
    Ready {
        value: Arc<V>,
        last_used: u64,
    },
    Failed {
        failures: u32,
        retry_at: Instant,
    },
}

struct State<K, V> {
    slots: HashMap<K, Slot<V>>,
    /// Tag of the most recently started load.
    generation: u64,
    /// Logical clock for LRU ordering.
    tick: u64,
    /// Resolved keys by last use, oldest first.
    recency: BTreeMap<u64, K>,
    /// Keys that retention never evicts.
    pinned: HashSet<K>,
    ready: usize,
    stats: CacheStats,
    subscribers: Vec<Sender<CacheEvent<K>>>,
}

struct Shared<K, V> {
    loader: Box<dyn Loader<K, V>>,
    config: CacheConfig,
    state: Mutex<State<K, V>>,
}

/// An asynchronous key → value cache with at most one load in flight per key.
///
/// [`get`](Self::get) never blocks on a load: it returns the resolved value, or
/// `None` after making sure a load is queued on the [`WorkerPool`]. The slot map
/// lock is never held while the loader runs. Once published, a value is seen
/// whole by every reader as an `Arc<V>`.
///
/// ```rust
/// use std::time::Duration;
/// use tessera_cache::{CacheConfig, CacheEvent, LoadError, TileCache, WorkerPool};
///
/// let pool = WorkerPool::new(2).unwrap();
/// let cache = TileCache::new(
///     |key: &u32| -> Result<u64, LoadError> { Ok(u64::from(*key) * 2) },
///     pool,
///     CacheConfig::default(),
/// )
/// .unwrap();
/// let events = cache.subscribe();
///
/// assert!(cache.get(&21).is_none());
/// assert_eq!(events.recv_timeout(Duration::from_secs(5)), Ok(CacheEvent::Loaded(21)));
/// assert_eq!(cache.get(&21).as_deref(), Some(&42));
/// ```
pub struct TileCache<K, V> {
    shared: Arc<Shared<K, V>>,
    pool: WorkerPool,
}

impl<K, V> TileCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Create an empty cache whose loads run `loader` on `pool`.
    pub fn new(
        loader: impl Loader<K, V>,
        pool: WorkerPool,
        config: CacheConfig,
    ) -> Result<Self, CacheConfigError> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                loader: Box::new(loader),
                config,
                state: Mutex::new(State {
                    slots: HashMap::new(),
                    generation: 0,
                    tick: 0,
                    recency: BTreeMap::new(),
                    pinned: HashSet::new(),
                    ready: 0,
                    stats: CacheStats::default(),
                    subscribers: Vec::new(),
                }),
            }),
            pool,
        })
    }

    /// The resolved value for `key`, or `None` while it loads.
    ///
    /// A missing key, or a failed key whose backoff has elapsed, gets a load
    /// queued. A key already loading or still backing off is left alone.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.lookup(key).ready()
    }

    /// Like [`get`](Self::get), but reports why a value is missing.
    pub fn lookup(&self, key: &K) -> Lookup<V> {
        let generation = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            state.tick += 1;
            let failures = match state.slots.get_mut(key) {
                Some(Slot::Ready { value, last_used }) => {
                    state.recency.remove(&*last_used);
                    *last_used = state.tick;
                    state.recency.insert(state.tick, key.clone());
                    state.stats.hits += 1;
                    return Lookup::Ready(Arc::clone(value));
                }
                Some(Slot::Loading { .. }) => {
                    state.stats.misses += 1;
                    return Lookup::Loading;
                }
                Some(Slot::Failed { retry_at, .. }) if Instant::now() < *retry_at => {
                    state.stats.misses += 1;
                    return Lookup::Backoff;
                }
                Some(Slot::Failed { failures, .. }) => *failures,
                None => 0,
            };
            state.stats.misses += 1;
            state.stats.loads_started += 1;
            state.generation += 1;
            let generation = state.generation;
            state
                .slots
                .insert(key.clone(), Slot::Loading { generation, failures });
            generation
        };

        let shared = Arc::clone(&self.shared);
        let job_key = key.clone();
        if let Err(error) = self
            .pool
            .spawn(move || shared.complete(job_key, generation))
        {
            debug!(?key, %error, "could not queue tile load");
            let mut state = self.shared.state.lock();
            state.stats.failures += 1;
            if matches!(
                state.slots.get(key),
                Some(Slot::Loading { generation: g, .. }) if *g == generation
            ) {
                state.slots.remove(key);
            }
            return Lookup::Backoff;
        }
        Lookup::Loading
    }

    /// The resolved value for `key`, without loading or touching recency.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        match self.shared.state.lock().slots.get(key) {
            Some(Slot::Ready { value, .. }) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Whether `key` has a resolved value.
    pub fn contains(&self, key: &K) -> bool {
        matches!(
            self.shared.state.lock().slots.get(key),
            Some(Slot::Ready { .. })
        )
    }

    /// Whether a load for `key` is in flight.
    pub fn is_loading(&self, key: &K) -> bool {
        matches!(
            self.shared.state.lock().slots.get(key),
            Some(Slot::Loading { .. })
        )
    }

    /// Forget `key` in whatever state it is. Returns whether there was anything to forget.
    ///
    /// A load in flight for `key` still runs, but its result is discarded.
    pub fn invalidate(&self, key: &K) -> bool {
        let mut state = self.shared.state.lock();
        match state.slots.remove(key) {
            Some(Slot::Ready { last_used, .. }) => {
                state.recency.remove(&last_used);
                state.ready -= 1;
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Forget every key. Loads in flight still run, but their results are discarded.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        state.slots.clear();
        state.recency.clear();
        state.ready = 0;
    }

    /// Replace the set of keys that [`Retention::Lru`] never evicts.
    ///
    /// A painter pins the tiles of its current frame. When more tiles are
    /// pinned than the capacity allows, the cache grows past its capacity
    /// instead of evicting tiles about to be drawn, and shrinks back once they
    /// are unpinned.
    pub fn set_pinned(&self, keys: impl IntoIterator<Item = K>) {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        state.pinned.clear();
        state.pinned.extend(keys);
        self.shared.evict(state);
    }

    /// Number of resolved values.
    pub fn len(&self) -> usize {
        self.shared.state.lock().ready
    }

    /// Whether no value is resolved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of loads in flight.
    pub fn in_flight(&self) -> usize {
        self.shared
            .state
            .lock()
            .slots
            .values()
            .filter(|slot| matches!(slot, Slot::Loading { .. }))
            .count()
    }

    /// Counters since creation.
    pub fn stats(&self) -> CacheStats {
        self.shared.state.lock().stats
    }

    /// Receive a [`CacheEvent`] for every load that finishes from now on.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<CacheEvent<K>> {
        let (sender, receiver) = unbounded();
        self.shared.state.lock().subscribers.push(sender);
        receiver
    }

    /// The configuration the cache was created with.
    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    /// The pool loads run on.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

impl<K, V> Shared<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Run the loader for `key` and publish the outcome, unless the slot was
    /// invalidated in the meantime.
    fn complete(&self, key: K, generation: u64) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.loader.load(&key)))
            .unwrap_or_else(|payload| Err(LoadError::Panicked(panic_message(payload.as_ref()))));

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let failures = match state.slots.get(&key) {
            Some(Slot::Loading {
                generation: g,
                failures,
            }) if *g == generation => *failures,
            _ => {
                trace!(?key, "discarding stale tile load");
                return;
            }
        };

        let event = match result {
            Ok(value) => {
                state.tick += 1;
                let slot = Slot::Ready {
                    value: Arc::new(value),
                    last_used: state.tick,
                };
                state.slots.insert(key.clone(), slot);
                state.recency.insert(state.tick, key.clone());
                state.ready += 1;
                state.stats.loads_completed += 1;
                self.evict(state);
                CacheEvent::Loaded(key)
            }
            Err(error) => {
                let failures = failures.saturating_add(1);
                state.stats.failures += 1;
                warn!(?key, %error, failures, "tile load failed");
                let backoff = self.config.backoff_for(failures);
                if backoff.is_zero() {
                    state.slots.remove(&key);
                } else {
                    let slot = Slot::Failed {
                        failures,
                        retry_at: Instant::now() + backoff,
                    };
                    state.slots.insert(key.clone(), slot);
                }
                CacheEvent::Failed(key)
            }
        };
        state
            .subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn evict(&self, state: &mut State<K, V>) {
        let Retention::Lru { capacity } = self.config.retention else {
            return;
        };
        let Some(excess) = state.ready.checked_sub(capacity).filter(|&n| n > 0) else {
            return;
        };
        let victims: Vec<(u64, K)> = state
            .recency
            .iter()
            .filter(|(_, key)| !state.pinned.contains(*key))
            .take(excess)
            .map(|(&tick, key)| (tick, key.clone()))
            .collect();
        for (tick, key) in victims {
            debug!(?key, "evicting least recently used tile");
            state.recency.remove(&tick);
            state.slots.remove(&key);
            state.ready -= 1;
            state.stats.evictions += 1;
        }
        if state.ready > capacity {
            debug!(
                ready = state.ready,
                capacity,
                "pinned tiles exceed the cache capacity"
            );
        }
    }
}

impl<K, V> fmt::Debug for TileCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("TileCache")
            .field("ready", &state.ready)
            .field("slots", &state.slots.len())
            .field("config", &self.shared.config)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
