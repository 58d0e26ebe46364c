//! TimedCache: key-value store with idle-time eviction
//!
//! Reads and writes are O(1). A sweep costs O(m) where m is the number of
//! accesses older than the timeout, not the number of live keys, so a cache
//! holding a very large number of mostly idle keys stays cheap to sweep.
//!
//! The cache is not synchronized. Keep one per event loop or worker, or wrap
//! it in a lock that serializes every call including `sweep`.

use std::collections::hash_map::{self, HashMap};
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use ahash::RandomState;
use tracing::{debug, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::Config;
use crate::error::{EvictError, Error, Result};
use crate::index::AccessIndex;
use crate::schedule::SweepSchedule;
use crate::stats::CacheStats;

type EvictCallback<V> = Box<dyn FnMut(&V) -> std::result::Result<(), EvictError> + Send>;

/// Result of a single sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Keys removed because they were idle longer than the timeout
    pub evicted: usize,

    /// Access log entries consumed
    pub scanned: usize,

    /// Eviction callbacks that returned an error or panicked
    pub callback_failures: usize,
}

/// Cache that evicts keys not accessed within `timeout`
///
/// Eviction only happens inside [`sweep`](TimedCache::sweep), which the
/// caller runs periodically.
pub struct TimedCache<K, V, C = MonotonicClock> {
    /// Live entries
    store: HashMap<K, V, RandomState>,

    /// Access times, buckets and access log
    index: AccessIndex<K>,

    /// Idle time after which a key may be swept
    timeout: Duration,

    /// Called with each value removed by a sweep
    on_evict: Option<EvictCallback<V>>,

    /// Gate for `maybe_sweep`
    schedule: SweepSchedule,

    clock: C,

    stats: CacheStats,
}

impl<K, V> TimedCache<K, V, MonotonicClock>
where
    K: Hash + Eq + Clone,
{
    /// Create a new cache with the given idle timeout
    ///
    /// A zero timeout is accepted: every key becomes sweepable as soon as the
    /// clock moves past its last access.
    pub fn new(timeout: Duration) -> Self {
        Self::with_clock(timeout, MonotonicClock)
    }

    /// Create a cache from a validated [`Config`]
    ///
    /// # Returns
    /// * `Err(Error::InvalidConfiguration)` - zero timeout or sweep interval
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::from_config_with_clock(config, MonotonicClock)
    }
}

impl<K, V, C> TimedCache<K, V, C>
where
    K: Hash + Eq + Clone,
    C: Clock,
{
    /// Create a new cache reading timestamps from `clock`
    pub fn with_clock(timeout: Duration, clock: C) -> Self {
        let start = clock.now();

        Self {
            store: HashMap::with_hasher(RandomState::new()),
            index: AccessIndex::new(),
            timeout,
            on_evict: None,
            schedule: SweepSchedule::new(None, start),
            clock,
            stats: CacheStats::new(),
        }
    }

    /// Create a cache from a validated [`Config`] reading timestamps from `clock`
    pub fn from_config_with_clock(config: &Config, clock: C) -> Result<Self> {
        config.validate()?;

        let mut cache = Self::with_clock(config.timeout, clock);
        cache.schedule = SweepSchedule::new(config.sweep_interval, cache.schedule.last());
        Ok(cache)
    }

    /// Attach a callback invoked with every value a sweep evicts
    ///
    /// The callback sees the value just before it is dropped. It is not called
    /// for `remove`, `delete` or `clear`. Errors and panics are logged and
    /// counted; the key is evicted either way.
    pub fn on_evict<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&V) -> std::result::Result<(), EvictError> + Send + 'static,
    {
        self.on_evict = Some(Box::new(callback));
        self
    }

    /// Get a value and refresh its access time
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if !self.store.contains_key(key) {
            self.stats.record_miss();
            return None;
        }

        self.touch(key.clone());
        self.stats.record_hit();
        self.store.get(key)
    }

    /// Get a mutable value and refresh its access time
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if !self.store.contains_key(key) {
            self.stats.record_miss();
            return None;
        }

        self.touch(key.clone());
        self.stats.record_hit();
        self.store.get_mut(key)
    }

    /// Strict lookup: like [`get`](TimedCache::get) but a miss is an error
    ///
    /// # Returns
    /// * `Err(Error::NotFound)` - key is not live
    pub fn try_get(&mut self, key: &K) -> Result<&V> {
        self.get(key).ok_or(Error::NotFound)
    }

    /// Get a value without refreshing its access time
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.store.get(key)
    }

    /// Insert or overwrite a value and refresh its access time
    ///
    /// # Returns
    /// * `Option<V>` - Previous value, if the key was live
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        self.touch(key.clone());
        self.stats.record_insert();
        self.store.insert(key, value)
    }

    /// Remove a key without invoking the eviction callback
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.index.forget(key);
        self.store.remove(key)
    }

    /// Strict removal: like [`remove`](TimedCache::remove) but a miss is an error
    ///
    /// # Returns
    /// * `Err(Error::NotFound)` - key is not live
    pub fn delete(&mut self, key: &K) -> Result<V> {
        self.remove(key).ok_or(Error::NotFound)
    }

    /// Check whether a key is live. Does not refresh its access time.
    pub fn contains_key(&self, key: &K) -> bool {
        self.store.contains_key(key)
    }

    /// Live keys in unspecified order
    pub fn keys(&self) -> hash_map::Keys<'_, K, V> {
        self.store.keys()
    }

    /// Live values in unspecified order
    pub fn values(&self) -> hash_map::Values<'_, K, V> {
        self.store.values()
    }

    /// Live entries in unspecified order
    pub fn iter(&self) -> hash_map::Iter<'_, K, V> {
        self.store.iter()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Instant of the most recent read or write of `key`
    pub fn last_access(&self, key: &K) -> Option<Instant> {
        self.index.last_access(key)
    }

    /// Idle timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Accesses recorded but not yet consumed by a sweep
    pub fn pending_accesses(&self) -> usize {
        self.index.pending()
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Drop every entry and all access history without invoking callbacks
    pub fn clear(&mut self) {
        self.store.clear();
        self.index.clear();
    }

    /// Evict every key idle for longer than the timeout
    ///
    /// Walks the access log from the oldest entry and stops at the first one
    /// within the timeout. Each consumed bucket is re-checked against the
    /// last-access index, so a key touched again after the bucket's instant
    /// survives.
    pub fn sweep(&mut self) -> SweepOutcome {
        let now = self.clock.now();
        let pending = self.index.pending();
        let mut outcome = SweepOutcome::default();

        while let Some(candidates) = self.index.pop_expired(now, self.timeout) {
            for key in candidates {
                if !self.index.is_stale(&key, now, self.timeout) {
                    continue;
                }

                if let (Some(callback), Some(value)) =
                    (self.on_evict.as_mut(), self.store.get(&key))
                {
                    if let Err(err) = run_callback(callback, value) {
                        warn!(error = %err, "eviction callback failed");
                        self.stats.record_callback_failure();
                        outcome.callback_failures += 1;
                    }
                }

                self.index.forget(&key);
                if self.store.remove(&key).is_some() {
                    outcome.evicted += 1;
                }
            }
        }

        outcome.scanned = pending - self.index.pending();
        self.schedule.mark(now);
        self.stats.record_sweep();
        self.stats.record_evictions(outcome.evicted as u64);

        if outcome.evicted > 0 {
            debug!(scanned = outcome.scanned, "{} keys swept", outcome.evicted);
        }

        outcome
    }

    /// Sweep only if the configured sweep interval has elapsed
    ///
    /// Without a sweep interval every call sweeps.
    pub fn maybe_sweep(&mut self) -> Option<SweepOutcome> {
        if !self.schedule.is_due(self.clock.now()) {
            return None;
        }
        Some(self.sweep())
    }

    fn touch(&mut self, key: K) {
        let now = self.clock.now();
        self.index.record(key, now);
    }
}

fn run_callback<V>(
    callback: &mut EvictCallback<V>,
    value: &V,
) -> std::result::Result<(), EvictError> {
    match panic::catch_unwind(AssertUnwindSafe(|| callback(value))) {
        Ok(result) => result,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(format!("callback panicked: {}", msg).into())
        }
    }
}

impl<K, V, C> Extend<(K, V)> for TimedCache<K, V, C>
where
    K: Hash + Eq + Clone,
    C: Clock,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<'a, K, V, C> IntoIterator for &'a TimedCache<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = hash_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.store.iter()
    }
}

impl<K, V, C> fmt::Debug for TimedCache<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedCache")
            .field("timeout", &self.timeout)
            .field("len", &self.store.len())
            .field("pending_accesses", &self.index.pending())
            .field("on_evict", &self.on_evict.is_some())
            .finish()
    }
}
