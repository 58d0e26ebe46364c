//! Access-time bookkeeping
//!
//! Three structures cooperate so that a sweep only touches recent accesses:
//! - **last access**: key -> most recent access instant (authoritative)
//! - **buckets**: instant -> keys accessed at exactly that instant
//! - **log**: FIFO of every access instant, oldest first
//!
//! Every access appends one key to one bucket and one instant to the log, so
//! a bucket with `n` members accounts for exactly `n` log entries.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::{Duration, Instant};
use ahash::RandomState;

/// Access index over keys of type `K`
pub(crate) struct AccessIndex<K> {
    last_access: HashMap<K, Instant, RandomState>,
    buckets: HashMap<Instant, Vec<K>, RandomState>,
    log: VecDeque<Instant>,
}

impl<K> AccessIndex<K>
where
    K: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self {
            last_access: HashMap::with_hasher(RandomState::new()),
            buckets: HashMap::with_hasher(RandomState::new()),
            log: VecDeque::new(),
        }
    }

    /// Record an access to `key` at `at`
    pub fn record(&mut self, key: K, at: Instant) {
        self.buckets.entry(at).or_default().push(key.clone());
        self.log.push_back(at);
        self.last_access.insert(key, at);
    }

    /// Drop the last-access entry for `key`
    ///
    /// Bucket members and log entries stay until a sweep consumes them.
    pub fn forget(&mut self, key: &K) -> bool {
        self.last_access.remove(key).is_some()
    }

    pub fn last_access(&self, key: &K) -> Option<Instant> {
        self.last_access.get(key).copied()
    }

    /// Whether `key` is tracked and idle for longer than `timeout`
    pub fn is_stale(&self, key: &K, now: Instant, timeout: Duration) -> bool {
        self.last_access
            .get(key)
            .is_some_and(|&at| now.saturating_duration_since(at) > timeout)
    }

    /// Consume the oldest bucket if its instant is older than `timeout`
    ///
    /// Pops one log entry per bucket member and returns the members. Members
    /// are only candidates: the caller must check [`is_stale`] for each since
    /// a key may have been touched again after this instant.
    ///
    /// [`is_stale`]: AccessIndex::is_stale
    pub fn pop_expired(&mut self, now: Instant, timeout: Duration) -> Option<Vec<K>> {
        let &oldest = self.log.front()?;
        if now.saturating_duration_since(oldest) <= timeout {
            return None;
        }

        let members = self.buckets.remove(&oldest).unwrap_or_default();
        // Pop at least one entry so the sweep loop always makes progress.
        let count = members.len().max(1).min(self.log.len());
        self.log.drain(..count);
        Some(members)
    }

    pub fn clear(&mut self) {
        self.last_access.clear();
        self.buckets.clear();
        self.log.clear();
    }
}

impl<K> AccessIndex<K> {
    /// Log entries not yet consumed by a sweep
    pub fn pending(&self) -> usize {
        self.log.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_record_updates_last_access() {
        let mut index = AccessIndex::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);

        index.record("a", t0);
        index.record("a", t1);

        assert_eq!(index.last_access(&"a"), Some(t1));
        assert_eq!(index.pending(), 2);
    }

    #[test]
    fn test_same_instant_shares_bucket() {
        let mut index = AccessIndex::new();
        let t0 = Instant::now();

        index.record("a", t0);
        index.record("b", t0);
        index.record("a", t0);

        let members = index
            .pop_expired(t0 + TIMEOUT + Duration::from_millis(1), TIMEOUT)
            .unwrap();
        assert_eq!(members, vec!["a", "b", "a"]);
        assert_eq!(index.pending(), 0);
    }

    #[test]
    fn test_pop_expired_stops_at_fresh_entry() {
        let mut index = AccessIndex::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(5);

        index.record("a", t0);
        index.record("b", t1);

        let now = t0 + Duration::from_secs(12);
        assert_eq!(index.pop_expired(now, TIMEOUT), Some(vec!["a"]));
        assert_eq!(index.pop_expired(now, TIMEOUT), None);
        assert_eq!(index.pending(), 1);
    }

    #[test]
    fn test_pop_expired_boundary_is_not_stale() {
        let mut index = AccessIndex::new();
        let t0 = Instant::now();

        index.record("a", t0);

        assert_eq!(index.pop_expired(t0 + TIMEOUT, TIMEOUT), None);
        assert!(!index.is_stale(&"a", t0 + TIMEOUT, TIMEOUT));
        assert!(index.is_stale(&"a", t0 + TIMEOUT + Duration::from_nanos(1), TIMEOUT));
    }

    #[test]
    fn test_refreshed_key_is_not_stale() {
        let mut index = AccessIndex::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(8);

        index.record("a", t0);
        index.record("a", t1);

        let now = t0 + Duration::from_secs(11);
        let members = index.pop_expired(now, TIMEOUT).unwrap();
        assert_eq!(members, vec!["a"]);
        assert!(!index.is_stale(&"a", now, TIMEOUT));
    }

    #[test]
    fn test_forget_leaves_log_for_sweep() {
        let mut index = AccessIndex::new();
        let t0 = Instant::now();

        index.record("a", t0);
        assert!(index.forget(&"a"));
        assert!(!index.forget(&"a"));
        assert_eq!(index.last_access(&"a"), None);
        assert_eq!(index.pending(), 1);

        let now = t0 + TIMEOUT * 2;
        assert!(!index.is_stale(&"a", now, TIMEOUT));
        assert_eq!(index.pop_expired(now, TIMEOUT), Some(vec!["a"]));
        assert_eq!(index.pending(), 0);
    }

    #[test]
    fn test_clear() {
        let mut index = AccessIndex::new();
        let t0 = Instant::now();

        index.record(1u32, t0);
        index.record(2u32, t0);
        index.clear();

        assert_eq!(index.pending(), 0);
        assert_eq!(index.last_access(&1), None);
        assert_eq!(index.pop_expired(t0 + TIMEOUT * 2, TIMEOUT), None);
    }
}
