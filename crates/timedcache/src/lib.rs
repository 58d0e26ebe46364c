//! # timedcache
//!
//! Key-value cache that evicts entries by time since last access.
//!
//! ## Architecture
//! - **Store**: AHash map of live entries (O(1))
//! - **Access index**: last-access map, per-instant key buckets and a FIFO
//!   access log
//! - **Sweep**: caller-driven, consumes the access log oldest-first and costs
//!   O(recent accesses) instead of O(live keys)
//!
//! Built for many mostly idle keys, e.g. one entry per client association in
//! a proxy. The cache is single-threaded: it takes `&mut self` everywhere and
//! does no locking of its own.
//!
//! ```
//! use std::time::Duration;
//! use timedcache::{ManualClock, TimedCache};
//!
//! let clock = ManualClock::new();
//! let mut cache = TimedCache::with_clock(Duration::from_secs(30), clock.clone());
//!
//! cache.put("client-1", 7);
//! clock.advance(Duration::from_secs(31));
//!
//! assert_eq!(cache.sweep().evicted, 1);
//! assert!(cache.is_empty());
//! ```

#![warn(missing_docs)]

mod cache;
mod clock;
mod config;
mod error;
mod index;
mod schedule;
mod stats;

pub use cache::{SweepOutcome, TimedCache};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{Config, DEFAULT_TIMEOUT};
pub use error::{Error, EvictError, Result};
pub use schedule::SweepSchedule;
pub use stats::CacheStats;
