//! Synthetic connection traffic and run summary

use std::time::{Duration, Instant};
use serde::Serialize;
use timedcache::SweepOutcome;

/// A simulated client association held in the cache
#[derive(Debug)]
pub struct Session {
    pub id: u64,
    pub opened: Instant,
}

impl Session {
    pub fn open(id: u64) -> Self {
        Self {
            id,
            opened: Instant::now(),
        }
    }
}

/// Traffic generator
///
/// Each tick touches a rotating window of the hot keys and opens a few
/// brand new keys. Everything outside the hot set goes idle and is left for
/// the sweep.
#[derive(Debug)]
pub struct Traffic {
    hot_keys: u64,
    per_tick: u64,
    new_per_tick: u64,
    cursor: u64,
    next_id: u64,
}

impl Traffic {
    pub fn new(hot_keys: u64, per_tick: u64, new_per_tick: u64, first_new_id: u64) -> Self {
        Self {
            hot_keys: hot_keys.max(1),
            per_tick,
            new_per_tick,
            cursor: 0,
            next_id: first_new_id,
        }
    }

    /// Keys read this tick
    pub fn touched(&mut self) -> Vec<u64> {
        let batch = (0..self.per_tick)
            .map(|i| (self.cursor + i) % self.hot_keys)
            .collect();
        self.cursor = (self.cursor + self.per_tick) % self.hot_keys;
        batch
    }

    /// Keys opened this tick
    pub fn opened(&mut self) -> std::ops::Range<u64> {
        let start = self.next_id;
        self.next_id += self.new_per_tick;
        start..self.next_id
    }
}

/// Totals reported at the end of a run
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub ticks: u64,
    pub reopened: u64,
    pub remaining: usize,
    pub evicted: u64,
    pub closed: u64,
    pub sweeps: u64,
    pub callback_failures: u64,
    pub max_scanned: usize,
    pub max_sweep_micros: u128,
}

impl Summary {
    pub fn record_sweep(&mut self, outcome: &SweepOutcome, elapsed: Duration) {
        self.sweeps += 1;
        self.evicted += outcome.evicted as u64;
        self.callback_failures += outcome.callback_failures as u64;
        self.max_scanned = self.max_scanned.max(outcome.scanned);
        self.max_sweep_micros = self.max_sweep_micros.max(elapsed.as_micros());
    }
}
