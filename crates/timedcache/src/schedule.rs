//! Periodic sweep gating
//!
//! Event loops poll far more often than a sweep is worth running. The
//! schedule remembers when the last sweep happened and reports whether the
//! next one is due.

use std::time::{Duration, Instant};

/// Tracks when the next sweep is due
#[derive(Debug, Clone)]
pub struct SweepSchedule {
    interval: Option<Duration>,
    last: Instant,
}

impl SweepSchedule {
    /// Create a schedule whose first sweep is due `interval` after `start`
    pub fn new(interval: Option<Duration>, start: Instant) -> Self {
        Self {
            interval,
            last: start,
        }
    }

    /// Configured interval; `None` means every poll is due
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Instant of the last recorded sweep
    pub fn last(&self) -> Instant {
        self.last
    }

    /// Whether more than `interval` has passed since the last sweep
    pub fn is_due(&self, now: Instant) -> bool {
        match self.interval {
            Some(interval) => now.saturating_duration_since(self.last) > interval,
            None => true,
        }
    }

    /// Record a sweep at `now`
    pub fn mark(&mut self, now: Instant) {
        self.last = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_without_interval_always_due() {
        let start = Instant::now();
        let schedule = SweepSchedule::new(None, start);
        assert!(schedule.is_due(start));
    }

    #[test]
    fn test_schedule_due_after_interval() {
        let start = Instant::now();
        let mut schedule = SweepSchedule::new(Some(Duration::from_secs(3)), start);

        assert!(!schedule.is_due(start + Duration::from_secs(3)));
        assert!(schedule.is_due(start + Duration::from_millis(3001)));

        schedule.mark(start + Duration::from_secs(4));
        assert_eq!(schedule.last(), start + Duration::from_secs(4));
        assert!(!schedule.is_due(start + Duration::from_secs(6)));
        assert!(schedule.is_due(start + Duration::from_secs(8)));
    }
}
