//! Cache configuration

use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default idle timeout (60 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for a [`TimedCache`](crate::TimedCache)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Idle time after which an untouched key may be swept
    pub timeout: Duration,

    /// Minimum time between sweeps run through `maybe_sweep`
    pub sweep_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            sweep_interval: None,
        }
    }
}

impl Config {
    /// Create a config with the given timeout and no sweep interval
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            sweep_interval: None,
        }
    }

    /// Set the sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Reject zero timeouts and zero sweep intervals
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfiguration(
                "timeout must be greater than zero".into(),
            ));
        }
        if self.sweep_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(Error::InvalidConfiguration(
                "sweep interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
