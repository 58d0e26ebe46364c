//! Error types for timedcache

use std::fmt;

/// Result type alias for timedcache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by an eviction callback
///
/// The cache logs and counts these; they never abort a sweep.
pub type EvictError = Box<dyn std::error::Error + Send + Sync>;

/// Error types for cache operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Key not found
    NotFound,

    /// Rejected configuration value
    InvalidConfiguration(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound => write!(f, "Key not found"),
            Error::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::NotFound.to_string(), "Key not found");
        assert_eq!(
            Error::InvalidConfiguration("timeout must be non-zero".into()).to_string(),
            "Invalid configuration: timeout must be non-zero"
        );
    }

    #[test]
    fn test_evict_error_from_str() {
        let err: EvictError = "socket already closed".into();
        assert_eq!(err.to_string(), "socket already closed");
    }
}
