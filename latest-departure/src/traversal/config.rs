//! Traversal configuration.

use std::time::Duration;

use crate::domain::SECS_PER_HOUR;

/// Configuration parameters for a latest-departure traversal.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    /// How far the query window reaches back, and how far it slides
    /// each time the loaded schedule is exhausted (seconds).
    pub window_increment_secs: u32,

    /// Upper bound on each schedule store call (seconds).
    /// A call that takes longer fails the whole query.
    pub store_timeout_secs: u64,
}

impl TraversalConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(window_increment_secs: u32, store_timeout_secs: u64) -> Self {
        Self {
            window_increment_secs,
            store_timeout_secs,
        }
    }

    /// A configuration that loads the whole day in a single window.
    pub fn single_window() -> Self {
        Self {
            window_increment_secs: u32::MAX,
            ..Self::default()
        }
    }

    /// Returns the store timeout as a Duration.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            window_increment_secs: SECS_PER_HOUR,
            store_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TraversalConfig::default();

        assert_eq!(config.window_increment_secs, 3600);
        assert_eq!(config.store_timeout_secs, 30);
        assert_eq!(config.store_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn custom_config() {
        let config = TraversalConfig::new(900, 5);

        assert_eq!(config.window_increment_secs, 900);
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn single_window_keeps_timeout() {
        let config = TraversalConfig::single_window();

        assert_eq!(config.window_increment_secs, u32::MAX);
        assert_eq!(config.store_timeout_secs, 30);
    }
}
