//! Bus configuration.

use std::env;
use std::time::Duration;

/// Settings for a [`crate::MessageBus`] instance.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Consumer group this bus polls under.
    pub group_id: String,
    /// How long each poll waits for a message before looping back to check
    /// for cancellation.
    pub poll_interval: Duration,
    /// Upper bound on a dead-letter publish; past it the message is dropped
    /// with a critical log.
    pub dlq_publish_timeout: Duration,
}

impl BusConfig {
    /// Creates a config with the default poll interval (100 ms) and
    /// dead-letter timeout (30 s).
    #[must_use]
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            poll_interval: Duration::from_millis(100),
            dlq_publish_timeout: Duration::from_secs(30),
        }
    }

    /// Reads the config from the environment, falling back to defaults:
    /// `BUS_GROUP_ID` (default `reliefnet`), `BUS_POLL_INTERVAL_MS`,
    /// `BUS_DLQ_TIMEOUT_MS`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::new(env_string("BUS_GROUP_ID", "reliefnet"));
        if let Some(ms) = env_millis("BUS_POLL_INTERVAL_MS") {
            config.poll_interval = ms;
        }
        if let Some(ms) = env_millis("BUS_DLQ_TIMEOUT_MS") {
            config.dlq_publish_timeout = ms;
        }
        config
    }
}

fn env_string(key: &str, fallback: &str) -> String {
    env::var(key).unwrap_or_else(|_| fallback.to_owned())
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key).ok()?.parse().ok().map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BusConfig::new("disaster-service");

        assert_eq!(config.group_id, "disaster-service");
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.dlq_publish_timeout, Duration::from_secs(30));
    }
}
