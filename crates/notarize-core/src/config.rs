//! Polling cadence and limits for a notarization run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding [`NotarizeConfig::queue_poll_interval`] (seconds).
pub const ENV_QUEUE_POLL_SECS: &str = "NOTARIZE_QUEUE_POLL_SECS";

/// Environment variable overriding [`NotarizeConfig::transient_backoff`] (seconds).
pub const ENV_BACKOFF_SECS: &str = "NOTARIZE_BACKOFF_SECS";

/// Environment variable setting [`NotarizeConfig::deadline`] (seconds, 0 = none).
pub const ENV_DEADLINE_SECS: &str = "NOTARIZE_DEADLINE_SECS";

/// Timing configuration for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotarizeConfig {
    /// Tick between polls while the submission is still queued (code 1519).
    pub queue_poll_interval: Duration,

    /// Delay between successful info/log polls. Zero polls back to back,
    /// paced only by the service's response time.
    pub poll_interval: Duration,

    /// Wait after a transient network error (code -19000).
    pub transient_backoff: Duration,

    /// Optional cap on the whole run. `None` waits as long as it takes.
    pub deadline: Option<Duration>,
}

impl Default for NotarizeConfig {
    fn default() -> Self {
        Self {
            queue_poll_interval: Duration::from_secs(10),
            poll_interval: Duration::ZERO,
            transient_backoff: Duration::from_secs(5),
            deadline: None,
        }
    }
}

impl NotarizeConfig {
    /// Defaults, overridden by any `NOTARIZE_*` environment variables present.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env_secs(ENV_QUEUE_POLL_SECS) {
            config.queue_poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs(ENV_BACKOFF_SECS) {
            config.transient_backoff = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs(ENV_DEADLINE_SECS) {
            config.deadline = (secs > 0).then(|| Duration::from_secs(secs));
        }
        config
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_queue_poll_interval(mut self, interval: Duration) -> Self {
        self.queue_poll_interval = interval;
        self
    }

    pub fn with_transient_backoff(mut self, backoff: Duration) -> Self {
        self.transient_backoff = backoff;
        self
    }
}

fn env_secs(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(secs) => Some(secs),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring non-numeric duration");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_cadence() {
        let config = NotarizeConfig::default();
        assert_eq!(config.queue_poll_interval, Duration::from_secs(10));
        assert_eq!(config.transient_backoff, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::ZERO);
        assert!(config.deadline.is_none());
    }

    #[test]
    fn test_builders() {
        let config = NotarizeConfig::default()
            .with_deadline(Duration::from_secs(3600))
            .with_queue_poll_interval(Duration::from_secs(1))
            .with_transient_backoff(Duration::from_millis(250));
        assert_eq!(config.deadline, Some(Duration::from_secs(3600)));
        assert_eq!(config.queue_poll_interval, Duration::from_secs(1));
        assert_eq!(config.transient_backoff, Duration::from_millis(250));
    }
}
