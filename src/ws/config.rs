#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use backoff::backoff::Backoff;

const DEFAULT_HEARTBEAT_INTERVAL_DURATION: Duration = Duration::from_millis(4000);
const DEFAULT_HEARTBEAT_TIMEOUT_DURATION: Duration = Duration::from_millis(12_000);
const DEFAULT_BASE_DELAY_DURATION: Duration = Duration::from_millis(3000);
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Configuration for the feed connection behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Interval for sending heartbeat frames to keep the connection alive
    pub heartbeat_interval: Duration,
    /// Maximum inbound silence before the connection is considered dead
    pub heartbeat_timeout: Duration,
    /// Reconnection strategy configuration
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL_DURATION,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT_DURATION,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Configuration for automatic reconnection behavior.
///
/// The policy is bounded linear backoff: the n-th reconnection attempt is
/// scheduled `base_delay * n` after the previous failure (3 s, 6 s, 9 s, …
/// with defaults), and after `max_attempts` consecutive failures the
/// connection settles in the failed state until an explicit reconnect.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts before giving up.
    /// `None` means infinite retries.
    pub max_attempts: Option<u32>,
    /// Delay multiplier; attempt n waits `base_delay * n`
    pub base_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            base_delay: DEFAULT_BASE_DELAY_DURATION,
        }
    }
}

/// Linearly increasing backoff over the [`Backoff`] trait.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base_delay: Duration,
    attempt: u32,
}

impl From<ReconnectConfig> for LinearBackoff {
    fn from(config: ReconnectConfig) -> Self {
        Self {
            base_delay: config.base_delay,
            attempt: 0,
        }
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt = self.attempt.saturating_add(1);
        Some(self.base_delay.saturating_mul(self.attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_sequence_is_linear() {
        let config = ReconnectConfig::default();
        let mut backoff: LinearBackoff = config.into();

        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(3)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(6)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(9)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(12)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn backoff_restarts_after_reset() {
        let mut backoff: LinearBackoff = ReconnectConfig::default().into();

        let _first = backoff.next_backoff();
        let _second = backoff.next_backoff();
        backoff.reset();

        // A failure after a successful reconnect starts over at base_delay * 1.
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn default_heartbeat_is_four_seconds() {
        let config = Config::default();
        assert_eq!(config.heartbeat_interval, Duration::from_millis(4000));
        assert_eq!(config.heartbeat_timeout, Duration::from_millis(12_000));
    }

    #[test]
    fn default_reconnect_is_bounded() {
        let config = ReconnectConfig::default();
        assert_eq!(config.max_attempts, Some(5));
        assert_eq!(config.base_delay, Duration::from_secs(3));
    }
}
