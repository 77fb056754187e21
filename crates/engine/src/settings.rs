use std::time::Duration;

use common::Config;

/// Timings and limits of the monitoring loop.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Wait after a completed cycle.
    pub cycle_interval: Duration,
    /// Wait when no conditions are configured.
    pub idle_wait: Duration,
    /// Wait after a cycle fails.
    pub error_backoff: Duration,
    /// Wait after the provider rate-limits a fetch.
    pub rate_limit_backoff: Duration,
    /// Pause for `pace_pause` after every `pace_every` fetches.
    pub pace_every: usize,
    pub pace_pause: Duration,
    /// Minimum time between two alerts with the same key.
    pub cooldown: Duration,
    /// Notification length budget, in characters.
    pub max_message_chars: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(30),
            idle_wait: Duration::from_secs(30),
            error_backoff: Duration::from_secs(60),
            rate_limit_backoff: Duration::from_secs(60),
            pace_every: 50,
            pace_pause: Duration::from_millis(500),
            cooldown: Duration::from_secs(300),
            max_message_chars: 4000,
        }
    }
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cycle_interval: Duration::from_secs(config.cycle_interval_secs),
            idle_wait: Duration::from_secs(config.cycle_interval_secs),
            cooldown: Duration::from_secs(config.alert_cooldown_secs),
            ..Self::default()
        }
    }
}
