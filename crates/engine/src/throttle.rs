use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// What an alert is deduplicated on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AlertKey {
    /// An ungrouped condition firing for one symbol.
    Condition { symbol: String, identity: String },
    /// A whole group firing for one symbol.
    Group { symbol: String, group: String },
}

/// Per-key cooldown store. Entries are overwritten, never evicted; the
/// store is dropped when monitoring stops.
#[derive(Debug)]
pub struct AlertThrottle {
    cooldown: Duration,
    last_fired: HashMap<AlertKey, Instant>,
}

impl AlertThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: HashMap::new(),
        }
    }

    /// True if `key` never fired or fired at least `cooldown` before `now`.
    pub fn should_fire(&self, key: &AlertKey, now: Instant) -> bool {
        match self.last_fired.get(key) {
            Some(&last) => now.saturating_duration_since(last) >= self.cooldown,
            None => true,
        }
    }

    pub fn record(&mut self, key: AlertKey, now: Instant) {
        self.last_fired.insert(key, now);
    }

    /// `should_fire` followed by `record` when it passes.
    pub fn try_fire(&mut self, key: AlertKey, now: Instant) -> bool {
        if self.should_fire(&key, now) {
            self.record(key, now);
            true
        } else {
            false
        }
    }
}
