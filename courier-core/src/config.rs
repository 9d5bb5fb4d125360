//! Session configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default address domain appended to normalized phone numbers
pub const DEFAULT_ADDRESS_DOMAIN: &str = "s.whatsapp.net";

/// Per-session behavior shared by every session in a registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Delay after each delivery attempt before the next queued item
    pub pacing_interval_ms: u64,

    /// Maximum queued messages per session (0 = unbounded)
    pub queue_capacity: usize,

    /// Number of delivery records kept per session
    pub history_limit: usize,

    /// Domain suffixed to normalized destinations
    pub address_domain: String,

    /// Reconnection backoff settings
    pub reconnect: ReconnectConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pacing_interval_ms: 2_000,
            queue_capacity: 10_000,
            history_limit: 200,
            address_domain: DEFAULT_ADDRESS_DOMAIN.to_string(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Pacing interval as a Duration
    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }
}

/// Reconnection backoff settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the second attempt; the first attempt is immediate
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay
    pub max_delay_ms: u64,

    /// Multiplier applied per attempt
    pub factor: f64,

    /// Attempts allowed within `window_secs` (0 = unlimited)
    pub max_attempts: u32,

    /// Sliding window for counting attempts
    pub window_secs: u64,

    /// A link open at least this long resets the attempt budget
    pub stable_after_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            factor: 2.0,
            max_attempts: 10,
            window_secs: 300,
            stable_after_secs: 30,
        }
    }
}

impl ReconnectConfig {
    /// Reconnect immediately and forever, with no backoff
    pub fn unbounded() -> Self {
        Self {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            factor: 1.0,
            max_attempts: 0,
            ..Self::default()
        }
    }
}
