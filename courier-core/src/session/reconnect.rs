//! Reconnect policy with capped exponential backoff
//!
//! The first attempt after a closure is immediate. Later attempts back off
//! exponentially up to `max_delay`. Attempts are counted in a sliding window;
//! exhausting the budget means the link is crash-looping and the session
//! gives up. Only a link that stayed open for `stable_after` resets the
//! budget, so "opens then immediately closes" still counts against it.

use std::time::{Duration, Instant};

use crate::config::ReconnectConfig;

/// Backoff state for one session
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempts: Vec<Instant>,
    consecutive: u32,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: Vec::new(),
            consecutive: 0,
        }
    }

    /// Record an attempt and get its delay
    ///
    /// Returns `None` when the attempt budget for the window is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_secs);
        self.attempts.retain(|t| now.duration_since(*t) < window);

        if self.config.max_attempts > 0 && self.attempts.len() >= self.config.max_attempts as usize
        {
            return None;
        }

        let delay = self.delay_for(self.consecutive);
        self.attempts.push(now);
        self.consecutive = self.consecutive.saturating_add(1);
        Some(delay)
    }

    /// Delay for the n-th consecutive attempt (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base = self.config.initial_delay_ms as f64;
        let scaled = base * self.config.factor.powi(attempt as i32 - 1);
        let capped = scaled.min(self.config.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// A link closed after being open for `uptime`
    ///
    /// Long-lived links prove the credentials and network are healthy, so
    /// the budget starts over.
    pub fn link_closed_after(&mut self, uptime: Duration) {
        if uptime >= Duration::from_secs(self.config.stable_after_secs) {
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.attempts.clear();
        self.consecutive = 0;
    }

    /// Attempts counted in the current window
    pub fn recent_attempts(&self) -> usize {
        self.attempts.len()
    }
}
