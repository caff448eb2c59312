//! Login throttling
//!
//! Failed sign-ins are counted per lower-cased identifier. Each failure earns a
//! progressively longer delay; reaching the attempt ceiling blocks the identifier
//! for a fixed period. A successful sign-in forgets the identifier.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::AuthConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleSettings {
    pub max_attempts: u32,
    pub block: Duration,
    pub delay_per_attempt: Duration,
}

impl From<&AuthConfig> for ThrottleSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            max_attempts: config.login_max_attempts.max(1),
            block: Duration::from_secs(config.login_block_minutes * 60),
            delay_per_attempt: Duration::from_millis(config.login_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AttemptState {
    attempts: u32,
    last_attempt: Instant,
    blocked_until: Option<Instant>,
}

/// Outcome of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Wait this long before answering
    Delay(Duration),
    /// The identifier is now blocked for this long
    Blocked(Duration),
}

#[derive(Clone)]
pub struct LoginThrottle {
    entries: Arc<DashMap<String, AttemptState>>,
    settings: ThrottleSettings,
}

fn key(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Whole minutes, rounded up, for user-facing messages
pub fn minutes_ceil(duration: Duration) -> u64 {
    duration.as_secs().div_ceil(60).max(1)
}

impl LoginThrottle {
    pub fn new(settings: ThrottleSettings) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            settings,
        }
    }

    /// `Err(remaining)` while the identifier is blocked
    pub fn check(&self, identifier: &str) -> Result<(), Duration> {
        let key = key(identifier);
        let now = Instant::now();
        let Some(state) = self.entries.get(&key).map(|e| *e) else {
            return Ok(());
        };
        match state.blocked_until {
            Some(until) if until > now => Err(until - now),
            Some(_) => {
                // block served; start over
                self.entries.remove(&key);
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn record_failure(&self, identifier: &str) -> FailureOutcome {
        let now = Instant::now();
        let mut entry = self.entries.entry(key(identifier)).or_insert(AttemptState {
            attempts: 0,
            last_attempt: now,
            blocked_until: None,
        });
        entry.attempts += 1;
        entry.last_attempt = now;

        if entry.attempts >= self.settings.max_attempts {
            entry.blocked_until = Some(now + self.settings.block);
            tracing::warn!(attempts = entry.attempts, "login blocked after repeated failures");
            return FailureOutcome::Blocked(self.settings.block);
        }
        FailureOutcome::Delay(self.settings.delay_per_attempt * entry.attempts)
    }

    pub fn record_success(&self, identifier: &str) {
        self.entries.remove(&key(identifier));
    }

    /// Forget identifiers that are neither blocked nor recently active
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        let block = self.settings.block;
        self.entries.retain(|_, s| {
            let blocked = s.blocked_until.map(|u| u > now).unwrap_or(false);
            blocked || now.duration_since(s.last_attempt) <= block
        });
        before.saturating_sub(self.entries.len())
    }

    pub fn tracked(&self) -> usize {
        self.entries.len()
    }
}
