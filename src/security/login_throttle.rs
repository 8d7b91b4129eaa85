//! Login attempt throttling.
//!
//! Separate from the API limiter: longer window, lower threshold, and a
//! client already at the threshold is turned away without being counted and
//! before any password work happens. Every admitted attempt counts, whether
//! the password turns out right or wrong, and success does not reset the
//! counter.

use std::time::{Duration, Instant};

use crate::config::LoginThrottleConfig;
use crate::security::window::WindowTable;

/// Outcome of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Attempt admitted; `attempt` is its position within the window.
    Admit { attempt: u32 },
    /// Threshold already reached in the current window.
    Reject { attempts: u32 },
}

#[derive(Debug)]
pub struct LoginThrottle {
    table: WindowTable,
    max_attempts: u32,
}

impl LoginThrottle {
    pub fn new(config: &LoginThrottleConfig) -> Self {
        Self {
            table: WindowTable::new(Duration::from_secs(config.window_secs), config.max_entries),
            max_attempts: config.max_attempts,
        }
    }

    pub fn admit(&self, key: &str) -> ThrottleDecision {
        self.admit_at(key, Instant::now())
    }

    pub fn admit_at(&self, key: &str, now: Instant) -> ThrottleDecision {
        match self.table.admit_at(key, self.max_attempts, now) {
            Ok(attempt) => ThrottleDecision::Admit { attempt },
            Err(attempts) => ThrottleDecision::Reject { attempts },
        }
    }

    /// Attempts recorded for `key` in its current window.
    pub fn attempts(&self, key: &str) -> u32 {
        self.table.peek_at(key, Instant::now())
    }

    pub fn table(&self) -> &WindowTable {
        &self.table
    }
}
