//! Fixed-window rate limiting for API routes.
//!
//! Each client key gets `max_requests` per window. The window is fixed, not
//! sliding: a client can send up to twice the limit across a window boundary
//! (the end of one window and the start of the next). Rejected requests still
//! count, so a client hammering through a rejection keeps its window full.

use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;
use crate::security::window::WindowTable;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow { count: u32 },
    Reject { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allow { .. })
    }
}

/// Per-client fixed-window limiter.
#[derive(Debug)]
pub struct RateLimiter {
    table: WindowTable,
    max_requests: u32,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            table: WindowTable::new(Duration::from_secs(config.window_secs), config.max_entries),
            max_requests: config.max_requests,
            enabled: config.enabled,
        }
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        if !self.enabled {
            return RateDecision::Allow { count: 0 };
        }
        let count = self.table.hit_at(key, now);
        if count > self.max_requests {
            RateDecision::Reject {
                retry_after: self.table.window(),
            }
        } else {
            RateDecision::Allow { count }
        }
    }

    pub fn table(&self) -> &WindowTable {
        &self.table
    }
}
