//! Bounded fixed-window counter table.
//!
//! One [`RateWindow`] per client key. A window is reset when
//! `now - window_start >= window`; otherwise its count only grows.
//!
//! The table holds at most `max_entries` keys. Inserting a new key into a
//! full table first drops expired windows, then, if still full, evicts the
//! oldest tenth of the table in one pass. One scan buys room for many new
//! keys, so a flood of fresh client keys costs amortized constant work each.
//! The bound is soft under concurrent inserts of distinct new keys: only one
//! caller makes room at a time, the others insert regardless.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Request counter for one client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub window_start: Instant,
}

impl RateWindow {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }

    /// Start a fresh window if the current one has run out.
    fn roll(&mut self, now: Instant, window: Duration) {
        if self.is_expired(now, window) {
            self.count = 0;
            self.window_start = now;
        }
    }
}

/// Concurrent table of fixed windows keyed by client.
///
/// Read-modify-write on one key holds that key's shard lock, so concurrent
/// requests from the same client never lose increments.
#[derive(Debug)]
pub struct WindowTable {
    windows: DashMap<String, RateWindow>,
    window: Duration,
    max_entries: usize,
    evicting: AtomicBool,
}

/// Fraction of the table (1/N) dropped by one eviction pass.
const EVICT_DIVISOR: usize = 10;

impl WindowTable {
    pub fn new(window: Duration, max_entries: usize) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_entries: max_entries.max(1),
            evicting: AtomicBool::new(false),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count one request for `key` and return the post-increment count.
    pub fn hit_at(&self, key: &str, now: Instant) -> u32 {
        self.make_room_for(key, now);
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| RateWindow::new(now));
        entry.roll(now, self.window);
        entry.count = entry.count.saturating_add(1);
        entry.count
    }

    /// Count one request for `key` only while it is under `limit`.
    ///
    /// Returns `Ok(count)` after incrementing, or `Err(count)` with the
    /// unchanged count when the window is already full.
    pub fn admit_at(&self, key: &str, limit: u32, now: Instant) -> Result<u32, u32> {
        self.make_room_for(key, now);
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| RateWindow::new(now));
        entry.roll(now, self.window);
        if entry.count >= limit {
            return Err(entry.count);
        }
        entry.count += 1;
        Ok(entry.count)
    }

    /// Current count for `key`, treating an expired window as empty.
    pub fn peek_at(&self, key: &str, now: Instant) -> u32 {
        self.windows
            .get(key)
            .filter(|w| !w.is_expired(now, self.window))
            .map(|w| w.count)
            .unwrap_or(0)
    }

    /// Snapshot of the stored window for `key`.
    pub fn get(&self, key: &str) -> Option<RateWindow> {
        self.windows.get(key).map(|w| *w)
    }

    /// Drop every window that has run out. Returns how many were removed.
    pub fn prune_expired(&self, now: Instant) -> usize {
        let before = self.windows.len();
        let window = self.window;
        self.windows.retain(|_, w| !w.is_expired(now, window));
        before.saturating_sub(self.windows.len())
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// How many windows one eviction pass drops.
    pub fn eviction_batch(&self) -> usize {
        (self.max_entries / EVICT_DIVISOR).max(1)
    }

    fn make_room_for(&self, key: &str, now: Instant) {
        if self.windows.len() < self.max_entries || self.windows.contains_key(key) {
            return;
        }
        if self
            .evicting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let pruned = self.prune_expired(now);
        let evicted = if self.windows.len() >= self.max_entries {
            self.evict_oldest(self.eviction_batch())
        } else {
            0
        };
        self.evicting.store(false, Ordering::Release);

        tracing::debug!(pruned, evicted, "Made room in full rate window table");
    }

    /// Remove the `count` windows that started earliest.
    fn evict_oldest(&self, count: usize) -> usize {
        let mut starts: Vec<(Instant, String)> = self
            .windows
            .iter()
            .map(|w| (w.value().window_start, w.key().clone()))
            .collect();
        let count = count.min(starts.len());
        if count == 0 {
            return 0;
        }
        if count < starts.len() {
            starts.select_nth_unstable_by_key(count - 1, |(start, _)| *start);
        }
        starts.truncate(count);
        starts
            .iter()
            .filter(|(_, key)| self.windows.remove(key).is_some())
            .count()
    }
}
