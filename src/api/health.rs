//! Shared health state for the /health endpoint.
//! Updated by the refresh task, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Unix seconds of the last completed tick (0 = none yet).
    pub last_tick_at_secs: AtomicU64,
    /// Lifetime count of completed ticks.
    pub ticks_completed: AtomicU64,
    /// Lifetime count of per-symbol quote fetch failures (live mode).
    pub quote_failures: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self, now_secs: u64) {
        self.last_tick_at_secs.store(now_secs, Ordering::Relaxed);
        self.ticks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_quote_failure(&self) {
        self.quote_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_tick_at_secs(&self) -> u64 {
        self.last_tick_at_secs.load(Ordering::Relaxed)
    }

    pub fn ticks_completed(&self) -> u64 {
        self.ticks_completed.load(Ordering::Relaxed)
    }

    pub fn quote_failures(&self) -> u64 {
        self.quote_failures.load(Ordering::Relaxed)
    }
}
