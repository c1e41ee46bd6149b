//! Global atomic counters for check execution.
//!
//! Counters are incremented silently by the engine. Call [`Metrics::flush`]
//! to emit current values as a single `tracing::info!` event (e.g. when a
//! CLI command finishes).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    batches_run: AtomicU64,
    batches_skipped: AtomicU64,
    items_executed: AtomicU64,
    items_failed: AtomicU64,
    items_skipped: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            batches_run: AtomicU64::new(0),
            batches_skipped: AtomicU64::new(0),
            items_executed: AtomicU64::new(0),
            items_failed: AtomicU64::new(0),
            items_skipped: AtomicU64::new(0),
        }
    }

    pub fn inc_batches_run(&self) {
        self.batches_run.fetch_add(1, Ordering::Relaxed);
    }

    /// A batch skipped wholesale by the global condition.
    pub fn inc_batches_skipped(&self) {
        self.batches_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_items_executed(&self, n: u64) {
        self.items_executed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_items_failed(&self, n: u64) {
        self.items_failed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_items_skipped(&self, n: u64) {
        self.items_skipped.fetch_add(n, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            batches_run = self.batches_run(),
            batches_skipped = self.batches_skipped(),
            items_executed = self.items_executed(),
            items_failed = self.items_failed(),
            items_skipped = self.items_skipped(),
        );
    }

    pub fn batches_run(&self) -> u64 {
        self.batches_run.load(Ordering::Relaxed)
    }

    pub fn batches_skipped(&self) -> u64 {
        self.batches_skipped.load(Ordering::Relaxed)
    }

    pub fn items_executed(&self) -> u64 {
        self.items_executed.load(Ordering::Relaxed)
    }

    pub fn items_failed(&self) -> u64 {
        self.items_failed.load(Ordering::Relaxed)
    }

    pub fn items_skipped(&self) -> u64 {
        self.items_skipped.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.batches_run.store(0, Ordering::Relaxed);
        self.batches_skipped.store(0, Ordering::Relaxed);
        self.items_executed.store(0, Ordering::Relaxed);
        self.items_failed.store(0, Ordering::Relaxed);
        self.items_skipped.store(0, Ordering::Relaxed);
    }
}
