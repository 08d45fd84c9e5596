//! Queue metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::QueueStats;

/// Counters for a single dispatch queue
#[derive(Debug, Default)]
pub struct QueueMetrics {
    /// Total accepted entries
    enqueued: AtomicU64,
    /// Total entries fanned out by the worker
    processed: AtomicU64,
    /// Total entries dropped due to full queue
    dropped: AtomicU64,
    /// Total entries ignored after close
    ignored_after_close: AtomicU64,
    /// Total accepted entries released at the shutdown deadline
    discarded: AtomicU64,
    /// Total sink write failures
    write_failures: AtomicU64,
    /// Total sink flush failures
    flush_failures: AtomicU64,
    /// Total sink close failures
    close_failures: AtomicU64,
}

impl QueueMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn inc_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn inc_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ignored_after_close(&self) -> u64 {
        self.ignored_after_close.load(Ordering::Relaxed)
    }

    pub fn inc_ignored_after_close(&self) {
        self.ignored_after_close.fetch_add(1, Ordering::Relaxed);
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    pub fn add_discarded(&self, count: u64) {
        self.discarded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    pub fn inc_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flush_failures(&self) -> u64 {
        self.flush_failures.load(Ordering::Relaxed)
    }

    pub fn inc_flush_failures(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn close_failures(&self) -> u64 {
        self.close_failures.load(Ordering::Relaxed)
    }

    pub fn inc_close_failures(&self) {
        self.close_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters; `backlog` is supplied by the queue
    pub fn snapshot(&self, backlog: usize) -> QueueStats {
        QueueStats {
            backlog,
            enqueued: self.enqueued(),
            processed: self.processed(),
            dropped: self.dropped(),
            ignored_after_close: self.ignored_after_close(),
            discarded: self.discarded(),
            write_failures: self.write_failures(),
            flush_failures: self.flush_failures(),
            close_failures: self.close_failures(),
        }
    }
}
