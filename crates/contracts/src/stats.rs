//! QueueStats - point-in-time counters of a dispatch queue

use serde::{Deserialize, Serialize};

/// Snapshot of dispatch queue counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Entries currently waiting in the queue
    pub backlog: usize,
    /// Entries accepted by `enqueue`
    pub enqueued: u64,
    /// Entries fully fanned out by the worker
    pub processed: u64,
    /// Entries dropped because the queue stayed full
    pub dropped: u64,
    /// Entries ignored because the queue was already closed
    pub ignored_after_close: u64,
    /// Accepted entries released undelivered when shutdown ran out of time
    #[serde(default)]
    pub discarded: u64,
    /// Individual sink write failures
    pub write_failures: u64,
    /// Individual sink flush failures
    pub flush_failures: u64,
    /// Individual sink close failures
    pub close_failures: u64,
}

impl QueueStats {
    /// Sum of counters from several queues (e.g. across rebuilds)
    pub fn merge(self, other: QueueStats) -> QueueStats {
        QueueStats {
            backlog: self.backlog + other.backlog,
            enqueued: self.enqueued + other.enqueued,
            processed: self.processed + other.processed,
            dropped: self.dropped + other.dropped,
            ignored_after_close: self.ignored_after_close + other.ignored_after_close,
            discarded: self.discarded + other.discarded,
            write_failures: self.write_failures + other.write_failures,
            flush_failures: self.flush_failures + other.flush_failures,
            close_failures: self.close_failures + other.close_failures,
        }
    }
}
