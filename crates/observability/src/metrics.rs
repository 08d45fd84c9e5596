//! Logging pipeline metrics
//!
//! Publishes `QueueStats` snapshots through the `metrics` facade and builds
//! the end-of-run summary printed by the CLI.

use std::time::Duration;

use contracts::QueueStats;
use metrics::{counter, gauge, histogram};

/// Publish a queue snapshot.
///
/// Counters are set to the snapshot's absolute values, so calling this
/// repeatedly with growing snapshots is safe.
pub fn record_queue_stats(stats: &QueueStats) {
    counter!("logpipe_entries_enqueued_total").absolute(stats.enqueued);
    counter!("logpipe_entries_processed_total").absolute(stats.processed);
    counter!("logpipe_entries_dropped_total").absolute(stats.dropped);
    counter!("logpipe_entries_ignored_after_close_total").absolute(stats.ignored_after_close);
    counter!("logpipe_entries_discarded_total").absolute(stats.discarded);

    counter!("logpipe_sink_failures_total", "op" => "write").absolute(stats.write_failures);
    counter!("logpipe_sink_failures_total", "op" => "flush").absolute(stats.flush_failures);
    counter!("logpipe_sink_failures_total", "op" => "close").absolute(stats.close_failures);

    gauge!("logpipe_queue_backlog").set(stats.backlog as f64);
}

/// Record how long a producer spent inside one log call
pub fn record_enqueue_latency(elapsed: Duration) {
    histogram!("logpipe_enqueue_latency_us").record(elapsed.as_secs_f64() * 1_000_000.0);
}

/// Min / max / mean over a stream of samples
#[derive(Debug, Clone, Copy, Default)]
pub struct LatencyStats {
    count: u64,
    total: f64,
    min: f64,
    max: f64,
}

impl LatencyStats {
    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.total += value;
    }

    /// Fold another accumulator into this one
    pub fn merge(&mut self, other: &LatencyStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        self.count += other.count;
        self.total += other.total;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl std::fmt::Display for LatencyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1} (n={})",
                self.min,
                self.max,
                self.mean(),
                self.count
            )
        }
    }
}

/// Human-readable end-of-run report
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub stats: QueueStats,
    pub elapsed: Duration,
    /// Producer-side latency of log calls (µs)
    pub enqueue_latency_us: LatencyStats,
}

impl PipelineSummary {
    pub fn new(stats: QueueStats, elapsed: Duration) -> Self {
        Self {
            stats,
            elapsed,
            enqueue_latency_us: LatencyStats::default(),
        }
    }

    pub fn with_latency(mut self, latency: LatencyStats) -> Self {
        self.enqueue_latency_us = latency;
        self
    }

    /// Dropped entries as a percentage of all attempts
    pub fn drop_rate(&self) -> f64 {
        let attempts = self.stats.enqueued + self.stats.dropped;
        if attempts == 0 {
            0.0
        } else {
            self.stats.dropped as f64 / attempts as f64 * 100.0
        }
    }

    /// Delivered entries per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= f64::EPSILON {
            0.0
        } else {
            self.stats.processed as f64 / secs
        }
    }
}

impl std::fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = &self.stats;
        writeln!(f, "=== Logging Pipeline Summary ===")?;
        writeln!(f, "Elapsed: {:.2}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "Enqueued: {}", s.enqueued)?;
        writeln!(f, "Delivered: {} ({:.0}/s)", s.processed, self.throughput())?;
        writeln!(f, "Dropped (queue full): {} ({:.2}%)", s.dropped, self.drop_rate())?;
        writeln!(f, "Ignored after close: {}", s.ignored_after_close)?;
        writeln!(
            f,
            "Sink failures: write={}, flush={}, close={}",
            s.write_failures, s.flush_failures, s.close_failures
        )?;
        if s.discarded > 0 {
            writeln!(f, "Discarded at shutdown: {}", s.discarded)?;
        }
        if s.backlog > 0 {
            writeln!(f, "Backlog: {}", s.backlog)?;
        }
        writeln!(f, "Enqueue latency (us): {}", self.enqueue_latency_us)?;
        Ok(())
    }
}
