//! `run` command implementation.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use contracts::LogLevel;
use logger::Logger;
use observability::{record_enqueue_latency, record_queue_stats, LatencyStats, PipelineSummary};

use super::{load_logger, shutdown_signal};
use crate::cli::RunArgs;

/// Level mix of the synthetic load
const LEVEL_CYCLE: [LogLevel; 8] = [
    LogLevel::Info,
    LogLevel::Debug,
    LogLevel::Info,
    LogLevel::Trace,
    LogLevel::Info,
    LogLevel::Warn,
    LogLevel::Debug,
    LogLevel::Error,
];

/// Workload of one producer
#[derive(Debug, Clone, Copy, PartialEq)]
struct ProducerPlan {
    id: usize,
    /// None = until stopped
    count: Option<u64>,
    interval: Option<Duration>,
}

/// Split the aggregate count and rate evenly across producers
fn plan_producers(count: u64, producers: u16, rate_per_sec: u64) -> Vec<ProducerPlan> {
    let producers = u64::from(producers.max(1));
    let interval =
        (rate_per_sec > 0).then(|| Duration::from_nanos(1_000_000_000 * producers / rate_per_sec));

    (0..producers)
        .map(|id| ProducerPlan {
            id: id as usize,
            count: (count > 0).then(|| count / producers + u64::from(id < count % producers)),
            interval,
        })
        .collect()
}

/// Blocking producer loop; returns per-call latency in microseconds
fn produce(plan: ProducerPlan, logger: &Logger, stop: &AtomicBool) -> LatencyStats {
    let mut latency = LatencyStats::default();
    let mut next_tick = Instant::now();
    let mut seq: u64 = 0;

    while !stop.load(Ordering::Relaxed) && plan.count.map_or(true, |count| seq < count) {
        let level = LEVEL_CYCLE[(seq as usize + plan.id) % LEVEL_CYCLE.len()];

        let started = Instant::now();
        logger.log(level, format!("producer {} message {seq}", plan.id), None);
        let elapsed = started.elapsed();

        latency.push(elapsed.as_secs_f64() * 1_000_000.0);
        record_enqueue_latency(elapsed);
        seq += 1;

        if let Some(interval) = plan.interval {
            next_tick += interval;
            let now = Instant::now();
            if next_tick > now {
                std::thread::sleep(next_tick - now);
            }
        }
    }
    latency
}

/// Execute the `run` command
pub async fn run_load(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");
    let logger = Arc::new(
        load_logger(&args.config)
            .with_context(|| format!("Failed to load config from {}", args.config.display()))?,
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let plans = plan_producers(args.count, args.producers, args.rate_per_sec);
    info!(
        producers = plans.len(),
        count = args.count,
        rate_per_sec = args.rate_per_sec,
        "Starting producers..."
    );

    let stop = Arc::new(AtomicBool::new(false));
    let started = Instant::now();

    let handles: Vec<_> = plans
        .into_iter()
        .map(|plan| {
            let logger = Arc::clone(&logger);
            let stop = Arc::clone(&stop);
            tokio::task::spawn_blocking(move || produce(plan, &logger, &stop))
        })
        .collect();

    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let watcher = {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            let deadline = async {
                match timeout {
                    Some(timeout) => tokio::time::sleep(timeout).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                _ = shutdown_signal() => warn!("Received shutdown signal, stopping producers..."),
                _ = deadline => info!("Timeout reached, stopping producers"),
            }
            stop.store(true, Ordering::Relaxed);
        })
    };

    let mut latency = LatencyStats::default();
    for handle in handles {
        latency.merge(&handle.await.context("Producer task failed")?);
    }
    watcher.abort();

    logger.shutdown();
    let stats = logger.stats();
    record_queue_stats(&stats);

    let summary = PipelineSummary::new(stats, started.elapsed()).with_latency(latency);
    info!(
        enqueued = stats.enqueued,
        delivered = stats.processed,
        dropped = stats.dropped,
        duration_secs = summary.elapsed.as_secs_f64(),
        "Load run completed"
    );
    eprintln!("\n{summary}");

    Ok(())
}
