//! DispatchQueue - bounded queue drained by one dedicated worker thread
//!
//! Producers call [`DispatchQueue::enqueue`] from any thread. A single
//! long-running worker owns the consuming end and fans every entry out to the
//! sink snapshot taken at construction, in FIFO order. Failures of one sink
//! are reported through the [`FallbackReporter`] and never reach producers or
//! other sinks.
//!
//! Lifecycle: `Open` → (`flush`/`shutdown` closes) → `Draining` →
//! (`shutdown` completes) → `Stopped`. A queue is single-use.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{ErrorDetail, LogEntry, LogSink, QueueConfig, QueueStats};
use crossbeam_channel::{self as channel, select, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::error::DispatcherError;
use crate::fallback::FallbackReporter;
use crate::metrics::QueueMetrics;

const WORKER_THREAD_NAME: &str = "log-dispatch";

/// Lifecycle state of a dispatch queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Accepting entries
    Open,
    /// Closed for new entries, backlog may still be delivered
    Draining,
    /// Worker gone (or detached) and every sink flushed and closed
    Stopped,
}

/// One sink of the snapshot; the name is cached for diagnostics while the
/// sink itself is busy.
struct SinkCell {
    name: String,
    sink: Mutex<Box<dyn LogSink>>,
}

#[derive(Debug, Clone, Copy)]
enum SinkAction {
    Flush,
    Close,
}

impl SinkAction {
    fn label(self) -> &'static str {
        match self {
            SinkAction::Flush => "flush",
            SinkAction::Close => "close",
        }
    }
}

/// State shared between the queue handle and its worker
struct Shared {
    sinks: Vec<SinkCell>,
    fallback: FallbackReporter,
    metrics: QueueMetrics,
    /// Set once the shutdown drain budget is spent
    abort: AtomicBool,
    lock_timeout: Duration,
}

impl Shared {
    fn aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    /// Deliver one entry to every accepting sink, isolating failures.
    ///
    /// Always runs to the last sink; abort is only honoured between entries.
    fn fan_out(&self, entry: &LogEntry) {
        for cell in &self.sinks {
            let mut sink = cell.sink.lock();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                if sink.should_log(entry.level()) {
                    sink.write(entry)
                } else {
                    Ok(())
                }
            }));
            drop(sink);

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.metrics.inc_write_failures();
                    self.fallback.error(
                        format!("Error in sink {}: {e}", cell.name),
                        Some(ErrorDetail::capture(&e)),
                    );
                }
                Err(payload) => {
                    self.metrics.inc_write_failures();
                    self.fallback.error(
                        format!("Sink {} panicked while writing", cell.name),
                        Some(ErrorDetail::new(panic_message(payload.as_ref()))),
                    );
                }
            }
        }
        self.metrics.inc_processed();
    }

    /// Flush or close every sink; each failure is reported and skipped
    fn apply_to_sinks(&self, action: SinkAction) {
        for cell in &self.sinks {
            let Some(mut sink) = cell.sink.try_lock_for(self.lock_timeout) else {
                self.record_failure(action);
                self.fallback.error(
                    format!(
                        "Sink {} still busy after {:?}, {} skipped",
                        cell.name,
                        self.lock_timeout,
                        action.label()
                    ),
                    None,
                );
                continue;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match action {
                SinkAction::Flush => sink.flush(),
                SinkAction::Close => sink.close(),
            }));
            drop(sink);

            let failure: Option<(String, ErrorDetail)> = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some((e.to_string(), ErrorDetail::capture(&e))),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    Some((format!("panicked: {message}"), ErrorDetail::new(message)))
                }
            };

            if let Some((reason, detail)) = failure {
                self.record_failure(action);
                self.fallback.error(
                    format!("Error during {} of sink {}: {reason}", action.label(), cell.name),
                    Some(detail),
                );
            }
        }
    }

    fn record_failure(&self, action: SinkAction) {
        match action {
            SinkAction::Flush => self.metrics.inc_flush_failures(),
            SinkAction::Close => self.metrics.inc_close_failures(),
        }
    }
}

/// Bounded multi-producer queue with a single dedicated consumer thread
pub struct DispatchQueue {
    /// Producer end; `None` once closed. Held only long enough to clone.
    sender: RwLock<Option<Sender<LogEntry>>>,
    /// Disconnects on close, releasing producers waiting for space
    closing: Receiver<()>,
    close_signal: Mutex<Option<Sender<()>>>,
    /// Extra consuming end used for backlog length and final release
    probe: Receiver<LogEntry>,
    /// Dropped to signal cancellation to the worker
    cancel: Mutex<Option<Sender<()>>>,
    /// Disconnects when the worker exits
    done: Receiver<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shared: Arc<Shared>,
    config: QueueConfig,
    closed: AtomicBool,
    shut_down: AtomicBool,
    stopped: AtomicBool,
}

impl DispatchQueue {
    /// Create a queue over `sinks` with a console fallback reporter and start
    /// its worker.
    pub fn spawn(sinks: Vec<Box<dyn LogSink>>, config: QueueConfig) -> Result<Self, DispatcherError> {
        Self::with_fallback(sinks, config, FallbackReporter::console())
    }

    /// Create a queue with an explicit fallback reporter and start its worker
    #[instrument(
        name = "dispatch_queue_spawn",
        skip(sinks, config, fallback),
        fields(sink_count = sinks.len(), capacity = config.capacity)
    )]
    pub fn with_fallback(
        sinks: Vec<Box<dyn LogSink>>,
        config: QueueConfig,
        fallback: FallbackReporter,
    ) -> Result<Self, DispatcherError> {
        Self::build(sinks, config, fallback, None)
    }

    /// Like [`with_fallback`](Self::with_fallback), but the worker delivers
    /// nothing until `ready` disconnects (or yields a message). Entries are
    /// accepted meanwhile, up to capacity.
    ///
    /// Used to hand over from a predecessor queue without reordering output.
    pub fn following(
        sinks: Vec<Box<dyn LogSink>>,
        config: QueueConfig,
        fallback: FallbackReporter,
        ready: Receiver<()>,
    ) -> Result<Self, DispatcherError> {
        Self::build(sinks, config, fallback, Some(ready))
    }

    fn build(
        sinks: Vec<Box<dyn LogSink>>,
        config: QueueConfig,
        fallback: FallbackReporter,
        ready: Option<Receiver<()>>,
    ) -> Result<Self, DispatcherError> {
        let (tx, rx) = channel::bounded::<LogEntry>(config.capacity.max(1));
        let (cancel_tx, cancel_rx) = channel::bounded::<()>(0);
        let (done_tx, done_rx) = channel::bounded::<()>(0);
        let (close_tx, close_rx) = channel::bounded::<()>(0);

        let shared = Arc::new(Shared {
            sinks: sinks
                .into_iter()
                .map(|sink| SinkCell {
                    name: sink.name().to_string(),
                    sink: Mutex::new(sink),
                })
                .collect(),
            fallback,
            metrics: QueueMetrics::new(),
            abort: AtomicBool::new(false),
            lock_timeout: config.sink_lock_timeout(),
        });

        let worker_shared = Arc::clone(&shared);
        let entries = rx.clone();
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || run_worker(worker_shared, ready, entries, cancel_rx, done_tx))
            .map_err(DispatcherError::WorkerSpawn)?;

        Ok(Self {
            sender: RwLock::new(Some(tx)),
            closing: close_rx,
            close_signal: Mutex::new(Some(close_tx)),
            probe: rx,
            cancel: Mutex::new(Some(cancel_tx)),
            done: done_rx,
            worker: Mutex::new(Some(worker)),
            shared,
            config,
            closed: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    /// Hand an entry to the worker.
    ///
    /// Waits up to the enqueue timeout for space. On timeout the entry is
    /// dropped and one warning goes to the fallback reporter. Once the queue
    /// is closed this is a silent no-op, and a producer still waiting for
    /// space when the queue closes returns at once without a warning.
    pub fn enqueue(&self, entry: LogEntry) {
        let metrics = &self.shared.metrics;
        if self.closed.load(Ordering::Acquire) {
            metrics.inc_ignored_after_close();
            return;
        }

        let Some(sender) = self.sender.read().clone() else {
            metrics.inc_ignored_after_close();
            return;
        };

        select! {
            send(sender, entry) -> sent => match sent {
                Ok(()) => metrics.inc_enqueued(),
                Err(_) => metrics.inc_ignored_after_close(),
            },
            recv(self.closing) -> _ => metrics.inc_ignored_after_close(),
            default(self.config.enqueue_timeout()) => {
                metrics.inc_dropped();
                self.shared
                    .fallback
                    .warn("Log queue is full. Dropping this log entry.");
            }
        }
    }

    /// Close for new entries, wait up to `timeout` for the backlog to drain,
    /// then flush every sink regardless of drain completion.
    ///
    /// Returns true when the worker finished draining within the timeout.
    #[instrument(name = "dispatch_queue_flush", skip(self), fields(timeout_ms = timeout.as_millis() as u64))]
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        self.close();

        let drained = self.wait_for_worker(deadline);
        if drained {
            debug!("Backlog drained");
        } else {
            warn!(backlog = self.probe.len(), "Flush deadline reached before backlog drained");
        }

        self.shared.apply_to_sinks(SinkAction::Flush);
        drained
    }

    /// [`flush`](Self::flush) with the configured default timeout
    pub fn flush_default(&self) -> bool {
        self.flush(self.config.flush_timeout())
    }

    /// Cancel the worker, flush with the default timeout, release the
    /// remaining backlog and close every sink. Idempotent.
    #[instrument(name = "dispatch_queue_shutdown", skip(self))]
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        drop(self.cancel.lock().take());
        let drained = self.flush_default();
        self.shared.abort.store(true, Ordering::Release);

        let discarded = self.probe.try_iter().count() as u64;
        if discarded > 0 {
            self.shared.metrics.add_discarded(discarded);
            warn!(discarded, "Discarding backlog left after shutdown deadline");
        }

        // Give the worker a chance to finish the entry it is fanning out.
        let finished = drained
            || self
                .wait_for_worker(Instant::now().checked_add(self.shared.lock_timeout));

        if let Some(handle) = self.worker.lock().take() {
            if finished || handle.is_finished() {
                if handle.join().is_err() {
                    error!("Dispatch worker terminated abnormally");
                }
            } else {
                warn!("Dispatch worker still inside a sink call, detaching");
            }
        }

        self.shared.apply_to_sinks(SinkAction::Close);
        self.shared.fallback.flush();
        self.stopped.store(true, Ordering::Release);

        let stats = self.stats();
        info!(
            enqueued = stats.enqueued,
            processed = stats.processed,
            dropped = stats.dropped,
            discarded = stats.discarded,
            write_failures = stats.write_failures,
            "Dispatch queue stopped"
        );
    }

    /// Current lifecycle state
    pub fn state(&self) -> QueueState {
        if self.stopped.load(Ordering::Acquire) {
            QueueState::Stopped
        } else if self.closed.load(Ordering::Acquire) {
            QueueState::Draining
        } else {
            QueueState::Open
        }
    }

    /// Whether the worker thread is still running
    pub fn is_worker_alive(&self) -> bool {
        matches!(self.done.try_recv(), Err(TryRecvError::Empty))
    }

    /// Snapshot of the queue counters
    pub fn stats(&self) -> QueueStats {
        self.shared.metrics.snapshot(self.probe.len())
    }

    /// Names of the sinks in the snapshot, in delivery order
    pub fn sink_names(&self) -> Vec<&str> {
        self.shared.sinks.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        drop(self.close_signal.lock().take());
        let sender = self.sender.write().take();
        drop(sender);
        debug!("Dispatch queue closed for new entries");
    }

    fn wait_for_worker(&self, deadline: Option<Instant>) -> bool {
        match deadline {
            Some(deadline) => !matches!(
                self.done.recv_deadline(deadline),
                Err(RecvTimeoutError::Timeout)
            ),
            None => {
                let _ = self.done.recv();
                true
            }
        }
    }
}

impl Drop for DispatchQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("sinks", &self.sink_names())
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

/// Worker thread body
fn run_worker(
    shared: Arc<Shared>,
    ready: Option<Receiver<()>>,
    entries: Receiver<LogEntry>,
    cancel: Receiver<()>,
    _done: Sender<()>,
) {
    if let Some(ready) = ready {
        let _ = ready.recv();
    }
    debug!(sinks = shared.sinks.len(), "Dispatch worker started");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| drain_loop(&shared, &entries, &cancel)));
    if let Err(payload) = outcome {
        shared.fallback.fatal(
            "Unexpected error in log processing",
            Some(ErrorDetail::new(panic_message(payload.as_ref()))),
        );
    }

    debug!(processed = shared.metrics.processed(), "Dispatch worker stopped");
}

enum Next {
    Entry(LogEntry),
    Cancelled,
    Closed,
}

fn drain_loop(shared: &Shared, entries: &Receiver<LogEntry>, cancel: &Receiver<()>) {
    let mut cancelled = false;
    // Once cancelled, keep draining in order until closed or out of budget.
    while !shared.aborted() {
        let next = if cancelled {
            entries.recv().map_or(Next::Closed, Next::Entry)
        } else {
            select! {
                recv(entries) -> msg => msg.map_or(Next::Closed, Next::Entry),
                recv(cancel) -> _ => Next::Cancelled,
            }
        };

        match next {
            Next::Entry(entry) if shared.aborted() => {
                shared.metrics.add_discarded(1);
                debug!(message = entry.message(), "Entry taken after abort, discarded");
                return;
            }
            Next::Entry(entry) => shared.fan_out(&entry),
            Next::Cancelled => cancelled = true,
            // closed and empty
            Next::Closed => return,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ContractError, LogLevel};
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone, Default)]
    struct Probe {
        writes: Arc<Mutex<Vec<String>>>,
        flushes: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    impl Probe {
        fn writes(&self) -> Vec<String> {
            self.writes.lock().clone()
        }

        fn flushes(&self) -> usize {
            self.flushes.load(Ordering::SeqCst)
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    enum Behaviour {
        Healthy,
        FailWrites,
        PanicWrites,
        FailFlush,
        Delay(Duration),
        Gate {
            started: Sender<()>,
            release: Receiver<()>,
        },
    }

    /// Mock sink for testing
    struct MockSink {
        name: String,
        min_level: LogLevel,
        probe: Probe,
        behaviour: Behaviour,
    }

    fn mock(name: &str, min_level: LogLevel, probe: &Probe, behaviour: Behaviour) -> Box<dyn LogSink> {
        Box::new(MockSink {
            name: name.to_string(),
            min_level,
            probe: probe.clone(),
            behaviour,
        })
    }

    impl LogSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        fn min_level(&self) -> LogLevel {
            self.min_level
        }

        fn write(&mut self, entry: &LogEntry) -> Result<(), ContractError> {
            match &self.behaviour {
                Behaviour::FailWrites => {
                    return Err(ContractError::sink_write(&self.name, "disk full"));
                }
                Behaviour::PanicWrites => panic!("sink {} exploded", self.name),
                Behaviour::Delay(d) => thread::sleep(*d),
                Behaviour::Gate { started, release } => {
                    let _ = started.try_send(());
                    let _ = release.recv();
                }
                Behaviour::Healthy | Behaviour::FailFlush => {}
            }
            self.probe.writes.lock().push(entry.message().to_string());
            Ok(())
        }

        fn flush(&mut self) -> Result<(), ContractError> {
            self.probe.flushes.fetch_add(1, Ordering::SeqCst);
            if matches!(self.behaviour, Behaviour::FailFlush) {
                return Err(ContractError::sink_flush(&self.name, "device gone"));
            }
            Ok(())
        }

        fn close(&mut self) -> Result<(), ContractError> {
            self.probe.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn start(sinks: Vec<Box<dyn LogSink>>, config: QueueConfig) -> (DispatchQueue, Probe) {
        let fallback = Probe::default();
        let reporter = FallbackReporter::new(MockSink {
            name: "fallback".to_string(),
            min_level: LogLevel::Trace,
            probe: fallback.clone(),
            behaviour: Behaviour::Healthy,
        });
        let queue = DispatchQueue::with_fallback(sinks, config, reporter).unwrap();
        (queue, fallback)
    }

    fn info(message: impl Into<String>) -> LogEntry {
        LogEntry::new(LogLevel::Info, message)
    }

    #[test]
    fn test_fifo_delivery_to_every_sink() {
        let a = Probe::default();
        let b = Probe::default();
        let (queue, fallback) = start(
            vec![
                mock("a", LogLevel::Trace, &a, Behaviour::Healthy),
                mock("b", LogLevel::Trace, &b, Behaviour::Healthy),
            ],
            QueueConfig::default(),
        );

        for i in 0..200 {
            queue.enqueue(info(format!("m{i}")));
        }
        queue.shutdown();

        let expected: Vec<String> = (0..200).map(|i| format!("m{i}")).collect();
        assert_eq!(a.writes(), expected);
        assert_eq!(b.writes(), expected);
        assert!(fallback.writes().is_empty());
        assert_eq!(queue.stats().processed, 200);
    }

    #[test]
    fn test_per_sink_level_filter_keeps_relative_order() {
        let a = Probe::default();
        let b = Probe::default();
        let (queue, _fallback) = start(
            vec![
                mock("a", LogLevel::Trace, &a, Behaviour::Healthy),
                mock("b", LogLevel::Warn, &b, Behaviour::Healthy),
            ],
            QueueConfig::default().with_capacity(3),
        );

        queue.enqueue(LogEntry::new(LogLevel::Info, "a"));
        queue.enqueue(LogEntry::new(LogLevel::Warn, "b"));
        queue.enqueue(LogEntry::new(LogLevel::Error, "c"));
        queue.shutdown();

        assert_eq!(a.writes(), vec!["a", "b", "c"]);
        assert_eq!(b.writes(), vec!["b", "c"]);
    }

    #[test]
    fn test_enqueue_after_close_is_silent_noop() {
        let a = Probe::default();
        let (queue, fallback) = start(
            vec![mock("a", LogLevel::Trace, &a, Behaviour::Healthy)],
            QueueConfig::default(),
        );

        queue.flush(Duration::from_secs(1));
        assert_eq!(queue.state(), QueueState::Draining);

        let started = Instant::now();
        queue.enqueue(info("late"));
        assert!(started.elapsed() < Duration::from_millis(100));

        queue.shutdown();
        queue.enqueue(info("later"));

        assert!(a.writes().is_empty());
        assert_eq!(queue.stats().ignored_after_close, 2);
        assert!(fallback.writes().is_empty());
        assert_eq!(queue.state(), QueueState::Stopped);
    }

    #[test]
    fn test_full_queue_drops_with_single_warning() {
        let a = Probe::default();
        let (started_tx, started_rx) = channel::bounded(1);
        let (release_tx, release_rx) = channel::bounded::<()>(0);
        let config = QueueConfig::default()
            .with_capacity(2)
            .with_enqueue_timeout(Duration::from_millis(150));
        let (queue, fallback) = start(
            vec![mock(
                "a",
                LogLevel::Trace,
                &a,
                Behaviour::Gate {
                    started: started_tx,
                    release: release_rx,
                },
            )],
            config,
        );

        // Worker takes the first entry and parks inside the sink.
        queue.enqueue(info("blocker"));
        started_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("worker picked up first entry");

        queue.enqueue(info("x1"));
        queue.enqueue(info("x2"));

        let started = Instant::now();
        queue.enqueue(info("overflow"));
        let waited = started.elapsed();

        assert!(waited >= Duration::from_millis(150), "waited {waited:?}");
        assert!(waited < Duration::from_secs(1), "waited {waited:?}");
        assert_eq!(queue.stats().dropped, 1);

        let warnings = fallback.writes();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("full"));

        drop(release_tx);
        queue.shutdown();
        assert_eq!(a.writes(), vec!["blocker", "x1", "x2"]);
    }

    #[test]
    fn test_failing_sink_does_not_starve_healthy_sink() {
        let bad = Probe::default();
        let good = Probe::default();
        let (queue, fallback) = start(
            vec![
                mock("bad", LogLevel::Trace, &bad, Behaviour::FailWrites),
                mock("good", LogLevel::Trace, &good, Behaviour::Healthy),
            ],
            QueueConfig::default(),
        );

        for i in 0..50 {
            queue.enqueue(info(format!("e{i}")));
        }
        queue.shutdown();

        assert_eq!(good.writes().len(), 50);
        assert_eq!(queue.stats().write_failures, 50);
        let reports = fallback.writes();
        assert_eq!(reports.len(), 50);
        assert!(reports[0].contains("Error in sink bad"));
        // the failing sink still gets flushed and closed
        assert_eq!(bad.flushes(), 1);
        assert_eq!(bad.closes(), 1);
    }

    #[test]
    fn test_panicking_sink_is_isolated() {
        let bad = Probe::default();
        let good = Probe::default();
        let (queue, fallback) = start(
            vec![
                mock("bad", LogLevel::Trace, &bad, Behaviour::PanicWrites),
                mock("good", LogLevel::Trace, &good, Behaviour::Healthy),
            ],
            QueueConfig::default(),
        );

        for i in 0..5 {
            queue.enqueue(info(format!("e{i}")));
        }
        assert!(queue.flush(Duration::from_secs(2)));

        assert_eq!(good.writes(), vec!["e0", "e1", "e2", "e3", "e4"]);
        assert_eq!(queue.stats().write_failures, 5);
        assert!(fallback.writes()[0].contains("panicked"));
    }

    #[test]
    fn test_flush_is_bounded_by_timeout() {
        let slow = Probe::default();
        let config = QueueConfig::default().with_flush_timeout(Duration::from_millis(200));
        let (queue, _fallback) = start(
            vec![mock(
                "slow",
                LogLevel::Trace,
                &slow,
                Behaviour::Delay(Duration::from_millis(20)),
            )],
            config,
        );

        for i in 0..100 {
            queue.enqueue(info(format!("e{i}")));
        }

        let started = Instant::now();
        let drained = queue.flush(Duration::from_millis(100));
        let elapsed = started.elapsed();

        assert!(!drained);
        assert!(elapsed < Duration::from_millis(1500), "flush took {elapsed:?}");
        assert!(slow.flushes() >= 1);

        queue.shutdown();
        assert!(slow.writes().len() < 100);
        assert_eq!(slow.closes(), 1);
    }

    #[test]
    fn test_flush_not_held_up_by_waiting_producer() {
        let a = Probe::default();
        let (started_tx, started_rx) = channel::bounded(1);
        let (release_tx, release_rx) = channel::bounded::<()>(0);
        let config = QueueConfig::default()
            .with_capacity(1)
            .with_enqueue_timeout(Duration::from_secs(2))
            .with_sink_lock_timeout(Duration::from_millis(10));
        let (queue, fallback) = start(
            vec![mock(
                "a",
                LogLevel::Trace,
                &a,
                Behaviour::Gate {
                    started: started_tx,
                    release: release_rx,
                },
            )],
            config,
        );

        queue.enqueue(info("blocker"));
        started_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("worker picked up first entry");
        queue.enqueue(info("queued"));

        thread::scope(|scope| {
            let producer = scope.spawn(|| {
                let started = Instant::now();
                queue.enqueue(info("waiting"));
                started.elapsed()
            });
            thread::sleep(Duration::from_millis(50));

            let started = Instant::now();
            let drained = queue.flush(Duration::from_millis(100));
            let elapsed = started.elapsed();

            assert!(!drained);
            assert!(elapsed < Duration::from_millis(500), "flush took {elapsed:?}");

            let waited = producer.join().unwrap();
            assert!(waited < Duration::from_secs(1), "producer waited {waited:?}");
        });

        let stats = queue.stats();
        assert_eq!(stats.dropped, 0);
        assert_eq!(stats.ignored_after_close, 1);
        assert!(fallback.writes().iter().all(|w| !w.contains("full")));

        drop(release_tx);
        queue.shutdown();
        assert_eq!(a.writes(), vec!["blocker", "queued"]);
    }

    #[test]
    fn test_shutdown_deadline_never_splits_an_entry() {
        let a = Probe::default();
        let b = Probe::default();
        let delay = Duration::from_millis(100);
        let config = QueueConfig::default().with_flush_timeout(Duration::from_millis(50));
        let (queue, _fallback) = start(
            vec![
                mock("a", LogLevel::Trace, &a, Behaviour::Delay(delay)),
                mock("b", LogLevel::Trace, &b, Behaviour::Delay(delay)),
            ],
            config,
        );

        for i in 0..10 {
            queue.enqueue(info(format!("e{i}")));
        }
        queue.shutdown();

        let delivered = a.writes();
        assert!(!delivered.is_empty());
        assert!(delivered.len() < 10);
        assert_eq!(delivered, b.writes());

        let stats = queue.stats();
        assert_eq!(stats.enqueued, 10);
        assert_eq!(stats.processed, delivered.len() as u64);
        assert_eq!(stats.processed + stats.discarded, 10);
        assert_eq!(a.closes(), 1);
        assert_eq!(b.closes(), 1);
    }

    #[test]
    fn test_following_queue_waits_for_ready_signal() {
        let a = Probe::default();
        let (ready_tx, ready_rx) = channel::bounded::<()>(0);
        let fallback = FallbackReporter::new(MockSink {
            name: "fallback".to_string(),
            min_level: LogLevel::Trace,
            probe: Probe::default(),
            behaviour: Behaviour::Healthy,
        });
        let queue = DispatchQueue::following(
            vec![mock("a", LogLevel::Trace, &a, Behaviour::Healthy)],
            QueueConfig::default(),
            fallback,
            ready_rx,
        )
        .unwrap();

        queue.enqueue(info("held"));
        thread::sleep(Duration::from_millis(50));
        assert!(a.writes().is_empty());
        assert_eq!(queue.stats().backlog, 1);

        drop(ready_tx);
        assert!(queue.flush(Duration::from_secs(2)));
        assert_eq!(a.writes(), vec!["held"]);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let a = Probe::default();
        let (queue, fallback) = start(
            vec![mock("a", LogLevel::Trace, &a, Behaviour::Healthy)],
            QueueConfig::default(),
        );

        queue.shutdown();
        queue.shutdown();
        drop(queue);

        assert_eq!(a.flushes(), 1);
        assert_eq!(a.closes(), 1);
        assert!(fallback.writes().is_empty());
    }

    #[test]
    fn test_single_entry_delivered_before_shutdown_returns() {
        let a = Probe::default();
        let b = Probe::default();
        let (queue, _fallback) = start(
            vec![
                mock("a", LogLevel::Trace, &a, Behaviour::Healthy),
                mock("b", LogLevel::Info, &b, Behaviour::Healthy),
            ],
            QueueConfig::default(),
        );

        queue.enqueue(info("only"));
        queue.shutdown();

        for probe in [&a, &b] {
            assert_eq!(probe.writes(), vec!["only"]);
            assert_eq!(probe.flushes(), 1);
            assert_eq!(probe.closes(), 1);
        }
        assert!(!queue.is_worker_alive());
    }

    #[test]
    fn test_concurrent_producers_keep_their_own_order() {
        let a = Probe::default();
        let (queue, _fallback) = start(
            vec![mock("a", LogLevel::Trace, &a, Behaviour::Healthy)],
            QueueConfig::default(),
        );
        let queue = Arc::new(queue);

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..200 {
                        queue.enqueue(info(format!("p{p}-{i}")));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        queue.shutdown();

        let writes = a.writes();
        assert_eq!(writes.len(), 800);
        for p in 0..4 {
            let prefix = format!("p{p}-");
            let seq: Vec<usize> = writes
                .iter()
                .filter_map(|w| w.strip_prefix(&prefix))
                .map(|i| i.parse().unwrap())
                .collect();
            assert_eq!(seq, (0..200).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_flush_failure_does_not_skip_other_sinks() {
        let bad = Probe::default();
        let good = Probe::default();
        let (queue, fallback) = start(
            vec![
                mock("bad", LogLevel::Trace, &bad, Behaviour::FailFlush),
                mock("good", LogLevel::Trace, &good, Behaviour::Healthy),
            ],
            QueueConfig::default(),
        );

        queue.flush(Duration::from_secs(1));

        assert_eq!(bad.flushes(), 1);
        assert_eq!(good.flushes(), 1);
        assert_eq!(queue.stats().flush_failures, 1);
        let reports = fallback.writes();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("flush of sink bad"));
    }

    #[test]
    fn test_state_transitions() {
        let (queue, _fallback) = start(Vec::new(), QueueConfig::default());
        assert_eq!(queue.state(), QueueState::Open);
        assert!(queue.is_worker_alive());

        assert!(queue.flush(Duration::from_secs(1)));
        assert_eq!(queue.state(), QueueState::Draining);
        assert!(!queue.is_worker_alive());

        queue.shutdown();
        assert_eq!(queue.state(), QueueState::Stopped);
    }

    #[test]
    fn test_worker_runs_on_dedicated_thread() {
        struct ThreadName(Arc<Mutex<Option<String>>>);

        impl LogSink for ThreadName {
            fn name(&self) -> &str {
                "thread"
            }
            fn min_level(&self) -> LogLevel {
                LogLevel::Trace
            }
            fn write(&mut self, _entry: &LogEntry) -> Result<(), ContractError> {
                *self.0.lock() = thread::current().name().map(str::to_string);
                Ok(())
            }
            fn flush(&mut self) -> Result<(), ContractError> {
                Ok(())
            }
            fn close(&mut self) -> Result<(), ContractError> {
                Ok(())
            }
        }

        let seen = Arc::new(Mutex::new(None));
        let (queue, _fallback) = start(
            vec![Box::new(ThreadName(Arc::clone(&seen)))],
            QueueConfig::default(),
        );
        queue.enqueue(info("where am i"));
        queue.shutdown();

        assert_eq!(seen.lock().as_deref(), Some(WORKER_THREAD_NAME));
    }
}
