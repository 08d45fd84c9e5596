//! Logger - the façade producers talk to
//!
//! Holds the sink registry (at most one sink per slot) and the dispatch queue
//! built from it. Every change to the sink set swaps in a new queue over fresh
//! sink instances, then retires the old one (drain, flush, close) after the
//! state lock is released. The new queue accepts entries right away but only
//! starts delivering once its predecessor is retired, so output order holds.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use config_loader::ConfigLoader;
use contracts::{
    ErrorDetail, LogEntry, LogLevel, LoggingBlueprint, QueueConfig, QueueStats, SinkConfig,
    SinkKind, SinkSlot,
};
use crossbeam_channel::{self as channel, Sender};
use dispatcher::{DispatchQueue, DispatcherError, FallbackReporter, LogSink, create_sink};
use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use crate::error::LoggerError;

type SinkFactory = fn(&SinkConfig, LogLevel) -> Result<Box<dyn LogSink>, DispatcherError>;

/// A queue taken out of service, shut down once the state lock is released
struct Retiring {
    queue: Arc<DispatchQueue>,
    /// Dropped after shutdown to let the successor start delivering
    successor_gate: Option<Sender<()>>,
}

struct State {
    registry: BTreeMap<SinkSlot, SinkConfig>,
    queue: Option<DispatchQueue>,
    /// Queues being shut down by some caller right now
    retiring: Vec<Arc<DispatchQueue>>,
    queue_config: QueueConfig,
    fallback: FallbackReporter,
    factory: SinkFactory,
    /// Counters of queues already retired
    retired: QueueStats,
    shut_down: bool,
}

impl State {
    fn ensure_open(&self) -> Result<(), LoggerError> {
        if self.shut_down {
            return Err(LoggerError::InvalidOperation("logger is shut down".into()));
        }
        Ok(())
    }

    fn take_queue(&mut self, successor_gate: Option<Sender<()>>) -> Option<Retiring> {
        let queue = Arc::new(self.queue.take()?);
        self.retiring.push(Arc::clone(&queue));
        Some(Retiring {
            queue,
            successor_gate,
        })
    }

    /// Swap in a queue over fresh sink instances.
    ///
    /// On failure the live queue is left untouched. On success the previous
    /// queue, if any, is handed back for retirement.
    fn replace_queue(&mut self) -> Result<Option<Retiring>, LoggerError> {
        let mut sinks = Vec::with_capacity(self.registry.len());
        for config in self.registry.values() {
            sinks.push((self.factory)(config, LogLevel::default())?);
        }

        let (gate_tx, gate_rx) = channel::bounded::<()>(0);
        let next = DispatchQueue::following(
            sinks,
            self.queue_config,
            self.fallback.clone(),
            gate_rx,
        )?;

        let previous = self.take_queue(Some(gate_tx));
        self.queue = Some(next);

        let slots: Vec<_> = self.registry.keys().map(|s| s.to_string()).collect();
        info!(sinks = ?slots, "Dispatch queue replaced");
        Ok(previous)
    }

    fn live_stats(&self) -> QueueStats {
        self.retiring
            .iter()
            .map(|q| q.stats())
            .chain(self.queue.as_ref().map(DispatchQueue::stats))
            .fold(self.retired, QueueStats::merge)
    }
}

/// Logging façade
///
/// `Send + Sync`; share it by reference or `Arc`. Log calls never fail and
/// never panic.
pub struct Logger {
    min_level: AtomicU8,
    state: RwLock<State>,
}

impl Logger {
    /// Logger with a console sink at `min_level`
    pub fn new(min_level: LogLevel) -> Result<Self, LoggerError> {
        Self::with_fallback(min_level, QueueConfig::default(), FallbackReporter::console())
    }

    /// Logger with a console sink, explicit queue settings and fallback
    pub fn with_fallback(
        min_level: LogLevel,
        queue_config: QueueConfig,
        fallback: FallbackReporter,
    ) -> Result<Self, LoggerError> {
        let logger = Self::empty(min_level, queue_config, fallback);
        {
            let mut state = logger.state.write();
            state
                .registry
                .insert(SinkSlot::Console, SinkConfig::console().with_min_level(min_level));
            state.replace_queue()?;
        }
        Ok(logger)
    }

    /// Logger built from a (validated) blueprint
    #[instrument(name = "logger_from_blueprint", skip(blueprint), fields(sinks = blueprint.sinks.len()))]
    pub fn from_blueprint(blueprint: &LoggingBlueprint) -> Result<Self, LoggerError> {
        Self::from_blueprint_with_fallback(blueprint, FallbackReporter::console())
    }

    pub fn from_blueprint_with_fallback(
        blueprint: &LoggingBlueprint,
        fallback: FallbackReporter,
    ) -> Result<Self, LoggerError> {
        ConfigLoader::validate(blueprint)?;

        let logger = Self::empty(blueprint.min_level, blueprint.queue, fallback);
        {
            let mut state = logger.state.write();
            for sink in &blueprint.sinks {
                let resolved = sink.clone().with_min_level(sink.effective_level(blueprint.min_level));
                for (slot, part) in resolved.per_slot() {
                    state.registry.entry(slot).or_insert(part);
                }
            }
            state.replace_queue()?;
        }
        Ok(logger)
    }

    /// Load a TOML/JSON configuration file and build from it
    pub fn from_path(path: &Path) -> Result<Self, LoggerError> {
        let blueprint = ConfigLoader::load_from_path(path)?;
        Self::from_blueprint(&blueprint)
    }

    fn empty(min_level: LogLevel, queue_config: QueueConfig, fallback: FallbackReporter) -> Self {
        Self {
            min_level: AtomicU8::new(min_level.as_u8()),
            state: RwLock::new(State {
                registry: BTreeMap::new(),
                queue: None,
                retiring: Vec::new(),
                queue_config,
                fallback,
                factory: create_sink,
                retired: QueueStats::default(),
                shut_down: false,
            }),
        }
    }

    /// Logger without sinks or queue; every log call is a no-op
    pub(crate) fn disabled(min_level: LogLevel, fallback: FallbackReporter) -> Self {
        Self::empty(min_level, QueueConfig::default(), fallback)
    }

    pub fn min_level(&self) -> LogLevel {
        LogLevel::from_u8(self.min_level.load(Ordering::Relaxed))
    }

    /// Change the façade minimum level.
    ///
    /// Sinks keep the level they were registered with.
    pub fn set_min_level(&self, level: LogLevel) {
        self.min_level.store(level.as_u8(), Ordering::Relaxed);
        if !self.state.read().registry.is_empty() {
            self.trace(format!("Min log level set to {level}"));
        }
    }

    /// Register sinks of `kind` at the current minimum level.
    ///
    /// Slots already taken keep their existing sink. File kinds need a
    /// non-blank `directory`.
    #[instrument(name = "logger_add_sink", skip(self, directory))]
    pub fn add_sink(&self, kind: SinkKind, directory: Option<&Path>) -> Result<(), LoggerError> {
        let directory = match directory {
            Some(dir) if !dir.as_os_str().to_string_lossy().trim().is_empty() => Some(dir),
            _ => None,
        };
        if kind.needs_directory() && directory.is_none() {
            return Err(LoggerError::MissingTargetDirectory { kind });
        }

        let previous = {
            let mut state = self.state.write();
            state.ensure_open()?;
            Self::register(&mut state, kind, directory, self.min_level())?
        };
        self.retire(previous);
        Ok(())
    }

    fn register(
        state: &mut State,
        kind: SinkKind,
        directory: Option<&Path>,
        min_level: LogLevel,
    ) -> Result<Option<Retiring>, LoggerError> {
        let mut config = SinkConfig {
            kind,
            directory: directory.map(Path::to_path_buf),
            ..SinkConfig::console()
        };
        config.min_level = Some(min_level);

        let mut added = Vec::new();
        for (slot, part) in config.per_slot() {
            if let Entry::Vacant(vacant) = state.registry.entry(slot) {
                vacant.insert(part);
                added.push(slot);
            }
        }
        if added.is_empty() {
            debug!("Requested sinks already registered");
            return Ok(None);
        }

        match state.replace_queue() {
            Ok(previous) => Ok(previous),
            Err(e) => {
                for slot in &added {
                    state.registry.remove(slot);
                }
                Err(e)
            }
        }
    }

    /// Unregister the sink in `slot`; unknown slots are ignored
    #[instrument(name = "logger_remove_sink", skip(self))]
    pub fn remove_sink(&self, slot: SinkSlot) -> Result<(), LoggerError> {
        let previous = {
            let mut state = self.state.write();
            if state.shut_down {
                return Ok(());
            }
            let Some(config) = state.registry.remove(&slot) else {
                return Ok(());
            };
            match state.replace_queue() {
                Ok(previous) => previous,
                Err(e) => {
                    state.registry.insert(slot, config);
                    return Err(e);
                }
            }
        };
        self.retire(previous);
        Ok(())
    }

    /// Registered slots, in delivery order
    pub fn sinks(&self) -> Vec<SinkSlot> {
        self.state.read().registry.keys().copied().collect()
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message, None);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, None);
    }

    pub fn warn(&self, message: impl Into<String>, error: Option<&(dyn StdError + 'static)>) {
        self.log(LogLevel::Warn, message, error);
    }

    pub fn error(&self, message: impl Into<String>, error: Option<&(dyn StdError + 'static)>) {
        self.log(LogLevel::Error, message, error);
    }

    pub fn fatal(&self, message: impl Into<String>, error: Option<&(dyn StdError + 'static)>) {
        self.log(LogLevel::Fatal, message, error);
    }

    /// Filter by the façade level and hand the entry to the queue
    pub fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        error: Option<&(dyn StdError + 'static)>,
    ) {
        if level < self.min_level() {
            return;
        }
        let state = self.state.read();
        let Some(queue) = state.queue.as_ref() else {
            return;
        };
        queue.enqueue(LogEntry::with_error(level, message, error.map(ErrorDetail::capture)));
    }

    /// Deliver everything logged so far and flush every sink.
    ///
    /// The drained queue is retired and a fresh one takes over, so logging
    /// continues afterwards.
    ///
    /// Producers are never held behind the drain; they keep enqueueing into
    /// the new queue while the old one retires.
    pub fn flush(&self) {
        let previous = {
            let mut state = self.state.write();
            if state.shut_down {
                return;
            }
            match state.replace_queue() {
                Ok(previous) => previous,
                Err(e) => {
                    state.fallback.error(
                        "Failed to restart dispatch queue, flushing in place",
                        Some(ErrorDetail::capture(&e)),
                    );
                    state.take_queue(None)
                }
            }
        };
        self.retire(previous);
    }

    /// Drain, flush and close every sink. Idempotent; later log calls are
    /// no-ops.
    pub fn shutdown(&self) {
        let (previous, fallback) = {
            let mut state = self.state.write();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.registry.clear();
            (state.take_queue(None), state.fallback.clone())
        };
        self.retire(previous);
        fallback.flush();
        info!("Logger shut down");
    }

    /// Shut down a replaced queue without holding the state lock, then fold
    /// its counters into the totals
    fn retire(&self, retiring: Option<Retiring>) {
        let Some(Retiring {
            queue,
            successor_gate,
        }) = retiring
        else {
            return;
        };

        queue.shutdown();
        drop(successor_gate);

        let mut state = self.state.write();
        state.retiring.retain(|q| !Arc::ptr_eq(q, &queue));
        state.retired = state.retired.merge(queue.stats());
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.read().shut_down
    }

    /// Counters across every queue this logger has run
    pub fn stats(&self) -> QueueStats {
        self.state.read().live_stats()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("min_level", &self.min_level())
            .field("sinks", &self.sinks())
            .finish_non_exhaustive()
    }
}
