//! LoggingBlueprint - Config Loader output
//!
//! Describes the complete pipeline configuration: façade minimum level, queue
//! tuning and the sinks to register.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::LogLevel;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete logging pipeline blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Façade minimum level
    #[serde(default)]
    pub min_level: LogLevel,

    /// Dispatch queue tuning
    #[serde(default)]
    #[validate(nested)]
    pub queue: QueueConfig,

    /// Sinks to register, in registration order
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

impl Default for LoggingBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            min_level: LogLevel::Info,
            queue: QueueConfig::default(),
            sinks: vec![SinkConfig::console()],
        }
    }
}

/// Dispatch queue tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QueueConfig {
    /// Bounded capacity of the queue
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1))]
    pub capacity: usize,

    /// How long `enqueue` waits for space before dropping (ms)
    #[serde(default = "default_enqueue_timeout_ms")]
    #[validate(range(min = 1))]
    pub enqueue_timeout_ms: u64,

    /// Default drain budget for flush and shutdown (ms)
    #[serde(default = "default_flush_timeout_ms")]
    #[validate(range(min = 1))]
    pub flush_timeout_ms: u64,

    /// Bound on waiting for a sink busy in the worker during flush/close (ms)
    #[serde(default = "default_sink_lock_timeout_ms")]
    #[validate(range(min = 1))]
    pub sink_lock_timeout_ms: u64,
}

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
pub const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SINK_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

fn default_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_enqueue_timeout_ms() -> u64 {
    DEFAULT_ENQUEUE_TIMEOUT.as_millis() as u64
}

fn default_flush_timeout_ms() -> u64 {
    DEFAULT_FLUSH_TIMEOUT.as_millis() as u64
}

fn default_sink_lock_timeout_ms() -> u64 {
    DEFAULT_SINK_LOCK_TIMEOUT.as_millis() as u64
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            enqueue_timeout_ms: default_enqueue_timeout_ms(),
            flush_timeout_ms: default_flush_timeout_ms(),
            sink_lock_timeout_ms: default_sink_lock_timeout_ms(),
        }
    }
}

impl QueueConfig {
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    pub fn sink_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_lock_timeout_ms)
    }

    /// Same configuration with a different capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Same configuration with a different enqueue timeout
    pub fn with_enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Same configuration with a different flush timeout
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_sink_lock_timeout(mut self, timeout: Duration) -> Self {
        self.sink_lock_timeout_ms = timeout.as_millis() as u64;
        self
    }
}

/// Sink kind as requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Console,
    File,
    ConsoleAndFile,
}

impl SinkKind {
    /// Registry slots this kind occupies
    pub fn slots(self) -> &'static [SinkSlot] {
        match self {
            SinkKind::Console => &[SinkSlot::Console],
            SinkKind::File => &[SinkSlot::File],
            SinkKind::ConsoleAndFile => &[SinkSlot::Console, SinkSlot::File],
        }
    }

    /// Whether a target directory is mandatory
    pub fn needs_directory(self) -> bool {
        matches!(self, SinkKind::File | SinkKind::ConsoleAndFile)
    }
}

/// Registry key of a live sink; at most one sink per slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkSlot {
    Console,
    File,
}

impl std::fmt::Display for SinkSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkSlot::Console => f.write_str("console"),
            SinkSlot::File => f.write_str("file"),
        }
    }
}

/// Console output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleStream {
    #[default]
    Stdout,
    Stderr,
}

/// Sink configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink kind
    pub kind: SinkKind,

    /// Sink minimum level (None = inherit the façade level)
    #[serde(default)]
    pub min_level: Option<LogLevel>,

    /// Console stream
    #[serde(default)]
    pub stream: ConsoleStream,

    /// ANSI colours on the console
    #[serde(default = "default_true")]
    pub colored: bool,

    /// Target directory for file output
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// File name prefix
    #[serde(default = "default_file_prefix")]
    #[validate(length(min = 1, max = 64))]
    pub file_prefix: String,

    /// Flush the file after every line
    #[serde(default = "default_true")]
    pub auto_flush: bool,
}

fn default_true() -> bool {
    true
}

pub const DEFAULT_FILE_PREFIX: &str = "logpipe";

fn default_file_prefix() -> String {
    DEFAULT_FILE_PREFIX.to_string()
}

impl SinkConfig {
    fn of_kind(kind: SinkKind) -> Self {
        Self {
            kind,
            min_level: None,
            stream: ConsoleStream::default(),
            colored: true,
            directory: None,
            file_prefix: default_file_prefix(),
            auto_flush: true,
        }
    }

    /// Console sink with defaults
    pub fn console() -> Self {
        Self::of_kind(SinkKind::Console)
    }

    /// File sink writing into `directory`
    pub fn file(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            ..Self::of_kind(SinkKind::File)
        }
    }

    /// Console and file sinks sharing the same settings
    pub fn console_and_file(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            ..Self::of_kind(SinkKind::ConsoleAndFile)
        }
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Split into one configuration per registry slot
    pub fn per_slot(&self) -> Vec<(SinkSlot, SinkConfig)> {
        self.kind
            .slots()
            .iter()
            .map(|slot| {
                let kind = match slot {
                    SinkSlot::Console => SinkKind::Console,
                    SinkSlot::File => SinkKind::File,
                };
                (*slot, SinkConfig { kind, ..self.clone() })
            })
            .collect()
    }

    /// Effective minimum level given the façade level
    pub fn effective_level(&self, fallback: LogLevel) -> LogLevel {
        self.min_level.unwrap_or(fallback)
    }
}
