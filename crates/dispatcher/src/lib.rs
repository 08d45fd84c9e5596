//! # Dispatcher
//!
//! Asynchronous log dispatch.
//!
//! Responsible for:
//! - Accepting entries from any number of producer threads
//! - Fan-out to every sink from one dedicated worker, in FIFO order
//! - Isolating failing or slow sinks from producers and from each other

pub mod error;
pub mod fallback;
pub mod metrics;
pub mod queue;
pub mod sinks;

pub use contracts::{LogEntry, LogLevel, LogSink, QueueConfig, QueueStats};
pub use error::DispatcherError;
pub use fallback::FallbackReporter;
pub use metrics::QueueMetrics;
pub use queue::{DispatchQueue, QueueState};
pub use sinks::{ConsoleSink, FileSink, FileSinkConfig, create_sink, create_sinks};
