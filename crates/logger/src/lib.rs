//! # Logger
//!
//! Logging façade over the dispatch queue.
//!
//! Responsible for:
//! - The sink registry (one console and one file slot)
//! - Level-named log calls that never fail
//! - Rebuilding the queue whenever the sink set changes
//!
//! # Example
//!
//! ```no_run
//! use logger::{Logger, LogLevel, SinkKind};
//! use std::path::Path;
//!
//! let log = Logger::new(LogLevel::Debug)?;
//! log.add_sink(SinkKind::File, Some(Path::new("./logs")))?;
//! log.info("service started");
//! log.shutdown();
//! # Ok::<(), logger::LoggerError>(())
//! ```

mod error;
mod facade;
mod global;

pub use contracts::{LogLevel, LoggingBlueprint, QueueStats, SinkKind, SinkSlot};
pub use error::LoggerError;
pub use facade::Logger;
pub use global::{global, shutdown_global};
