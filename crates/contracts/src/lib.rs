//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the logging pipeline.
//! Business crates depend on this crate only; reverse dependencies are
//! prohibited.
//!
//! ## Time Model
//! - Entries carry a UTC wall-clock timestamp taken at construction
//! - Ordering between producers is defined by enqueue order, not timestamps

mod blueprint;
mod entry;
mod error;
mod level;
mod sink;
mod stats;

pub use blueprint::*;
pub use entry::{ErrorDetail, LogEntry};
pub use error::*;
pub use level::{LogLevel, ParseLevelError};
pub use sink::LogSink;
pub use stats::QueueStats;
