//! LogSink trait - dispatcher output interface
//!
//! The full capability a destination must provide to be pluggable into the
//! dispatch queue.

use crate::{ContractError, LogEntry, LogLevel};

/// Log output trait
///
/// Only the queue's single worker ever calls `write`, so implementations need
/// not be reentrant. `flush` and `close` may be called repeatedly and must
/// tolerate that.
pub trait LogSink: Send {
    /// Sink name (used in diagnostics and metrics)
    fn name(&self) -> &str;

    /// Configured minimum level
    fn min_level(&self) -> LogLevel;

    /// True iff the configured minimum is at or below `level`
    fn should_log(&self, level: LogLevel) -> bool {
        self.min_level().admits(level)
    }

    /// Write one entry
    ///
    /// # Errors
    /// Returns write error (should include context). A failed write must
    /// leave the sink usable for subsequent calls.
    fn write(&mut self, entry: &LogEntry) -> Result<(), ContractError>;

    /// Force buffered output to durable storage
    fn flush(&mut self) -> Result<(), ContractError>;

    /// Release sink-owned resources; idempotent
    fn close(&mut self) -> Result<(), ContractError>;
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn min_level(&self) -> LogLevel {
        (**self).min_level()
    }

    fn should_log(&self, level: LogLevel) -> bool {
        (**self).should_log(level)
    }

    fn write(&mut self, entry: &LogEntry) -> Result<(), ContractError> {
        (**self).write(entry)
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<(), ContractError> {
        (**self).close()
    }
}
