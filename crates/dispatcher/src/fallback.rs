//! FallbackReporter - out-of-band channel for the pipeline's own problems
//!
//! Queue-full drops, sink failures and worker crashes are reported here. The
//! reporter writes straight to its own sink and never touches a dispatch
//! queue, so reporting cannot re-enter the queue it reports on.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use contracts::{ErrorDetail, LogEntry, LogLevel, LogSink};
use parking_lot::Mutex;

use crate::sinks::ConsoleSink;

/// Shared handle to the fallback sink
#[derive(Clone)]
pub struct FallbackReporter {
    sink: Arc<Mutex<Box<dyn LogSink>>>,
}

impl FallbackReporter {
    /// Console-style reporter on stderr accepting every level
    pub fn console() -> Self {
        Self::new(ConsoleSink::stderr(LogLevel::Trace))
    }

    /// Reporter over an arbitrary sink
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(sink))),
        }
    }

    /// Report a problem; never fails and never panics
    pub fn report(&self, level: LogLevel, message: impl Into<String>, error: Option<ErrorDetail>) {
        let entry = LogEntry::with_error(level, message, error);
        let mut sink = self.sink.lock();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| sink.write(&entry)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, dropped = entry.message(), "Fallback sink write failed");
            }
            Err(_) => {
                tracing::error!(dropped = entry.message(), "Fallback sink panicked");
            }
        }
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.report(LogLevel::Warn, message, None);
    }

    pub fn error(&self, message: impl Into<String>, error: Option<ErrorDetail>) {
        self.report(LogLevel::Error, message, error);
    }

    pub fn fatal(&self, message: impl Into<String>, error: Option<ErrorDetail>) {
        self.report(LogLevel::Fatal, message, error);
    }

    /// Flush the underlying sink; never fails and never panics
    pub fn flush(&self) {
        let mut sink = self.sink.lock();
        match panic::catch_unwind(AssertUnwindSafe(|| sink.flush())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Fallback sink flush failed"),
            Err(_) => tracing::error!("Fallback sink panicked while flushing"),
        }
    }
}

impl Default for FallbackReporter {
    fn default() -> Self {
        Self::console()
    }
}

impl std::fmt::Debug for FallbackReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackReporter").finish_non_exhaustive()
    }
}
