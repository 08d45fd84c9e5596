//! Process-wide logger instance

use std::sync::OnceLock;

use contracts::{ErrorDetail, LogLevel, QueueConfig};
use dispatcher::FallbackReporter;

use crate::Logger;

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Process-wide logger, created on first use with a console sink at info.
///
/// If the queue cannot be started the logger still exists but drops every
/// entry; the failure is reported on stderr.
pub fn global() -> &'static Logger {
    GLOBAL.get_or_init(|| {
        let fallback = FallbackReporter::console();
        Logger::with_fallback(LogLevel::Info, QueueConfig::default(), fallback.clone()).unwrap_or_else(
            |e| {
                fallback.fatal("Failed to start global logger", Some(ErrorDetail::capture(&e)));
                Logger::disabled(LogLevel::Info, fallback)
            },
        )
    })
}

/// Shut the process-wide logger down if it was ever created
pub fn shutdown_global() {
    if let Some(logger) = GLOBAL.get() {
        logger.shutdown();
    }
}
