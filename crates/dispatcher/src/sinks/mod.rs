//! Sink implementations
//!
//! Contains ConsoleSink and FileSink, plus the factory building them from
//! configuration.

mod console;
mod file;

pub use self::console::ConsoleSink;
pub use self::file::{FileSink, FileSinkConfig};

use contracts::{LogLevel, LogSink, SinkConfig, SinkKind};
use tracing::instrument;

use crate::error::DispatcherError;

/// Create the sinks described by one configuration entry.
///
/// `ConsoleAndFile` yields two sinks, console first.
#[instrument(name = "dispatcher_create_sinks", skip(config), fields(kind = ?config.kind))]
pub fn create_sinks(
    config: &SinkConfig,
    default_level: LogLevel,
) -> Result<Vec<Box<dyn LogSink>>, DispatcherError> {
    let mut sinks = Vec::with_capacity(config.kind.slots().len());
    for (_, part) in config.per_slot() {
        sinks.push(create_sink(&part, default_level)?);
    }
    Ok(sinks)
}

/// Create a single sink from a per-slot configuration
pub fn create_sink(
    config: &SinkConfig,
    default_level: LogLevel,
) -> Result<Box<dyn LogSink>, DispatcherError> {
    match config.kind {
        SinkKind::Console => Ok(Box::new(ConsoleSink::from_config(config, default_level))),
        SinkKind::File => {
            let sink = FileSink::from_config(config, default_level)
                .map_err(|e| DispatcherError::sink_creation("file", e.to_string()))?;
            Ok(Box::new(sink))
        }
        SinkKind::ConsoleAndFile => Err(DispatcherError::sink_creation(
            "console_and_file",
            "composite kind must be split per slot before construction",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_console_and_file() {
        let dir = tempdir().unwrap();
        let config = SinkConfig::console_and_file(dir.path()).with_min_level(LogLevel::Warn);

        let sinks = create_sinks(&config, LogLevel::Info).unwrap();

        assert_eq!(sinks.len(), 2);
        assert_eq!(sinks[0].name(), "console");
        assert_eq!(sinks[1].name(), "file");
        assert!(sinks.iter().all(|s| s.min_level() == LogLevel::Warn));
    }

    #[test]
    fn test_inherits_default_level() {
        let sinks = create_sinks(&SinkConfig::console(), LogLevel::Debug).unwrap();
        assert_eq!(sinks[0].min_level(), LogLevel::Debug);
    }

    #[test]
    fn test_composite_kind_rejected_by_single_factory() {
        let dir = tempdir().unwrap();
        let result = create_sink(&SinkConfig::console_and_file(dir.path()), LogLevel::Info);
        assert!(matches!(result, Err(DispatcherError::SinkCreation { .. })));
    }
}
