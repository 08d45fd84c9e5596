//! Error types for CLI operations.

use logger::LoggerError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Logger could not be built from the configuration
    #[error("Failed to build logger ({code}): {source}")]
    Logger {
        code: &'static str,
        #[source]
        source: LoggerError,
    },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

impl From<LoggerError> for CliError {
    fn from(source: LoggerError) -> Self {
        Self::Logger {
            code: source.code(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
