//! LogEntry - immutable record produced per log call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;

use crate::LogLevel;

/// Captured failure detail attached to an entry.
///
/// The error and its `source()` chain are rendered to text at capture time so
/// the entry stays `Clone + Send` and owns nothing borrowed from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Display output of the outermost error
    pub message: String,
    /// Display output of each cause, outermost first
    pub causes: Vec<String>,
}

impl ErrorDetail {
    /// Create a detail without a cause chain
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Capture an error together with its `source()` chain
    pub fn capture(error: &(dyn StdError + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(cause) = current {
            causes.push(cause.to_string());
            current = cause.source();
        }
        Self {
            message: error.to_string(),
            causes,
        }
    }

    /// Append a cause (builder style)
    pub fn caused_by(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for cause in &self.causes {
            write!(f, "\n  caused by: {cause}")?;
        }
        Ok(())
    }
}

impl<E: StdError + 'static> From<&E> for ErrorDetail {
    fn from(error: &E) -> Self {
        Self::capture(error)
    }
}

/// A single log record.
///
/// No validation happens here; level filtering is the caller's job.
/// The timestamp is taken at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    level: LogLevel,
    message: String,
    error: Option<ErrorDetail>,
    timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Create an entry without attached error
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an entry with an optional attached error
    pub fn with_error(
        level: LogLevel,
        message: impl Into<String>,
        error: Option<ErrorDetail>,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            error,
            timestamp: Utc::now(),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error(&self) -> Option<&ErrorDetail> {
        self.error.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
