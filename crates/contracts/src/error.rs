//! Errors shared across the pipeline
//!
//! Two families: configuration problems, surfaced to whoever builds a logger,
//! and sink failures, which the dispatch worker reports and then moves past.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    /// Document could not be read or deserialized
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Document parsed but a rule was violated at `field`
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("sink '{sink_name}' creation error: {message}")]
    SinkCreation { sink_name: String, message: String },

    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    #[error("sink '{sink_name}' flush error: {message}")]
    SinkFlush { sink_name: String, message: String },

    #[error("sink '{sink_name}' close error: {message}")]
    SinkClose { sink_name: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn sink_creation(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    pub fn sink_flush(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkFlush {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    pub fn sink_close(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkClose {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Name of the sink involved, for sink-family errors
    pub fn sink_name(&self) -> Option<&str> {
        match self {
            Self::SinkCreation { sink_name, .. }
            | Self::SinkWrite { sink_name, .. }
            | Self::SinkFlush { sink_name, .. }
            | Self::SinkClose { sink_name, .. } => Some(sink_name),
            _ => None,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigParse { .. } | Self::ConfigValidation { .. })
    }
}
