//! Façade errors with stable operator codes

use contracts::{ContractError, SinkKind};
use dispatcher::DispatcherError;
use thiserror::Error;

/// Logger error
#[derive(Debug, Error)]
pub enum LoggerError {
    /// A file-backed sink was requested without a target directory
    #[error("[LB-DIR-001] target directory must be specified for {kind:?} logging")]
    MissingTargetDirectory { kind: SinkKind },

    /// Operation not valid in the logger's current state
    #[error("[LB-LOGIC-001] {0}")]
    InvalidOperation(String),

    /// Invalid configuration
    #[error("[LB-CFG-001] invalid logging configuration: {0}")]
    Config(#[from] ContractError),

    /// Sink or queue construction failed
    #[error("[LB-SINK-001] {0}")]
    Sink(#[from] DispatcherError),
}

impl LoggerError {
    /// Stable code for operators
    pub fn code(&self) -> &'static str {
        match self {
            LoggerError::MissingTargetDirectory { .. } => "LB-DIR-001",
            LoggerError::InvalidOperation(_) => "LB-LOGIC-001",
            LoggerError::Config(_) => "LB-CFG-001",
            LoggerError::Sink(_) => "LB-SINK-001",
        }
    }
}
