//! Dispatcher error types
//!
//! Only construction can fail. Once a queue runs, problems are reported
//! through the fallback reporter instead of being returned.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A sink could not be built from its configuration
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// The dispatch thread could not be started
    #[error("failed to spawn dispatch worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

impl DispatcherError {
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
