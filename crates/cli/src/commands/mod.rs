//! Command implementations.

mod pipe;
mod run;
mod validate;

pub use pipe::run_pipe;
pub use run::run_load;
pub use validate::run_validate;

use std::path::Path;

use logger::Logger;
use tracing::{info, warn};

use crate::error::{CliError, Result};

/// Build a logger from a configuration file
fn load_logger(path: &Path) -> Result<Logger> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    let logger = Logger::from_path(path)?;
    info!(config = %path.display(), sinks = ?logger.sinks(), "Logger ready");
    Ok(logger)
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
