//! `pipe` command implementation.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use super::{load_logger, shutdown_signal};
use crate::cli::PipeArgs;

/// Execute the `pipe` command
pub async fn run_pipe(args: &PipeArgs) -> Result<()> {
    let logger = load_logger(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut forwarded: u64 = 0;
    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("Failed to read stdin")? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    logger.log(args.level, line, None);
                    forwarded += 1;
                }
                None => break,
            },
            _ = &mut shutdown => {
                warn!("Received shutdown signal, stopping");
                break;
            }
        }
    }

    logger.shutdown();
    let stats = logger.stats();
    info!(
        forwarded,
        delivered = stats.processed,
        dropped = stats.dropped,
        "stdin forwarding finished"
    );
    Ok(())
}
