//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::LogLevel;
use std::path::PathBuf;

/// logpipe - drive the asynchronous logging pipeline from the command line
#[derive(Parser, Debug)]
#[command(
    name = "logpipe",
    author,
    version,
    about = "Asynchronous multi-sink logging pipeline",
    long_about = "Builds a logger from a TOML/JSON configuration and feeds it with \n\
                  synthetic load or stdin lines. Entries are dispatched by a single \n\
                  background worker to every configured console and file sink."
)]
pub struct Cli {
    /// Increase internal tracing verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LOGPIPE_VERBOSE")]
    pub verbose: u8,

    /// Suppress internal tracing except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Internal tracing output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "LOGPIPE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Tracing filter derived from -v / -q
    pub fn tracing_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate synthetic load from concurrent producers
    Run(RunArgs),

    /// Forward stdin lines as log entries until EOF
    Pipe(PipeArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "logging.toml", env = "LOGPIPE_CONFIG")]
    pub config: PathBuf,

    /// Total entries to produce across all producers (0 = unlimited)
    #[arg(long, default_value = "10000")]
    pub count: u64,

    /// Number of concurrent producers
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u16).range(1..))]
    pub producers: u16,

    /// Aggregate production rate (0 = as fast as possible)
    #[arg(long, default_value = "0")]
    pub rate_per_sec: u64,

    /// Stop producing after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0")]
    pub timeout: u64,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "LOGPIPE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `pipe` command
#[derive(Parser, Debug, Clone)]
pub struct PipeArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "logging.toml", env = "LOGPIPE_CONFIG")]
    pub config: PathBuf,

    /// Level attached to every forwarded line
    #[arg(long, default_value = "info")]
    pub level: LogLevel,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "logging.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Internal tracing format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
