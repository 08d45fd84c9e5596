//! ConsoleSink - renders entries as coloured lines on a terminal stream

use std::io::{self, IsTerminal, Write};

use contracts::{ConsoleStream, ContractError, LogEntry, LogLevel, LogSink, SinkConfig};
use tracing::{debug, instrument};

const RESET: &str = "\x1b[0m";
const ERROR_STYLE: &str = "\x1b[1;3;97;41m";

/// ANSI style per level: foreground, plus background for fatal
fn level_style(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "\x1b[90m",
        LogLevel::Debug => "\x1b[35m",
        LogLevel::Info => "\x1b[32m",
        LogLevel::Warn => "\x1b[33m",
        LogLevel::Error => "\x1b[31m",
        LogLevel::Fatal => "\x1b[97;41m",
    }
}

/// Sink that writes human-readable lines to stdout, stderr or any writer
pub struct ConsoleSink {
    name: String,
    min_level: LogLevel,
    colored: bool,
    out: Box<dyn Write + Send>,
    pid: u32,
    closed: bool,
}

impl ConsoleSink {
    /// Console sink on stdout; colours only when stdout is a terminal
    pub fn new(min_level: LogLevel) -> Self {
        let colored = io::stdout().is_terminal();
        Self::with_writer("console", min_level, Box::new(io::stdout()), colored)
    }

    /// Console sink on stderr
    pub fn stderr(min_level: LogLevel) -> Self {
        let colored = io::stderr().is_terminal();
        Self::with_writer("console", min_level, Box::new(io::stderr()), colored)
    }

    /// Console sink over an arbitrary writer
    pub fn with_writer(
        name: impl Into<String>,
        min_level: LogLevel,
        out: Box<dyn Write + Send>,
        colored: bool,
    ) -> Self {
        Self {
            name: name.into(),
            min_level,
            colored,
            out,
            pid: std::process::id(),
            closed: false,
        }
    }

    /// Create from sink configuration (for factory)
    pub fn from_config(config: &SinkConfig, default_level: LogLevel) -> Self {
        let level = config.effective_level(default_level);
        let (out, is_tty): (Box<dyn Write + Send>, bool) = match config.stream {
            ConsoleStream::Stdout => (Box::new(io::stdout()), io::stdout().is_terminal()),
            ConsoleStream::Stderr => (Box::new(io::stderr()), io::stderr().is_terminal()),
        };
        Self::with_writer("console", level, out, config.colored && is_tty)
    }

    fn render(&self, entry: &LogEntry) -> String {
        let ts = entry.timestamp().format("%d.%m.%Y %H:%M:%S%.6f");
        let level = entry.level();
        let mut line = if self.colored {
            format!(
                "{}[{ts}] [PID:{:>6}] [{}]  {}{RESET}\n",
                level_style(level),
                self.pid,
                level.tag(),
                entry.message()
            )
        } else {
            format!(
                "[{ts}] [PID:{:>6}] [{}]  {}\n",
                self.pid,
                level.tag(),
                entry.message()
            )
        };

        if let Some(error) = entry.error() {
            if self.colored {
                line.push_str(&format!("{ERROR_STYLE}{error}{RESET}\n"));
            } else {
                line.push_str(&format!("{error}\n"));
            }
        }
        line
    }
}

impl LogSink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }

    fn write(&mut self, entry: &LogEntry) -> Result<(), ContractError> {
        if !self.should_log(entry.level()) {
            return Ok(());
        }
        if self.closed {
            return Err(ContractError::sink_write(&self.name, "sink closed"));
        }
        let line = self.render(entry);
        self.out
            .write_all(line.as_bytes())
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        self.out
            .flush()
            .map_err(|e| ContractError::sink_flush(&self.name, e.to_string()))
    }

    #[instrument(name = "console_sink_close", skip(self), fields(sink = %self.name))]
    fn close(&mut self) -> Result<(), ContractError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.out
            .flush()
            .map_err(|e| ContractError::sink_close(&self.name, e.to_string()))?;
        debug!(sink = %self.name, "ConsoleSink closed");
        Ok(())
    }
}
