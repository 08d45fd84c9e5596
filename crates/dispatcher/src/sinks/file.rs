//! FileSink - appends rendered entries to a timestamped file

use chrono::Utc;
use contracts::{ContractError, LogEntry, LogLevel, LogSink, SinkConfig, DEFAULT_FILE_PREFIX};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Target directory
    pub directory: PathBuf,
    /// File name prefix
    pub file_prefix: String,
    /// Minimum level
    pub min_level: LogLevel,
    /// Flush after every line
    pub auto_flush: bool,
}

impl FileSinkConfig {
    /// Defaults for a directory
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            min_level: LogLevel::Info,
            auto_flush: true,
        }
    }

    /// Create config from sink configuration
    pub fn from_sink_config(
        config: &SinkConfig,
        default_level: LogLevel,
    ) -> Result<Self, ContractError> {
        let directory = config
            .directory
            .clone()
            .filter(|d| !d.as_os_str().is_empty())
            .ok_or_else(|| {
                ContractError::sink_creation("file", "target directory must be specified")
            })?;

        Ok(Self {
            directory,
            file_prefix: config.file_prefix.clone(),
            min_level: config.effective_level(default_level),
            auto_flush: config.auto_flush,
        })
    }
}

/// Sink that appends lines to `{prefix}__{dd_mm_yy__HH_MM_SS}.log`
pub struct FileSink {
    name: String,
    min_level: LogLevel,
    auto_flush: bool,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Create a new FileSink, preparing the directory and opening the file
    #[instrument(name = "file_sink_new", skip(config), fields(dir = %config.directory.display()))]
    pub fn new(config: FileSinkConfig) -> Result<Self, ContractError> {
        let directory = prepare_directory(&config.directory)?;
        let file_name = format!(
            "{}__{}.log",
            config.file_prefix,
            Utc::now().format("%d_%m_%y__%H_%M_%S")
        );
        let path = directory.join(file_name);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                ContractError::sink_creation(
                    "file",
                    format!("cannot open {}: {e}", path.display()),
                )
            })?;

        debug!(path = %path.display(), "FileSink opened");

        Ok(Self {
            name: "file".to_string(),
            min_level: config.min_level,
            auto_flush: config.auto_flush,
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Create from sink configuration (for factory)
    pub fn from_config(config: &SinkConfig, default_level: LogLevel) -> Result<Self, ContractError> {
        Self::new(FileSinkConfig::from_sink_config(config, default_level)?)
    }

    /// Path of the file being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, entry: &LogEntry) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::other("sink closed"))?;

        writeln!(
            writer,
            "[{}]  [{}]    {}",
            entry.timestamp().format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.level().tag(),
            entry.message()
        )?;
        if let Some(error) = entry.error() {
            writeln!(writer, "EXC: {error}")?;
        }
        if self.auto_flush {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Resolve the directory, creating it when missing, and verify it is writable
fn prepare_directory(directory: &Path) -> Result<PathBuf, ContractError> {
    let directory = if directory.is_absolute() {
        directory.to_path_buf()
    } else {
        std::env::current_dir()?.join(directory)
    };

    if !directory.exists() {
        fs::create_dir_all(&directory).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => ContractError::sink_creation(
                "file",
                format!(
                    "insufficient permissions to create log directory at {}",
                    directory.display()
                ),
            ),
            _ => ContractError::sink_creation(
                "file",
                format!("cannot create {}: {e}", directory.display()),
            ),
        })?;
    }

    probe_write_permission(&directory)?;
    Ok(directory)
}

fn probe_write_permission(directory: &Path) -> Result<(), ContractError> {
    let probe = directory.join(format!(
        ".probe-{}-{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)
        .and_then(|_| fs::remove_file(&probe))
        .map_err(|_| {
            ContractError::sink_creation(
                "file",
                format!("no write permissions for directory: {}", directory.display()),
            )
        })
}

impl LogSink for FileSink {
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
        self.append(entry)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        writer
            .flush()
            .and_then(|_| writer.get_ref().sync_data())
            .map_err(|e| ContractError::sink_flush(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_close", skip(self), fields(path = %self.path.display()))]
    fn close(&mut self) -> Result<(), ContractError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer
            .flush()
            .and_then(|_| writer.get_ref().sync_all())
            .map_err(|e| ContractError::sink_close(&self.name, e.to_string()))?;
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}
