//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Responsible for:
//! - Contract smoke tests
//! - Configuration → façade → queue → file sink flows
//! - Concurrency and lifecycle behaviour seen from the outside

#[cfg(test)]
mod contract_tests {
    use contracts::{ConfigVersion, LogLevel, LoggingBlueprint};

    #[test]
    fn test_default_blueprint_is_valid() {
        let blueprint = LoggingBlueprint::default();
        assert_eq!(blueprint.version, ConfigVersion::V1);
        assert_eq!(blueprint.min_level, LogLevel::Info);
        assert!(config_loader::ConfigLoader::validate(&blueprint).is_ok());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{LogEntry, LogLevel, QueueConfig};
    use dispatcher::{ConsoleSink, DispatchQueue, FileSink, FileSinkConfig, QueueState};
    use logger::{Logger, SinkKind, SinkSlot};
    use observability::PipelineSummary;
    use parking_lot::Mutex;

    /// Writer shared between a console sink and the test
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    fn log_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "log"))
            .collect();
        files.sort();
        files
    }

    fn read_logs(dir: &Path) -> String {
        log_files(dir)
            .into_iter()
            .map(|p| std::fs::read_to_string(p).unwrap())
            .collect()
    }

    /// TOML config → Logger → file sink, with per-sink level filtering
    #[test]
    fn test_e2e_config_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            r#"
min_level = "debug"

[queue]
capacity = 16

[[sinks]]
kind = "file"
min_level = "info"
directory = "{}"
file_prefix = "e2e"
"#,
            dir.path().display().to_string().replace('\\', "/")
        );
        let blueprint = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let logger = Logger::from_blueprint(&blueprint).unwrap();
        assert_eq!(logger.sinks(), vec![SinkSlot::File]);

        logger.debug("below file level");
        logger.info("service started");
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.d missing");
        logger.error("reload failed", Some(&err));
        logger.shutdown();

        let files = log_files(dir.path());
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("e2e__") && name.ends_with(".log"), "{name}");

        let text = read_logs(dir.path());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3, "{text}");
        assert!(lines[0].ends_with("]  [INF]    service started"));
        assert!(lines[1].ends_with("]  [ERR]    reload failed"));
        assert_eq!(lines[2], "EXC: config.d missing");

        let stats = logger.stats();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.dropped, 0);
    }

    /// Several producer threads through the façade keep their own order
    #[test]
    fn test_e2e_concurrent_producers() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(Logger::new(LogLevel::Info).unwrap());
        logger.remove_sink(SinkSlot::Console).unwrap();
        logger.add_sink(SinkKind::File, Some(dir.path())).unwrap();

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let logger = Arc::clone(&logger);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        logger.info(format!("p{p} #{i}"));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        logger.shutdown();

        let text = read_logs(dir.path());
        assert_eq!(text.lines().count(), 1000);
        for p in 0..4 {
            let marker = format!("p{p} #");
            let seq: Vec<usize> = text
                .lines()
                .filter_map(|l| l.split_once(&marker).map(|(_, i)| i.parse().unwrap()))
                .collect();
            assert_eq!(seq, (0..250).collect::<Vec<_>>());
        }
    }

    /// Blocking-pool producers from async code; logging continues after flush
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_async_producers_and_flush() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(Logger::new(LogLevel::Info).unwrap());
        logger.remove_sink(SinkSlot::Console).unwrap();
        logger.add_sink(SinkKind::File, Some(dir.path())).unwrap();

        let tasks: Vec<_> = (0..3)
            .map(|p| {
                let logger = Arc::clone(&logger);
                tokio::task::spawn_blocking(move || {
                    for i in 0..50 {
                        logger.warn(format!("task{p}-{i}"), None);
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        logger.flush();
        assert_eq!(read_logs(dir.path()).lines().count(), 150);

        logger.info("after flush");
        logger.shutdown();
        assert!(read_logs(dir.path()).contains("after flush"));

        let summary = PipelineSummary::new(logger.stats(), Duration::from_secs(1));
        assert_eq!(summary.stats.processed, 151);
        assert!(summary.to_string().contains("Delivered: 151"));
    }

    /// Queue wired directly to both concrete sinks
    #[test]
    fn test_e2e_queue_with_console_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = SharedBuf::default();
        let console = ConsoleSink::with_writer("console", LogLevel::Trace, Box::new(out.clone()), false);
        let file = FileSink::new(FileSinkConfig::new(dir.path())).unwrap();

        let queue = DispatchQueue::spawn(
            vec![Box::new(console), Box::new(file)],
            QueueConfig::default().with_capacity(8),
        )
        .unwrap();
        assert_eq!(queue.sink_names(), vec!["console", "file"]);

        queue.enqueue(LogEntry::new(LogLevel::Debug, "debug line"));
        queue.enqueue(LogEntry::new(LogLevel::Warn, "warn line"));
        queue.shutdown();
        assert_eq!(queue.state(), QueueState::Stopped);

        let console_text = out.text();
        let console_lines: Vec<_> = console_text.lines().collect();
        assert_eq!(console_lines.len(), 2);
        assert!(console_lines[0].contains(&format!("[PID:{:>6}] [DBG]  debug line", std::process::id())));
        assert!(console_lines[1].ends_with("[WRN]  warn line"));

        // the file sink defaults to info
        let file_text = read_logs(dir.path());
        assert!(!file_text.contains("debug line"));
        assert!(file_text.contains("[WRN]    warn line"));
    }

    /// Process-wide instance: created once, shut down once
    #[test]
    fn test_e2e_global_logger() {
        let first = logger::global();
        let second = logger::global();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.sinks(), vec![SinkSlot::Console]);

        first.debug("filtered at info");
        logger::shutdown_global();
        assert!(first.is_shut_down());
        first.info("silently ignored");
        logger::shutdown_global();
    }
}
