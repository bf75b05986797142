// LogManager Service
// File logger for the `log` facade and log retention cleanup

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde_json::json;

use crate::services::EventSink;

pub const LOG_FILE_NAME: &str = "theme-editor-server.log";
pub const LOG_EVENT: &str = "log://log";

/// Writes `[date][time][target][level] message` lines to the log file and
/// forwards every record to the event sink.
pub struct ServerLogger {
    file: Mutex<fs::File>,
    sink: Arc<dyn EventSink>,
    level: LevelFilter,
}

impl ServerLogger {
    pub fn new(
        log_dir: &Path,
        sink: Arc<dyn EventSink>,
        level: LevelFilter,
    ) -> Result<Self, std::io::Error> {
        fs::create_dir_all(log_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join(LOG_FILE_NAME))?;
        Ok(Self {
            file: Mutex::new(file),
            sink,
            level,
        })
    }
}

impl Log for ServerLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = Local::now();
        let date = timestamp.format("%Y-%m-%d");
        let time = timestamp.format("%H:%M:%S");
        let target = record.target();
        let level = record.level();
        let message = format!("{}", record.args());
        let line = format!("[{date}][{time}][{target}][{level}] {message}");

        if let Ok(mut file) = self.file.try_lock() {
            let _ = writeln!(file, "{line}");
        }

        let level_number = match level {
            Level::Error => 1,
            Level::Warn => 2,
            Level::Info => 3,
            Level::Debug => 4,
            Level::Trace => 5,
        };

        self.sink.emit(
            LOG_EVENT,
            json!({ "level": level_number, "message": message, "target": target }),
        );
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Install a `ServerLogger` as the global logger
pub fn init_logger(
    log_dir: &Path,
    sink: Arc<dyn EventSink>,
    level: LevelFilter,
) -> Result<(), Box<dyn std::error::Error>> {
    let logger = ServerLogger::new(log_dir, sink, level)?;
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level);
    Ok(())
}

/// Delete `.log` files older than `retention_days`. Zero keeps everything.
pub fn prune_logs(log_dir: &Path, retention_days: u32) -> Result<usize, String> {
    if retention_days == 0 || !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(retention_days as u64 * 24 * 60 * 60))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let entries = fs::read_dir(log_dir).map_err(|e| format!("Failed to read log dir: {e}"))?;
    let mut removed = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("log") {
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if modified < cutoff && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(String, Value)>>,
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: &str, payload: Value) {
            self.events.lock().unwrap().push((event.to_string(), payload));
        }
    }

    #[test]
    fn test_logger_writes_file_and_emits() {
        let temp = tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let logger = ServerLogger::new(temp.path(), sink.clone(), LevelFilter::Info).unwrap();

        logger.log(
            &Record::builder()
                .args(format_args!("theme saved"))
                .level(Level::Info)
                .target("theme_store")
                .build(),
        );
        logger.log(
            &Record::builder()
                .args(format_args!("too chatty"))
                .level(Level::Debug)
                .target("theme_store")
                .build(),
        );
        logger.flush();

        let content = fs::read_to_string(temp.path().join(LOG_FILE_NAME)).unwrap();
        assert!(content.contains("[theme_store][INFO] theme saved"));
        assert!(!content.contains("too chatty"));

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, LOG_EVENT);
        assert_eq!(events[0].1["level"], 3);
    }

    #[test]
    fn test_prune_keeps_recent_logs() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("fresh.log"), "x").unwrap();
        fs::write(temp.path().join("notes.txt"), "x").unwrap();

        assert_eq!(prune_logs(temp.path(), 30).unwrap(), 0);
        assert_eq!(prune_logs(temp.path(), 0).unwrap(), 0);
        assert!(temp.path().join("fresh.log").exists());
    }

    #[test]
    fn test_prune_missing_dir() {
        let temp = tempdir().unwrap();
        assert_eq!(prune_logs(&temp.path().join("nope"), 7).unwrap(), 0);
    }
}
