//! Unit tests for log.rs
//!
//! Covers severities, entry formatting and the error-producing macros.

use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use crate::error::{Error, Result};
use crate::engine::Engine;
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

struct CaptureLogger {
    entries: Arc<Mutex<Vec<(LogSeverity, String)>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push((entry.severity, entry.message.clone()));
    }
}

fn capture() -> Arc<Mutex<Vec<(LogSeverity, String)>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: entries.clone() });
    entries
}

// ============================================================================
// LOG SEVERITY
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_labels_are_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
}

// ============================================================================
// DEFAULT LOGGER
// ============================================================================

#[test]
fn test_format_plain_without_location() {
    let entry = LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "deferred3d::Scene".to_string(),
        message: "Loaded 2 meshes".to_string(),
        file: None,
        line: None,
    };

    let line = DefaultLogger::format_plain(&entry);
    assert!(line.contains("[INFO ] [deferred3d::Scene] Loaded 2 meshes"));
    assert!(!line.contains(".rs:"));
}

#[test]
fn test_format_plain_with_location() {
    let entry = LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "deferred3d::vulkan".to_string(),
        message: "device lost".to_string(),
        file: Some("vulkan.rs"),
        line: Some(42),
    };

    let line = DefaultLogger::format_plain(&entry);
    assert!(line.ends_with("device lost (vulkan.rs:42)"));
}

#[test]
fn test_default_logger_min_severity() {
    assert_eq!(DefaultLogger::new().min_severity(), LogSeverity::Debug);
    let logger = DefaultLogger::with_min_severity(LogSeverity::Warn);
    assert_eq!(logger.min_severity(), LogSeverity::Warn);
}

// ============================================================================
// ERROR MACROS
// ============================================================================

#[test]
#[serial]
fn test_engine_err_logs_and_builds_error() {
    let entries = capture();

    let err = crate::engine_err!("deferred3d::test", "slot {} invalid", 7);

    match err {
        Error::BackendError(msg) => assert_eq!(msg, "slot 7 invalid"),
        other => panic!("unexpected {:?}", other),
    }
    let logged = entries.lock().unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0], (LogSeverity::Error, "slot 7 invalid".to_string()));
    drop(logged);
    Engine::reset_logger();
}

#[test]
#[serial]
fn test_engine_bail_warn_returns_early() {
    let entries = capture();

    fn check(value: u32) -> Result<u32> {
        if value > 3 {
            crate::engine_bail_warn!("deferred3d::test", "value {} too large", value);
        }
        Ok(value)
    }

    assert_eq!(check(2).unwrap(), 2);
    assert!(check(9).is_err());
    let logged = entries.lock().unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].0, LogSeverity::Warn);
    drop(logged);
    Engine::reset_logger();
}
