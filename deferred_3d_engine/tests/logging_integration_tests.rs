//! Integration tests for the logging system and the error macros
//!
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use deferred_3d_engine::deferred3d::log::{LogEntry, LogSeverity, Logger};
use deferred_3d_engine::deferred3d::{Engine, Error, Result};
use deferred_3d_engine::{engine_bail, engine_err, engine_info, engine_warn_err};
use serial_test::serial;
use std::sync::{Arc, Mutex};

/// Logger that keeps every entry for inspection
struct CapturingLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CapturingLogger {
    fn install() -> Arc<Mutex<Vec<LogEntry>>> {
        let entries = Arc::new(Mutex::new(Vec::new()));
        Engine::set_logger(Self { entries: entries.clone() });
        entries
    }
}

impl Logger for CapturingLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
#[serial]
fn test_integration_custom_logger_receives_all_severities() {
    let entries = CapturingLogger::install();

    Engine::log(LogSeverity::Trace, "test", "trace".to_string());
    Engine::log(LogSeverity::Debug, "test", "debug".to_string());
    engine_info!("deferred3d::Scene", "Loaded {} meshes", 132);
    Engine::log(LogSeverity::Warn, "test", "warn".to_string());

    {
        let captured = entries.lock().unwrap();
        let severities: Vec<LogSeverity> = captured.iter().map(|e| e.severity).collect();
        assert_eq!(
            severities,
            vec![LogSeverity::Trace, LogSeverity::Debug, LogSeverity::Info, LogSeverity::Warn]
        );
        assert_eq!(captured[2].source, "deferred3d::Scene");
        assert_eq!(captured[2].message, "Loaded 132 meshes");
        assert!(captured.iter().all(|e| e.file.is_none()));
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_error_records_call_site() {
    let entries = CapturingLogger::install();

    Engine::log_detailed(LogSeverity::Error, "deferred3d::vulkan", "device lost".to_string(), "vulkan.rs", 42);

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].file, Some("vulkan.rs"));
        assert_eq!(captured[0].line, Some(42));
    }

    Engine::reset_logger();
}

fn failing_operation(fail: bool) -> Result<u32> {
    if fail {
        engine_bail!("deferred3d::test", "operation failed with code {}", 7);
    }
    Ok(1)
}

#[test]
#[serial]
fn test_integration_error_macros_log_and_return() {
    let entries = CapturingLogger::install();

    assert_eq!(failing_operation(false).unwrap(), 1);
    match failing_operation(true) {
        Err(Error::BackendError(message)) => assert_eq!(message, "operation failed with code 7"),
        other => panic!("unexpected result: {:?}", other),
    }

    let error = engine_err!("deferred3d::test", "direct");
    assert!(matches!(error, Error::BackendError(ref m) if m == "direct"));

    let warning = engine_warn_err!("deferred3d::test", "recoverable");
    assert!(matches!(warning, Error::BackendError(_)));

    {
        let captured = entries.lock().unwrap();
        let severities: Vec<LogSeverity> = captured.iter().map(|e| e.severity).collect();
        assert_eq!(severities, vec![LogSeverity::Error, LogSeverity::Error, LogSeverity::Warn]);
        // Errors carry the call site, warnings do not
        assert!(captured[0].file.is_some());
        assert!(captured[2].file.is_none());
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let entries = CapturingLogger::install();
    Engine::log(LogSeverity::Info, "test", "captured".to_string());

    Engine::reset_logger();
    Engine::log(LogSeverity::Info, "test", "console".to_string());

    assert_eq!(entries.lock().unwrap().len(), 1);
}
