//! Integration tests for logging and diagnostics

use bridge_traits::diagnostics::{Diagnostic, DiagnosticLevel, DiagnosticSink};
use core_runtime::diagnostics::{targets, DiagnosticReporter};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};

#[test]
fn test_logging_config_round_trip() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(DiagnosticLevel::Warn)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, DiagnosticLevel::Warn);
    assert!(config.enable_spans);
}

#[test]
fn test_init_logging_twice_fails() {
    let config = LoggingConfig::default().with_format(LogFormat::Compact);

    // Only one global subscriber per process; the second call must fail
    // whether or not this test installed the first.
    let _ = init_logging(config.clone());
    assert!(init_logging(config).is_err());
}

#[test]
fn test_reporter_delivers_structured_fields() {
    let seen = Arc::new(Mutex::new(Vec::<Diagnostic>::new()));
    let seen_clone = Arc::clone(&seen);
    let sink: Arc<dyn DiagnosticSink> = Arc::new(move |diagnostic: &Diagnostic| {
        seen_clone.lock().unwrap().push(diagnostic.clone());
    });

    let reporter = DiagnosticReporter::new(Some(sink));
    reporter
        .warn(targets::SYNC, "Progress regressed")
        .field("previous", 10)
        .field("received", 4)
        .emit();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].target, "sync");
    assert_eq!(seen[0].fields.get("received"), Some(&"4".to_string()));
}
