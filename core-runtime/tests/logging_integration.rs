//! Integration tests for the global logging setup

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for RecordingSink {
    async fn log(&self, entry: LogEntry) -> BridgeResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Warn
    }
}

// The global subscriber can only be installed once per process, so every
// assertion that depends on it lives in this single test.
#[test]
fn test_global_logging_forwards_to_sink() {
    let sink = Arc::new(RecordingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::info!(target: "core_drm::rights", "below the sink threshold");
    tracing::warn!(
        target: "core_drm::rights",
        href = "https://example.com/license/2",
        token = "abc.def.ghi",
        "More than one license link found"
    );

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.message, "More than one license link found");
        assert_eq!(
            entry.fields.get("href").map(String::as_str),
            Some("https://example.com/license/2")
        );
        assert_eq!(entry.fields.get("token").map(String::as_str), Some("[REDACTED]"));
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Logging(_))));
}

#[test]
fn test_redaction_of_credentials() {
    assert_eq!(redact_if_sensitive("bearer_token", "eyJ0eXAi"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("signature", "c2ln"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("audiobook_id", "urn:isbn:1"), "urn:isbn:1");
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/data/books/urn-isbn-1/part-02.mp3"), "part-02.mp3");
    assert_eq!(strip_path("D:\\Books\\chapter.m4a"), "chapter.m4a");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_pii_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_pii);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
