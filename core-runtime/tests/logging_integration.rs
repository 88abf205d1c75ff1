//! Integration tests for logging system
//!
//! `init_logging` installs a process-global subscriber, so everything that
//! needs it runs inside a single test.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig,
};

#[derive(Default)]
struct RecordingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for RecordingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Trace
    }
}

#[test]
fn test_global_logging_mirrors_workspace_events() {
    let sink = Arc::new(RecordingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Info)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::info!(target: "core_sync", total_tracks = 12u64, "Downloading audio");
    tracing::debug!(target: "core_sync", track_id = "s1_1", "Track cached");
    tracing::warn!(
        target: "provider_firestore",
        api_key = "AIza-secret",
        "Catalog request retried"
    );
    tracing::error!(target: "sqlx", "pool timed out");
    tracing::info!(target: "sqlx", "statement executed");

    {
        let entries = sink.entries.lock().unwrap();
        let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Downloading audio", "Catalog request retried", "pool timed out"]
        );

        assert_eq!(entries[0].fields.get("total_tracks"), Some(&"12".to_string()));
        assert_eq!(
            entries[1].fields.get("api_key"),
            Some(&"[REDACTED]".to_string())
        );
        assert_eq!(entries[2].level, LogLevel::Error);
    }

    let second = init_logging(LoggingConfig::default());
    assert!(second.is_err());
}

#[test]
fn test_redaction_of_catalog_fields() {
    assert_eq!(redact_if_sensitive("firestore_api_key", "AIza"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("url_signature", "abc"), "[REDACTED]");

    assert_eq!(redact_if_sensitive("song_id", "s1"), "s1");
    assert_eq!(
        redact_if_sensitive("download_url", "https://cdn.example.com/s1/click.mp3"),
        "https://cdn.example.com/s1/click.mp3"
    );
    assert_eq!(
        redact_if_sensitive("owner", "worship@church.org"),
        "w***@[REDACTED]"
    );
}

#[test]
fn test_database_path_is_reduced_to_file_name() {
    assert_eq!(
        strip_path("/home/ana/.local/share/stem-player/offline-cache.db"),
        "offline-cache.db"
    );
    assert_eq!(
        strip_path("C:\\Users\\ana\\AppData\\stem-player\\offline-cache.db"),
        "offline-cache.db"
    );
    assert_eq!(strip_path("offline-cache.db"), "offline-cache.db");
}
