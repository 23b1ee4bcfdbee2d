//! Structured trace output for chunk and tick timing.

use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<bool> = OnceLock::new();

pub fn tracing_log_path() -> PathBuf {
    env::var("LIVETRAY_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("livetray_trace.jsonl"))
}

/// Install the JSON subscriber once. Returns whether a subscriber is active.
pub fn init_tracing(config: &AppConfig) -> bool {
    if !config.logging_enabled() {
        return false;
    }
    *TRACING_INIT.get_or_init(|| {
        let path = tracing_log_path();
        let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
            return false;
        };
        let max_level = if config.log_timings {
            tracing::Level::TRACE
        } else {
            tracing::Level::DEBUG
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(max_level)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).is_ok()
    })
}
