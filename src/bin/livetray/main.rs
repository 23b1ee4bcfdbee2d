//! LiveTray entrypoint: hosts the stream controller behind a JSON-lines bridge.
//!
//! The host process owning the realtime connection spawns this binary, writes
//! commands to its stdin and reads media chunks and tray state from its stdout.
//! Diagnostics never go to stdout.

use anyhow::Result;
use livetray::config::AppConfig;
use livetray::ipc::run_bridge;
use livetray::telemetry::{init_tracing, tracing_log_path};
use livetray::{audio, init_logging, log_debug, log_file_path, log_panic};
use std::panic;

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    if config.list_input_devices {
        list_input_devices();
        return Ok(());
    }

    init_logging(&config);
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        previous(info);
    }));
    log_debug("=== LiveTray Started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));
    if init_tracing(&config) {
        log_debug(&format!("Trace log: {:?}", tracing_log_path()));
    }

    run_bridge(&config)
}

fn list_input_devices() {
    // LIVETRAY_TEST_DEVICES stands in for the host's devices in tests
    let devices = if let Ok(raw) = std::env::var("LIVETRAY_TEST_DEVICES") {
        raw.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    } else {
        audio::list_input_devices().unwrap_or_else(|err| {
            eprintln!("Failed to list audio input devices: {err}");
            Vec::new()
        })
    };

    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
}
