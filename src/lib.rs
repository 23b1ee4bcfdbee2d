pub mod app;
pub mod audio;
pub mod client;
pub mod config;
pub mod controller;
pub mod devices;
pub mod error;
pub mod ipc;
pub mod media;
mod sync;
pub mod telemetry;
#[cfg(test)]
mod test_support;
pub mod video;

pub use app::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic,
};
