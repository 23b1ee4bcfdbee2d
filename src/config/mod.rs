//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::Parser;

pub use defaults::{
    DEFAULT_AUDIO_CHANNEL_CAPACITY, DEFAULT_AUDIO_SLICE_MS, DEFAULT_JPEG_QUALITY,
    DEFAULT_SCREEN_START_TIMEOUT_MS, MAX_AUDIO_SLICE_MS, MIN_AUDIO_SLICE_MS,
};

/// CLI options for the livetray media bridge.
#[derive(Debug, Parser, Clone)]
#[command(about = "LiveTray realtime media bridge", author, version)]
pub struct AppConfig {
    /// Preferred audio input device name
    #[arg(long, env = "LIVETRAY_INPUT_DEVICE")]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Duration of each outbound audio slice (milliseconds)
    #[arg(long = "audio-slice-ms", default_value_t = DEFAULT_AUDIO_SLICE_MS)]
    pub audio_slice_ms: u64,

    /// Frame channel capacity between the audio callback and the slicing worker
    #[arg(
        long = "audio-channel-capacity",
        default_value_t = DEFAULT_AUDIO_CHANNEL_CAPACITY
    )]
    pub audio_channel_capacity: usize,

    /// Camera index used when the camera source is selected
    #[arg(long = "camera-index", default_value_t = 0)]
    pub camera_index: u32,

    /// FFmpeg binary used for screen sharing
    #[arg(long = "ffmpeg-cmd", env = "LIVETRAY_FFMPEG", default_value = "ffmpeg")]
    pub ffmpeg_cmd: String,

    /// Time allowed for a screen share to produce its first frame (milliseconds)
    #[arg(
        long = "screen-start-timeout-ms",
        default_value_t = DEFAULT_SCREEN_START_TIMEOUT_MS
    )]
    pub screen_start_timeout_ms: u64,

    /// JPEG quality for sampled video frames (1-100)
    #[arg(long = "jpeg-quality", default_value_t = DEFAULT_JPEG_QUALITY)]
    pub jpeg_quality: u8,

    /// Disable the camera and screen-share sources
    #[arg(long = "no-video", default_value_t = false)]
    pub no_video: bool,

    /// Start with the microphone muted
    #[arg(long = "start-muted", default_value_t = false)]
    pub start_muted: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "LIVETRAY_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "LIVETRAY_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging device names and other user content (debug log only)
    #[arg(
        long = "log-content",
        env = "LIVETRAY_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,

    /// Enable per-chunk timing events in the trace log
    #[arg(long)]
    pub log_timings: bool,
}

/// Settings consumed by the audio capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCaptureConfig {
    pub slice_ms: u64,
    pub channel_capacity: usize,
}

/// Settings consumed by the camera and screen-share providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSourceConfig {
    pub camera_index: u32,
    pub ffmpeg_cmd: String,
    pub screen_start_timeout_ms: u64,
}

/// Settings consumed by the video frame sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub jpeg_quality: u8,
}

impl AppConfig {
    /// Whether camera and screen-share sources may be selected.
    pub fn supports_video(&self) -> bool {
        !self.no_video
    }

    /// Whether any file logging was requested and not vetoed.
    pub fn logging_enabled(&self) -> bool {
        (self.logs || self.log_timings) && !self.no_logs
    }
}
