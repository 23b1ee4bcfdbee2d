use crate::devices::VideoSource;
use serde::Serialize;

/// Floor and ceiling of the input-volume indicator, in pixels.
pub const MIN_VOLUME_PX: f32 = 5.0;
pub const MAX_VOLUME_PX: f32 = 8.0;
const VOLUME_PX_SCALE: f32 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrayState {
    Idle,
    LiveMuted,
    LiveActive,
}

impl TrayState {
    pub fn from_flags(connected: bool, muted: bool) -> Self {
        match (connected, muted) {
            (false, _) => TrayState::Idle,
            (true, true) => TrayState::LiveMuted,
            (true, false) => TrayState::LiveActive,
        }
    }
}

/// Everything the tray renders. Derived on demand; holds no state of its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrayView {
    pub connected: bool,
    pub muted: bool,
    pub state: TrayState,
    pub video_source: VideoSource,
    pub camera_streaming: bool,
    pub screen_streaming: bool,
    pub supports_video: bool,
    pub media_controls_enabled: bool,
    pub connect_focused: bool,
    pub in_volume_px: f32,
    pub output_volume: f32,
    pub dropped_chunks: u64,
}

/// Map a [0, 1] volume sample to the indicator size.
pub fn volume_px(volume: f32) -> f32 {
    let volume = if volume.is_finite() { volume } else { 0.0 };
    (volume * VOLUME_PX_SCALE).min(MAX_VOLUME_PX).max(MIN_VOLUME_PX)
}
