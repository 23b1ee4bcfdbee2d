//! Default values and hard limits for the CLI surface.

/// Length of one outbound audio slice.
pub const DEFAULT_AUDIO_SLICE_MS: u64 = 50;
pub const MIN_AUDIO_SLICE_MS: u64 = 20;
pub const MAX_AUDIO_SLICE_MS: u64 = 100;

/// Frames buffered between the cpal callback and the slicing worker.
pub const DEFAULT_AUDIO_CHANNEL_CAPACITY: usize = 32;

/// JPEG quality for sampled frames (100 is the highest setting).
pub const DEFAULT_JPEG_QUALITY: u8 = 100;

/// How long a screen share may take to deliver its first frame.
pub const DEFAULT_SCREEN_START_TIMEOUT_MS: u64 = 5_000;
pub(super) const MIN_SCREEN_START_TIMEOUT_MS: u64 = 500;
pub(super) const MAX_SCREEN_START_TIMEOUT_MS: u64 = 30_000;

pub(super) const MAX_DEVICE_NAME_BYTES: usize = 256;
pub(super) const FORBIDDEN_DEVICE_CHARS: &[char] = &['\n', '\r', '\0', '\t'];
