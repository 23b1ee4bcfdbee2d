//! Microphone capture for the realtime uplink.
//!
//! Audio is captured via CPAL at whatever rate the device prefers, downmixed to
//! mono, resampled to 16 kHz and cut into fixed-duration slices. Each slice is
//! published as base64 little-endian PCM plus an RMS volume sample.

/// Sample rate of every outbound audio slice.
pub const TARGET_RATE: u32 = 16_000;

mod dispatch;
mod encode;
mod input;
mod meter;
mod resample;
mod session;

pub use input::{list_input_devices, AudioInput, CpalInput, InputFrames};
pub use session::{AudioCaptureSession, AudioEvent, AudioTopic, ListenerId};

/// Number of 16 kHz samples in one slice of `slice_ms`.
pub fn samples_per_slice(slice_ms: u64) -> usize {
    ((u64::from(TARGET_RATE) * slice_ms) / 1000).max(1) as usize
}
