//! The realtime backend as seen from the controller: a chunk sink with a
//! connected flag.

mod bridge;

pub use bridge::BridgeClient;

use crate::error::SinkError;
use crate::media::MediaChunk;

pub trait LiveClient {
    fn connect(&mut self) -> Result<(), SinkError>;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Playback volume reported by the backend, informational only.
    fn output_volume(&self) -> f32 {
        0.0
    }

    /// Hand chunks to the backend. Refused chunks are the caller's to drop.
    fn send_realtime_input(&mut self, chunks: &[MediaChunk]) -> Result<(), SinkError>;
}
