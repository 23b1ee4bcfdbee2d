use super::LiveClient;
use crate::error::SinkError;
use crate::ipc::{EventWriter, IpcEvent};
use crate::log_debug;
use crate::media::MediaChunk;

/// Backend client that forwards everything as JSON lines to the host process,
/// which owns the actual realtime connection.
#[derive(Debug)]
pub struct BridgeClient {
    writer: EventWriter,
    connected: bool,
    output_volume: f32,
}

impl BridgeClient {
    pub fn new(writer: EventWriter) -> Self {
        Self {
            writer,
            connected: false,
            output_volume: 0.0,
        }
    }

    /// The host reported that the remote side went away.
    pub fn connection_lost(&mut self) {
        if self.connected {
            log_debug("bridge: host reported connection lost");
            self.connected = false;
        }
    }

    pub fn set_output_volume(&mut self, volume: f32) {
        self.output_volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    fn announce(&self) -> Result<(), SinkError> {
        self.writer
            .send(&IpcEvent::Connection {
                connected: self.connected,
            })
            .map_err(|err| SinkError::Unavailable(err.to_string()))
    }
}

impl LiveClient for BridgeClient {
    fn connect(&mut self) -> Result<(), SinkError> {
        if self.connected {
            return Ok(());
        }
        self.connected = true;
        if let Err(err) = self.announce() {
            self.connected = false;
            return Err(err);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        if let Err(err) = self.announce() {
            log_debug(&format!("bridge: disconnect notice failed: {err}"));
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn output_volume(&self) -> f32 {
        self.output_volume
    }

    fn send_realtime_input(&mut self, chunks: &[MediaChunk]) -> Result<(), SinkError> {
        if !self.connected {
            return Err(SinkError::Unavailable("not connected".to_string()));
        }
        self.writer
            .send(&IpcEvent::RealtimeInput {
                media_chunks: chunks.to_vec(),
            })
            .map_err(|err| SinkError::Unavailable(err.to_string()))
    }
}
