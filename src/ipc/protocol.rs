//! JSON-lines protocol spoken with the process that owns the realtime session.
//!
//! Events flow out on stdout tagged by `"event"`; commands flow in on stdin
//! tagged by `"cmd"`. One JSON object per line.

use crate::controller::TrayView;
use crate::devices::VideoSource;
use crate::media::MediaChunk;
use crate::sync::lock_or_recover;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

// ============================================================================
// Events (livetray → host)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum IpcEvent {
    /// Sent once on startup and again on `get_capabilities`
    #[serde(rename = "capabilities")]
    Capabilities {
        session_id: String,
        version: String,
        input_device: Option<String>,
        supports_video: bool,
        camera_compiled: bool,
        screen_tool: String,
        audio_mime: String,
        video_mime: String,
        audio_slice_ms: u64,
    },

    /// Connection flag as last set by connect/disconnect/connection_lost
    #[serde(rename = "connection")]
    Connection { connected: bool },

    /// Media for the realtime backend
    #[serde(rename = "realtime_input")]
    RealtimeInput {
        #[serde(rename = "mediaChunks")]
        media_chunks: Vec<MediaChunk>,
    },

    /// Full tray projection after every state change
    #[serde(rename = "tray")]
    Tray(TrayView),

    /// The active video stream was replaced or released
    #[serde(rename = "stream_changed")]
    StreamChanged {
        source: VideoSource,
        stream_id: Option<u64>,
    },

    #[serde(rename = "error")]
    Error { message: String, recoverable: bool },
}

// ============================================================================
// Commands (host → livetray)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd")]
pub enum IpcCommand {
    #[serde(rename = "connect")]
    Connect,

    #[serde(rename = "disconnect")]
    Disconnect,

    #[serde(rename = "toggle_mute")]
    ToggleMute,

    #[serde(rename = "select_source")]
    SelectSource { source: VideoSource },

    /// The remote side dropped the session without a local disconnect
    #[serde(rename = "connection_lost")]
    ConnectionLost,

    /// Playback volume reported by the host, informational only
    #[serde(rename = "output_volume")]
    OutputVolume { volume: f32 },

    #[serde(rename = "get_capabilities")]
    GetCapabilities,

    #[serde(rename = "quit")]
    Quit,
}

pub fn parse_command(line: &str) -> Result<IpcCommand, serde_json::Error> {
    serde_json::from_str(line.trim())
}

// ============================================================================
// Event Writer
// ============================================================================

/// Line-oriented event output shared by the driver loop and the bridge client.
#[derive(Clone)]
pub struct EventWriter {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl EventWriter {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn send(&self, event: &IpcEvent) -> io::Result<()> {
        let json = serde_json::to_string(event).map_err(io::Error::other)?;
        let mut out = lock_or_recover(&self.out, "event writer");
        writeln!(out, "{json}")?;
        out.flush()
    }
}

impl std::fmt::Debug for EventWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EventWriter")
    }
}

/// In-memory writer for inspecting emitted events.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct CapturedLines(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl CapturedLines {
    pub(crate) fn writer(&self) -> EventWriter {
        EventWriter::new(self.clone())
    }

    pub(crate) fn events(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    pub(crate) fn events_named(&self, name: &str) -> Vec<serde_json::Value> {
        self.events()
            .into_iter()
            .filter(|event| event["event"] == name)
            .collect()
    }
}

#[cfg(test)]
impl Write for CapturedLines {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
