//! Secondary video sources: at most one of camera or screen share is live.

mod camera;
mod screen;
mod stream;

use crate::error::DeviceUnavailable;
use crate::log_debug;
use serde::{Deserialize, Serialize};

pub use camera::CameraProvider;
pub use screen::ScreenProvider;
pub use stream::{FrameSlot, StreamHandle, StreamProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSource {
    #[default]
    None,
    Camera,
    ScreenShare,
}

impl VideoSource {
    pub fn label(self) -> &'static str {
        match self {
            VideoSource::None => "none",
            VideoSource::Camera => "camera",
            VideoSource::ScreenShare => "screen share",
        }
    }
}

/// What observers and the sampler see of the active stream. `id` grows with
/// every acquisition, so two successive camera streams compare unequal.
#[derive(Debug, Clone)]
pub struct StreamBinding {
    pub id: u64,
    pub source: VideoSource,
    pub frames: FrameSlot,
}

struct ActiveStream {
    binding: StreamBinding,
    handle: Box<dyn StreamHandle>,
}

enum Slot {
    Empty,
    Live(ActiveStream),
}

/// Single-slot register over the camera and screen providers.
pub struct DeviceStreamManager {
    camera: Box<dyn StreamProvider>,
    screen: Box<dyn StreamProvider>,
    slot: Slot,
    next_id: u64,
}

impl DeviceStreamManager {
    pub fn new(camera: Box<dyn StreamProvider>, screen: Box<dyn StreamProvider>) -> Self {
        Self {
            camera,
            screen,
            slot: Slot::Empty,
            next_id: 0,
        }
    }

    /// Make `source` the active stream.
    ///
    /// The current stream is released before the new one is requested. If the
    /// request fails the previous source is re-acquired (under a fresh id) and
    /// the error is returned; nothing partial is kept. Re-selecting a source
    /// whose capture has ended restarts it.
    pub fn select(&mut self, source: VideoSource) -> Result<(), DeviceUnavailable> {
        let previous = self.current();
        if previous == source && (source == VideoSource::None || self.is_streaming(source)) {
            return Ok(());
        }
        // Only a live stream is restored on failure.
        let previous = if self.is_streaming(previous) {
            previous
        } else {
            VideoSource::None
        };
        self.stop();
        if source == VideoSource::None {
            return Ok(());
        }
        match self.acquire(source) {
            Ok(()) => Ok(()),
            Err(err) => {
                log_debug(&format!("{} selection failed: {err}", source.label()));
                if previous != VideoSource::None {
                    if let Err(restore_err) = self.acquire(previous) {
                        log_debug(&format!(
                            "could not restore {}: {restore_err}",
                            previous.label()
                        ));
                    }
                }
                Err(err)
            }
        }
    }

    /// Release the active stream, if any. Returns whether one was stopped.
    pub fn stop(&mut self) -> bool {
        match std::mem::replace(&mut self.slot, Slot::Empty) {
            Slot::Empty => false,
            Slot::Live(mut active) => {
                active.handle.stop();
                log_debug(&format!(
                    "{} stream {} released",
                    active.binding.source.label(),
                    active.binding.id
                ));
                true
            }
        }
    }

    pub fn current(&self) -> VideoSource {
        match &self.slot {
            Slot::Empty => VideoSource::None,
            Slot::Live(active) => active.binding.source,
        }
    }

    pub fn binding(&self) -> Option<StreamBinding> {
        match &self.slot {
            Slot::Empty => None,
            Slot::Live(active) => Some(active.binding.clone()),
        }
    }

    /// Whether `source` is selected and its capture is still producing.
    pub fn is_streaming(&self, source: VideoSource) -> bool {
        match &self.slot {
            Slot::Live(active) => active.binding.source == source && active.handle.is_live(),
            Slot::Empty => false,
        }
    }

    fn acquire(&mut self, source: VideoSource) -> Result<(), DeviceUnavailable> {
        let provider = match source {
            VideoSource::Camera => &mut self.camera,
            VideoSource::ScreenShare => &mut self.screen,
            VideoSource::None => return Ok(()),
        };
        let handle = provider.acquire()?;
        self.next_id += 1;
        let binding = StreamBinding {
            id: self.next_id,
            source,
            frames: handle.frames(),
        };
        log_debug(&format!("{} stream {} active", source.label(), binding.id));
        self.slot = Slot::Live(ActiveStream { binding, handle });
        Ok(())
    }
}

impl Drop for DeviceStreamManager {
    fn drop(&mut self) {
        self.stop();
    }
}
