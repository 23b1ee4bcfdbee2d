//! Scripted stand-ins for the microphone and the video providers.

use crate::audio::{samples_per_slice, AudioInput, InputFrames, TARGET_RATE};
use crate::devices::{FrameSlot, StreamHandle, StreamProvider};
use crate::error::{DeviceKind, DeviceUnavailable, UnavailableReason};
use crossbeam_channel::{bounded, Sender};
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Ordered record of start/stop events across fakes.
pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

pub(crate) fn journal_entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

pub(crate) fn solid_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([10, 120, 200]))
}

#[derive(Default)]
pub(crate) struct MicState {
    pub(crate) opens: usize,
    pub(crate) closes: usize,
    pub(crate) feed: Option<Sender<Vec<f32>>>,
    pub(crate) refuse: Option<UnavailableReason>,
}

/// Microphone at 16 kHz whose frames are pushed by the test.
#[derive(Clone, Default)]
pub(crate) struct ScriptedMic(pub(crate) Arc<Mutex<MicState>>);

impl ScriptedMic {
    /// Push one slice worth of constant samples for a session using `slice_ms`.
    pub(crate) fn feed_slice(&self, slice_ms: u64, level: f32) {
        let state = self.0.lock().unwrap();
        state
            .feed
            .as_ref()
            .expect("mic is open")
            .send(vec![level; samples_per_slice(slice_ms)])
            .expect("slicer alive");
    }

    pub(crate) fn counts(&self) -> (usize, usize) {
        let state = self.0.lock().unwrap();
        (state.opens, state.closes)
    }

    pub(crate) fn refuse_next(&self, reason: UnavailableReason) {
        self.0.lock().unwrap().refuse = Some(reason);
    }
}

impl AudioInput for ScriptedMic {
    fn open(&mut self, _frame_ms: u64, capacity: usize) -> Result<InputFrames, DeviceUnavailable> {
        let mut state = self.0.lock().unwrap();
        if let Some(reason) = state.refuse.take() {
            return Err(DeviceUnavailable::new(DeviceKind::Microphone, reason));
        }
        assert!(state.feed.is_none(), "microphone opened twice without a close");
        let (tx, rx) = bounded(capacity);
        state.opens += 1;
        state.feed = Some(tx);
        Ok(InputFrames {
            frames: rx,
            sample_rate: TARGET_RATE,
        })
    }

    fn close(&mut self) {
        let mut state = self.0.lock().unwrap();
        if state.feed.take().is_some() {
            state.closes += 1;
        }
    }

    fn describe(&self) -> String {
        "scripted mic".into()
    }
}

pub(crate) struct FakeHandle {
    name: &'static str,
    journal: Journal,
    frames: FrameSlot,
    ended: Arc<AtomicBool>,
    stopped: bool,
}

impl StreamHandle for FakeHandle {
    fn frames(&self) -> FrameSlot {
        self.frames.clone()
    }

    fn is_live(&self) -> bool {
        !self.stopped && !self.ended.load(Ordering::Relaxed)
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.journal
                .lock()
                .unwrap()
                .push(format!("stop {}", self.name));
        }
    }
}

/// Provider that logs `start <name>` / `stop <name>` / `refuse <name>` to a
/// shared journal and exposes the frame slot of its latest stream.
#[derive(Clone)]
pub(crate) struct FakeSource {
    name: &'static str,
    kind: DeviceKind,
    journal: Journal,
    slot: Arc<Mutex<Option<FrameSlot>>>,
    ended: Arc<Mutex<Option<Arc<AtomicBool>>>>,
    refuse: Arc<Mutex<Option<UnavailableReason>>>,
}

impl FakeSource {
    pub(crate) fn camera(journal: &Journal) -> Self {
        Self::new("camera", DeviceKind::Camera, journal)
    }

    pub(crate) fn screen(journal: &Journal) -> Self {
        Self::new("screen", DeviceKind::ScreenShare, journal)
    }

    fn new(name: &'static str, kind: DeviceKind, journal: &Journal) -> Self {
        Self {
            name,
            kind,
            journal: journal.clone(),
            slot: Arc::default(),
            ended: Arc::default(),
            refuse: Arc::default(),
        }
    }

    /// Make the latest stream die on its own, as when the capture tool exits.
    pub(crate) fn end_stream(&self) {
        if let Some(ended) = self.ended.lock().unwrap().as_ref() {
            ended.store(true, Ordering::Relaxed);
        }
    }

    pub(crate) fn refuse_next(&self, reason: UnavailableReason) {
        *self.refuse.lock().unwrap() = Some(reason);
    }

    /// Publish a frame on the most recently acquired stream.
    pub(crate) fn show(&self, frame: RgbImage) {
        self.slot
            .lock()
            .unwrap()
            .as_ref()
            .expect("source acquired")
            .publish(frame);
    }
}

impl StreamProvider for FakeSource {
    fn acquire(&mut self) -> Result<Box<dyn StreamHandle>, DeviceUnavailable> {
        if let Some(reason) = self.refuse.lock().unwrap().take() {
            self.journal
                .lock()
                .unwrap()
                .push(format!("refuse {}", self.name));
            return Err(DeviceUnavailable::new(self.kind, reason));
        }
        self.journal
            .lock()
            .unwrap()
            .push(format!("start {}", self.name));
        let frames = FrameSlot::new();
        *self.slot.lock().unwrap() = Some(frames.clone());
        let ended = Arc::new(AtomicBool::new(false));
        *self.ended.lock().unwrap() = Some(ended.clone());
        Ok(Box::new(FakeHandle {
            name: self.name,
            journal: self.journal.clone(),
            frames,
            ended,
            stopped: false,
        }))
    }
}
