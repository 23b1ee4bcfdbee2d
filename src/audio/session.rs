use super::encode::{pcm16_le, Slicer};
use super::input::{AudioInput, InputFrames};
use super::meter::slice_rms;
use super::resample::SliceResampler;
use crate::config::AudioCaptureConfig;
use crate::error::{DeviceKind, DeviceUnavailable};
use crate::media::MediaChunk;
use crate::log_debug;
use crate::sync::{lock_or_recover, StopFlag};
use crossbeam_channel::{RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Which stream of events a listener wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioTopic {
    Data,
    Volume,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    /// One encoded slice, tagged `audio/pcm;rate=16000`.
    Chunk(MediaChunk),
    /// RMS of the same slice, in [0, 1].
    Volume(f32),
}

impl AudioEvent {
    fn topic(&self) -> AudioTopic {
        match self {
            AudioEvent::Chunk(_) => AudioTopic::Data,
            AudioEvent::Volume(_) => AudioTopic::Volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: Vec<(ListenerId, AudioTopic, Sender<AudioEvent>)>,
}

impl ListenerTable {
    fn insert(&mut self, topic: AudioTopic, sender: Sender<AudioEvent>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, topic, sender));
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Deliver to every listener of the event's topic; forget listeners whose receiver is gone.
    fn publish(&mut self, event: &AudioEvent) {
        let topic = event.topic();
        self.entries.retain(|(_, entry_topic, sender)| {
            if *entry_topic != topic {
                return true;
            }
            !matches!(
                sender.try_send(event.clone()),
                Err(TrySendError::Disconnected(_))
            )
        });
    }
}

struct SliceWorker {
    stop: StopFlag,
    handle: thread::JoinHandle<()>,
}

/// Owns the microphone while running and fans slices out to attached listeners.
///
/// `start` and `stop` are both idempotent. Listeners outlive start/stop cycles;
/// detaching one never stops capture.
pub struct AudioCaptureSession {
    input: Box<dyn AudioInput>,
    config: AudioCaptureConfig,
    listeners: Arc<Mutex<ListenerTable>>,
    slices: Arc<AtomicU64>,
    worker: Option<SliceWorker>,
}

impl AudioCaptureSession {
    pub fn new(input: Box<dyn AudioInput>, config: AudioCaptureConfig) -> Self {
        Self {
            input,
            config,
            listeners: Arc::new(Mutex::new(ListenerTable::default())),
            slices: Arc::new(AtomicU64::new(0)),
            worker: None,
        }
    }

    pub fn start(&mut self) -> Result<(), DeviceUnavailable> {
        if self.worker.is_some() {
            return Ok(());
        }
        let frames = self.input.open(self.config.slice_ms, self.config.channel_capacity)?;
        log_debug(&format!(
            "audio capture started: {} at {}Hz, {}ms slices",
            self.input.describe(),
            frames.sample_rate,
            self.config.slice_ms
        ));
        let stop = StopFlag::new();
        let ctx = WorkerContext {
            frames,
            slice_ms: self.config.slice_ms,
            stop: stop.clone(),
            listeners: self.listeners.clone(),
            slices: self.slices.clone(),
        };
        let handle = thread::Builder::new()
            .name("livetray-slicer".into())
            .spawn(move || run_slicer(ctx));
        match handle {
            Ok(handle) => {
                self.worker = Some(SliceWorker { stop, handle });
                Ok(())
            }
            Err(err) => {
                self.input.close();
                Err(DeviceUnavailable::failed(
                    DeviceKind::Microphone,
                    format!("failed to spawn slicing worker: {err}"),
                ))
            }
        }
    }

    /// Release the device. Returns false when the session was already stopped.
    pub fn stop(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return false;
        };
        worker.stop.raise();
        self.input.close();
        if worker.handle.join().is_err() {
            log_debug("audio slicing worker panicked");
        }
        log_debug(&format!(
            "audio capture stopped after {} slices ({} frames dropped)",
            self.slices.load(Ordering::Relaxed),
            self.input.dropped_frames()
        ));
        true
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn attach(&self, topic: AudioTopic, sender: Sender<AudioEvent>) -> ListenerId {
        lock_or_recover(&self.listeners, "audio listeners").insert(topic, sender)
    }

    pub fn detach(&self, id: ListenerId) -> bool {
        lock_or_recover(&self.listeners, "audio listeners").remove(id)
    }

    pub fn listener_count(&self) -> usize {
        lock_or_recover(&self.listeners, "audio listeners")
            .entries
            .len()
    }

    /// Slices published since the session was created.
    pub fn slices_emitted(&self) -> u64 {
        self.slices.load(Ordering::Relaxed)
    }
}

impl Drop for AudioCaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

struct WorkerContext {
    frames: InputFrames,
    slice_ms: u64,
    stop: StopFlag,
    listeners: Arc<Mutex<ListenerTable>>,
    slices: Arc<AtomicU64>,
}

fn run_slicer(ctx: WorkerContext) {
    let device_frame = ((u64::from(ctx.frames.sample_rate) * ctx.slice_ms) / 1000).max(1) as usize;
    let mut resampler = SliceResampler::for_device(ctx.frames.sample_rate, device_frame);
    let mut slicer = Slicer::new(ctx.slice_ms);
    let wait = Duration::from_millis(ctx.slice_ms.max(10) * 2);

    while !ctx.stop.is_raised() {
        let frame = match ctx.frames.frames.recv_timeout(wait) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let converted = resampler.process(&frame);
        for slice in slicer.push(&converted) {
            if ctx.stop.is_raised() {
                return;
            }
            let volume = slice_rms(&slice);
            let chunk = MediaChunk::audio_pcm(&pcm16_le(&slice));
            let mut listeners = lock_or_recover(&ctx.listeners, "audio listeners");
            listeners.publish(&AudioEvent::Chunk(chunk));
            listeners.publish(&AudioEvent::Volume(volume));
            drop(listeners);
            ctx.slices.fetch_add(1, Ordering::Relaxed);
        }
    }
}
