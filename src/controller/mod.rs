//! Root of the media pipeline.
//!
//! The controller owns mute state, watches the client's connection flag and
//! keeps two independent gates in step with them:
//!
//! - audio runs while connected and unmuted
//! - video ticks are scheduled while connected with a source selected
//!
//! Each gate is a reconciliation step over its inputs: when the inputs change,
//! the old arrangement is torn down completely before a new one is built.
//! A single driver loop owns the controller; nothing here is shared.

mod view;

pub use view::{volume_px, TrayState, TrayView, MAX_VOLUME_PX, MIN_VOLUME_PX};

use crate::audio::{AudioCaptureSession, AudioEvent, AudioTopic, ListenerId};
use crate::client::LiveClient;
use crate::devices::{DeviceStreamManager, StreamBinding, VideoSource};
use crate::error::{ControlError, DeviceUnavailable};
use crate::log_debug;
use crate::media::MediaChunk;
use crate::video::{FrameSampler, SampleOutcome, TickSchedule, TickTrigger};
use crossbeam_channel::{never, unbounded, Receiver};
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerOptions {
    pub supports_video: bool,
    pub start_muted: bool,
}

/// Called with the new binding (or `None`) whenever the active stream changes.
pub type StreamObserver = Box<dyn FnMut(Option<&StreamBinding>)>;

struct AudioLink {
    events: Receiver<AudioEvent>,
    data: ListenerId,
    volume: ListenerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AudioInputs {
    connected: bool,
    muted: bool,
    sink_epoch: u64,
}

impl AudioInputs {
    fn wants_audio(self) -> bool {
        self.connected && !self.muted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct VideoInputs {
    connected: bool,
    stream_id: Option<u64>,
}

impl VideoInputs {
    fn wants_video(self) -> bool {
        self.connected && self.stream_id.is_some()
    }
}

pub struct StreamController<C: LiveClient> {
    client: C,
    audio: AudioCaptureSession,
    devices: DeviceStreamManager,
    sampler: FrameSampler,
    schedule: TickSchedule,
    muted: bool,
    connected: bool,
    sink_epoch: u64,
    supports_video: bool,
    audio_link: Option<AudioLink>,
    audio_inputs: Option<AudioInputs>,
    video_inputs: VideoInputs,
    in_volume: f32,
    dropped_chunks: u64,
    observer: Option<StreamObserver>,
}

impl<C: LiveClient> StreamController<C> {
    pub fn new(
        client: C,
        audio: AudioCaptureSession,
        devices: DeviceStreamManager,
        sampler: FrameSampler,
        options: ControllerOptions,
    ) -> Self {
        let connected = client.is_connected();
        let mut controller = Self {
            client,
            audio,
            devices,
            sampler,
            schedule: TickSchedule::new(),
            muted: options.start_muted,
            connected,
            sink_epoch: 0,
            supports_video: options.supports_video,
            audio_link: None,
            audio_inputs: None,
            video_inputs: VideoInputs::default(),
            in_volume: 0.0,
            dropped_chunks: 0,
            observer: None,
        };
        if let Err(err) = controller.reconcile_audio() {
            log_debug(&format!("initial audio start failed: {err}"));
        }
        controller.reconcile_video(Instant::now());
        controller
    }

    pub fn set_stream_observer(&mut self, observer: impl FnMut(Option<&StreamBinding>) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub fn connect(&mut self, now: Instant) -> Result<(), ControlError> {
        self.client
            .connect()
            .map_err(|err| ControlError::Client(err.to_string()))?;
        self.sync_connection(now)
    }

    /// Stops audio and sampling; the selected video source stays selected.
    pub fn disconnect(&mut self, now: Instant) -> Result<(), ControlError> {
        self.client.disconnect();
        self.sync_connection(now)
    }

    /// Flip the mute flag. Allowed in every state.
    pub fn toggle_mute(&mut self) -> Result<(), ControlError> {
        self.muted = !self.muted;
        log_debug(if self.muted { "muted" } else { "unmuted" });
        self.reconcile_audio()?;
        Ok(())
    }

    pub fn select_source(&mut self, source: VideoSource, now: Instant) -> Result<(), ControlError> {
        if source != VideoSource::None && !self.supports_video {
            return Err(ControlError::VideoDisabled);
        }
        let before = self.stream_id();
        let result = self.devices.select(source);
        if self.stream_id() != before {
            self.notify_stream_change();
        }
        self.reconcile_video(now);
        result.map_err(ControlError::from)
    }

    /// Re-read the client's connection flag and reconcile both gates. Call
    /// after anything changed the client behind the controller's back.
    pub fn sync_connection(&mut self, now: Instant) -> Result<(), ControlError> {
        let connected = self.client.is_connected();
        if connected != self.connected {
            log_debug(&format!("connection observed: {connected}"));
            tracing::info!(connected, "connection changed");
            self.connected = connected;
        }
        self.reconcile_video(now);
        self.reconcile_audio()?;
        Ok(())
    }

    /// Swap the outbound sink. Audio is re-established against the new one.
    pub fn rebind_client(&mut self, client: C, now: Instant) -> Result<(), ControlError> {
        self.client = client;
        self.sink_epoch += 1;
        log_debug(&format!("client rebound (epoch {})", self.sink_epoch));
        self.sync_connection(now)
    }

    /// Release everything: pending tick, audio capture and the video source.
    pub fn shutdown(&mut self) {
        self.schedule.revoke();
        self.teardown_audio();
        self.audio_inputs = None;
        if self.devices.stop() {
            self.notify_stream_change();
        }
        self.video_inputs = VideoInputs {
            connected: self.connected,
            stream_id: None,
        };
        log_debug("controller shut down");
    }

    // ------------------------------------------------------------------
    // Driver hooks
    // ------------------------------------------------------------------

    /// Receiver for the current audio subscription, or one that never fires.
    pub fn audio_events(&self) -> Receiver<AudioEvent> {
        match &self.audio_link {
            Some(link) => link.events.clone(),
            None => never(),
        }
    }

    pub fn forward_audio(&mut self, event: AudioEvent) {
        if self.audio_link.is_none() {
            return;
        }
        match event {
            AudioEvent::Chunk(chunk) => self.forward(chunk),
            AudioEvent::Volume(volume) => self.in_volume = volume,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.schedule.deadline()
    }

    /// Run the pending sampler tick if it is due. Returns what the tick did,
    /// or `None` when nothing was due.
    pub fn run_due_tick(&mut self, now: Instant) -> Option<SampleOutcome> {
        let trigger = self.schedule.take_due(now)?;
        let binding = match self.devices.binding() {
            Some(binding) if self.connected => binding,
            _ => return None,
        };
        let outcome = self.sampler.tick(&binding);
        match &outcome {
            SampleOutcome::Frame(chunk) => self.forward(chunk.clone()),
            SampleOutcome::Skipped => {
                tracing::trace!(stream_id = binding.id, ?trigger, "tick skipped: empty frame");
            }
            SampleOutcome::EncodeFailed(err) => {
                log_debug(&format!("frame encode failed: {err}"));
            }
        }
        if self.video_inputs.wants_video() {
            self.schedule.arm(TickTrigger::Cadence, now);
        }
        Some(outcome)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn view(&self) -> TrayView {
        TrayView {
            connected: self.connected,
            muted: self.muted,
            state: TrayState::from_flags(self.connected, self.muted),
            video_source: self.devices.current(),
            camera_streaming: self.devices.is_streaming(VideoSource::Camera),
            screen_streaming: self.devices.is_streaming(VideoSource::ScreenShare),
            supports_video: self.supports_video,
            media_controls_enabled: self.connected,
            connect_focused: !self.connected,
            in_volume_px: volume_px(self.in_volume),
            output_volume: self.client.output_volume(),
            dropped_chunks: self.dropped_chunks,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[cfg(test)]
    pub(crate) fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn audio_running(&self) -> bool {
        self.audio.is_running()
    }

    pub fn video_source(&self) -> VideoSource {
        self.devices.current()
    }

    pub fn supports_video(&self) -> bool {
        self.supports_video
    }

    pub fn dropped_chunks(&self) -> u64 {
        self.dropped_chunks
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Mutable access for host notifications. Follow with `sync_connection`.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    fn reconcile_audio(&mut self) -> Result<(), DeviceUnavailable> {
        let inputs = AudioInputs {
            connected: self.connected,
            muted: self.muted,
            sink_epoch: self.sink_epoch,
        };
        if self.audio_inputs == Some(inputs) {
            return Ok(());
        }
        self.audio_inputs = Some(inputs);
        self.teardown_audio();
        if !inputs.wants_audio() {
            return Ok(());
        }

        let (tx, rx) = unbounded();
        let data = self.audio.attach(AudioTopic::Data, tx.clone());
        let volume = self.audio.attach(AudioTopic::Volume, tx);
        if let Err(err) = self.audio.start() {
            self.audio.detach(data);
            self.audio.detach(volume);
            log_debug(&format!("audio start failed: {err}"));
            return Err(err);
        }
        self.audio_link = Some(AudioLink {
            events: rx,
            data,
            volume,
        });
        tracing::debug!(sink_epoch = inputs.sink_epoch, "audio link established");
        Ok(())
    }

    fn teardown_audio(&mut self) {
        if let Some(link) = self.audio_link.take() {
            self.audio.detach(link.data);
            self.audio.detach(link.volume);
            tracing::debug!("audio link torn down");
        }
        self.audio.stop();
        self.in_volume = 0.0;
    }

    fn reconcile_video(&mut self, now: Instant) {
        let inputs = VideoInputs {
            connected: self.connected,
            stream_id: self.stream_id(),
        };
        if inputs == self.video_inputs {
            return;
        }
        self.video_inputs = inputs;
        if self.schedule.revoke() {
            tracing::debug!("pending tick revoked");
        }
        if inputs.wants_video() {
            self.schedule.arm(TickTrigger::NextPaint, now);
        }
    }

    fn stream_id(&self) -> Option<u64> {
        self.devices.binding().map(|binding| binding.id)
    }

    fn notify_stream_change(&mut self) {
        let binding = self.devices.binding();
        if let Some(observer) = self.observer.as_mut() {
            observer(binding.as_ref());
        }
    }

    fn forward(&mut self, chunk: MediaChunk) {
        let kind = if chunk.is_video() { "video" } else { "audio" };
        match self.client.send_realtime_input(std::slice::from_ref(&chunk)) {
            Ok(()) => tracing::trace!(kind, bytes = chunk.data.len(), "chunk forwarded"),
            Err(err) => {
                self.dropped_chunks += 1;
                tracing::debug!(kind, dropped = self.dropped_chunks, %err, "chunk dropped");
            }
        }
    }
}
