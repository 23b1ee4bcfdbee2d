use crate::audio::{AudioCaptureSession, CpalInput};
use crate::client::BridgeClient;
use crate::config::AppConfig;
use crate::controller::{ControllerOptions, StreamController, TrayView};
use crate::devices::{CameraProvider, DeviceStreamManager, ScreenProvider, VideoSource};
use crate::error::ControlError;
use crate::media::{AUDIO_PCM_MIME, IMAGE_JPEG_MIME};
use crate::video::FrameSampler;
use crate::{log_debug, log_debug_content};
use anyhow::Result;
use crossbeam_channel::{after, bounded, never, select, Receiver, Sender};
use std::io::{self, BufRead};
use std::thread;
use std::time::Instant;

use super::protocol::{parse_command, EventWriter, IpcCommand, IpcEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flow {
    Continue,
    Quit,
}

/// Driver that owns the controller and is its only caller.
pub(super) struct Bridge {
    writer: EventWriter,
    controller: StreamController<BridgeClient>,
    capabilities: IpcEvent,
    last_tray: Option<TrayView>,
}

impl Bridge {
    pub(super) fn new(config: &AppConfig, writer: EventWriter) -> Self {
        let audio = AudioCaptureSession::new(
            Box::new(CpalInput::new(config.input_device.clone())),
            config.audio_capture_config(),
        );
        let video = config.video_source_config();
        let devices = DeviceStreamManager::new(
            Box::new(CameraProvider::new(video.camera_index)),
            Box::new(ScreenProvider::new(&video)),
        );
        let controller = StreamController::new(
            BridgeClient::new(writer.clone()),
            audio,
            devices,
            FrameSampler::new(config.sampler_config()),
            ControllerOptions {
                supports_video: config.supports_video(),
                start_muted: config.start_muted,
            },
        );
        Self::with_parts(writer, controller, capabilities_for(config))
    }

    pub(super) fn with_parts(
        writer: EventWriter,
        mut controller: StreamController<BridgeClient>,
        capabilities: IpcEvent,
    ) -> Self {
        let observer_writer = writer.clone();
        controller.set_stream_observer(move |binding| {
            let event = IpcEvent::StreamChanged {
                source: binding.map_or(VideoSource::None, |binding| binding.source),
                stream_id: binding.map(|binding| binding.id),
            };
            if let Err(err) = observer_writer.send(&event) {
                log_debug(&format!("failed to emit stream change: {err}"));
            }
        });
        Self {
            writer,
            controller,
            capabilities,
            last_tray: None,
        }
    }

    pub(super) fn run(&mut self, commands: &Receiver<IpcCommand>) -> Result<()> {
        self.emit(&self.capabilities);
        self.emit_tray_if_changed();

        loop {
            let audio = self.controller.audio_events();
            let tick = match self.controller.next_deadline() {
                Some(deadline) => after(deadline.saturating_duration_since(Instant::now())),
                None => never(),
            };
            select! {
                recv(commands) -> msg => match msg {
                    Ok(cmd) => {
                        if self.handle_command(cmd, Instant::now()) == Flow::Quit {
                            break;
                        }
                    }
                    Err(_) => {
                        log_debug("command channel closed, exiting");
                        break;
                    }
                },
                recv(audio) -> event => {
                    if let Ok(event) = event {
                        self.controller.forward_audio(event);
                    }
                }
                recv(tick) -> _ => {
                    self.controller.run_due_tick(Instant::now());
                }
            }
            self.emit_tray_if_changed();
        }

        self.controller.shutdown();
        self.emit_tray_if_changed();
        log_debug(&format!(
            "bridge exiting ({} chunks dropped)",
            self.controller.dropped_chunks()
        ));
        Ok(())
    }

    pub(super) fn handle_command(&mut self, cmd: IpcCommand, now: Instant) -> Flow {
        log_debug_content(&format!("command received: {cmd:?}"));
        let result = match cmd {
            IpcCommand::Connect => self.controller.connect(now),
            IpcCommand::Disconnect => self.controller.disconnect(now),
            IpcCommand::ToggleMute => self.controller.toggle_mute(),
            IpcCommand::SelectSource { source } => self.controller.select_source(source, now),
            IpcCommand::ConnectionLost => {
                self.controller.client_mut().connection_lost();
                self.controller.sync_connection(now)
            }
            IpcCommand::OutputVolume { volume } => {
                self.controller.client_mut().set_output_volume(volume);
                Ok(())
            }
            IpcCommand::GetCapabilities => {
                self.emit(&self.capabilities);
                Ok(())
            }
            IpcCommand::Quit => return Flow::Quit,
        };
        if let Err(err) = result {
            self.report(&err);
        }
        Flow::Continue
    }

    #[cfg(test)]
    pub(super) fn controller(&self) -> &StreamController<BridgeClient> {
        &self.controller
    }

    fn report(&self, err: &ControlError) {
        log_debug(&format!("command failed: {err}"));
        self.emit(&IpcEvent::Error {
            message: err.to_string(),
            recoverable: true,
        });
    }

    fn emit_tray_if_changed(&mut self) {
        let view = self.controller.view();
        if self.last_tray.as_ref() == Some(&view) {
            return;
        }
        self.emit(&IpcEvent::Tray(view.clone()));
        self.last_tray = Some(view);
    }

    fn emit(&self, event: &IpcEvent) {
        if let Err(err) = self.writer.send(event) {
            log_debug(&format!("failed to write event: {err}"));
        }
    }
}

pub(super) fn capabilities_for(config: &AppConfig) -> IpcEvent {
    let session_id = format!(
        "{:x}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
    );
    IpcEvent::Capabilities {
        session_id,
        version: env!("CARGO_PKG_VERSION").to_string(),
        input_device: config.input_device.clone(),
        supports_video: config.supports_video(),
        camera_compiled: cfg!(feature = "camera"),
        screen_tool: config.ffmpeg_cmd.clone(),
        audio_mime: AUDIO_PCM_MIME.to_string(),
        video_mime: IMAGE_JPEG_MIME.to_string(),
        audio_slice_ms: config.audio_slice_ms,
    }
}

// ============================================================================
// Stdin Reader Thread
// ============================================================================

fn spawn_stdin_reader(
    tx: Sender<IpcCommand>,
    writer: EventWriter,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("livetray-stdin".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(cmd) => {
                        if tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = writer.send(&IpcEvent::Error {
                            message: format!("Invalid command: {err}"),
                            recoverable: true,
                        });
                    }
                }
            }
            log_debug("stdin reader exiting");
        })
}

/// Run the bridge on stdin/stdout until `quit` or end of input.
pub fn run_bridge(config: &AppConfig) -> Result<()> {
    log_debug("starting JSON-lines bridge");
    let writer = EventWriter::stdout();
    let (cmd_tx, cmd_rx) = bounded(64);
    let _stdin = spawn_stdin_reader(cmd_tx, writer.clone())?;
    Bridge::new(config, writer).run(&cmd_rx)
}
