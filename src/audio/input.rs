//! Microphone access via CPAL.
//!
//! The cpal stream lives on its own thread for its whole life so the rest of
//! the session never has to care whether the platform stream type is `Send`.

use super::dispatch::FramePump;
use crate::error::{DeviceKind, DeviceUnavailable, UnavailableReason};
use crate::{log_debug, log_debug_content};
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BuildStreamError, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Mono frames at the device's native rate.
pub struct InputFrames {
    pub frames: Receiver<Vec<f32>>,
    pub sample_rate: u32,
}

/// Something that can deliver mono microphone frames until closed.
pub trait AudioInput: Send {
    /// Acquire the device and start delivering frames of roughly `frame_ms`.
    fn open(&mut self, frame_ms: u64, capacity: usize) -> Result<InputFrames, DeviceUnavailable>;

    /// Release the device. Closing a closed input does nothing.
    fn close(&mut self);

    /// Frames the callback could not hand off because the worker fell behind.
    fn dropped_frames(&self) -> usize {
        0
    }

    fn describe(&self) -> String;
}

/// List microphone names so the CLI can expose a selector.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("no input devices available")?;
    Ok(devices.filter_map(|device| device.name().ok()).collect())
}

struct StreamThread {
    stop_tx: Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// Default host microphone, optionally pinned to a device name.
pub struct CpalInput {
    preferred: Option<String>,
    running: Option<StreamThread>,
    dropped: Arc<AtomicUsize>,
}

impl CpalInput {
    pub fn new(preferred: Option<String>) -> Self {
        Self {
            preferred,
            running: None,
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl AudioInput for CpalInput {
    fn open(&mut self, frame_ms: u64, capacity: usize) -> Result<InputFrames, DeviceUnavailable> {
        self.close();
        let (frame_tx, frame_rx) = bounded::<Vec<f32>>(capacity.max(1));
        let (ready_tx, ready_rx) = bounded::<Result<u32, DeviceUnavailable>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let preferred = self.preferred.clone();
        let dropped = self.dropped.clone();

        let handle = thread::Builder::new()
            .name("livetray-mic".into())
            .spawn(move || {
                match build_stream(preferred.as_deref(), frame_ms, frame_tx, dropped) {
                    Ok((stream, rate)) => {
                        let _ = ready_tx.send(Ok(rate));
                        // Park until close() signals or drops the sender.
                        let _ = stop_rx.recv();
                        if let Err(err) = stream.pause() {
                            log_debug(&format!("failed to pause audio stream: {err}"));
                        }
                        drop(stream);
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                    }
                }
            })
            .map_err(|err| DeviceUnavailable::failed(DeviceKind::Microphone, err))?;

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(err)) => {
                let _ = handle.join();
                return Err(err);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(DeviceUnavailable::failed(
                    DeviceKind::Microphone,
                    "audio thread exited during setup",
                ));
            }
        };
        self.running = Some(StreamThread { stop_tx, handle });
        Ok(InputFrames {
            frames: frame_rx,
            sample_rate,
        })
    }

    fn close(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.stop_tx.send(());
            if running.handle.join().is_err() {
                log_debug("audio stream thread panicked during close");
            }
        }
    }

    fn dropped_frames(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    fn describe(&self) -> String {
        self.preferred
            .clone()
            .unwrap_or_else(|| "default input device".to_string())
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.close();
    }
}

fn select_device(preferred: Option<&str>) -> Result<cpal::Device, DeviceUnavailable> {
    let host = cpal::default_host();
    let no_device = || DeviceUnavailable::new(DeviceKind::Microphone, UnavailableReason::NoDevice);
    match preferred {
        Some(name) => {
            let mut devices = host.input_devices().map_err(|err| {
                DeviceUnavailable::failed(DeviceKind::Microphone, err)
            })?;
            devices
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(no_device)
        }
        None => host.default_input_device().ok_or_else(no_device),
    }
}

fn build_stream(
    preferred: Option<&str>,
    frame_ms: u64,
    sender: Sender<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
) -> Result<(cpal::Stream, u32), DeviceUnavailable> {
    let device = select_device(preferred)?;
    let default_config = device
        .default_input_config()
        .map_err(|err| DeviceUnavailable::failed(DeviceKind::Microphone, err))?;
    let format = default_config.sample_format();
    let config: StreamConfig = default_config.into();
    let sample_rate = config.sample_rate.0;
    let channels = usize::from(config.channels.max(1));
    let frame_samples = ((u64::from(sample_rate) * frame_ms) / 1000).max(1) as usize;
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    log_debug(&format!(
        "mic config: format={format:?} sample_rate={sample_rate}Hz channels={channels}"
    ));
    log_debug_content(&format!("mic device: {device_name}"));

    let pump = FramePump::new(frame_samples, sender, dropped);
    let stream = match format {
        SampleFormat::F32 => input_stream::<f32>(&device, &config, pump, channels, |s| s),
        SampleFormat::I16 => {
            input_stream::<i16>(&device, &config, pump, channels, |s| s as f32 / 32_768.0)
        }
        SampleFormat::U16 => input_stream::<u16>(&device, &config, pump, channels, |s| {
            (s as f32 - 32_768.0) / 32_768.0
        }),
        other => {
            return Err(DeviceUnavailable::new(
                DeviceKind::Microphone,
                UnavailableReason::Unsupported(format!("sample format {other:?}")),
            ))
        }
    }
    .map_err(|err| match err {
        BuildStreamError::DeviceNotAvailable => {
            DeviceUnavailable::new(DeviceKind::Microphone, UnavailableReason::NoDevice)
        }
        other => DeviceUnavailable::failed(
            DeviceKind::Microphone,
            format!("{other}. {}", mic_permission_hint()),
        ),
    })?;

    stream
        .play()
        .map_err(|err| DeviceUnavailable::failed(DeviceKind::Microphone, err))?;
    Ok((stream, sample_rate))
}

fn input_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut pump: FramePump,
    channels: usize,
    convert: fn(T) -> f32,
) -> Result<cpal::Stream, BuildStreamError>
where
    T: SizedSample + Send + 'static,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            pump.push_interleaved(data, channels, convert);
        },
        |err| log_debug(&format!("audio_stream_error: {err}")),
        None,
    )
}

pub(super) fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}
