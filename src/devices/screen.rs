//! Screen-share source backed by an ffmpeg grabber writing an MJPEG pipe.

use super::stream::{FrameSlot, StreamHandle, StreamProvider, ThreadedStream};
use crate::config::VideoSourceConfig;
use crate::error::{DeviceKind, DeviceUnavailable, UnavailableReason};
use crate::sync::{lock_or_recover, StopFlag};
use crate::log_debug;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use image::ImageFormat;
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Grab rate requested from ffmpeg. The sampler only needs the current frame
/// every two seconds, so a low rate keeps the decode cost down.
const GRAB_FPS: &str = "2";
const READ_BUF_BYTES: usize = 128 * 1024;

pub struct ScreenProvider {
    ffmpeg_cmd: String,
    start_timeout: Duration,
}

impl ScreenProvider {
    pub fn new(config: &VideoSourceConfig) -> Self {
        Self {
            ffmpeg_cmd: config.ffmpeg_cmd.clone(),
            start_timeout: Duration::from_millis(config.screen_start_timeout_ms),
        }
    }
}

impl StreamProvider for ScreenProvider {
    fn acquire(&mut self) -> Result<Box<dyn StreamHandle>, DeviceUnavailable> {
        let mut cmd = Command::new(&self.ffmpeg_cmd);
        cmd.args(["-hide_banner", "-loglevel", "error"]);
        grabber_input_args(&mut cmd)?;
        cmd.args([
            "-f", "image2pipe", "-vcodec", "mjpeg", "-q:v", "3", "-r", GRAB_FPS, "pipe:1",
        ]);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|err| spawn_error(&self.ffmpeg_cmd, &err))?;
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DeviceUnavailable::failed(
                DeviceKind::ScreenShare,
                "ffmpeg stdout was not captured",
            ));
        };
        let last_error = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            if let Err(err) = spawn_stderr_tail(stderr, last_error.clone()) {
                log_debug(&format!(
                    "failed to spawn ffmpeg stderr reader, failures will be unclassified: {err}"
                ));
            }
        }

        let child = Arc::new(Mutex::new(child));
        let frames = FrameSlot::new();
        let stop = StopFlag::new();
        let live = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = bounded::<bool>(1);

        let reader = {
            let frames = frames.clone();
            let stop = stop.clone();
            let live = live.clone();
            thread::Builder::new()
                .name("livetray-screen".into())
                .spawn(move || read_mjpeg(stdout, &frames, &stop, &live, ready_tx))
        };
        let reader = match reader {
            Ok(reader) => reader,
            Err(err) => {
                kill_child(&child);
                return Err(DeviceUnavailable::failed(DeviceKind::ScreenShare, err));
            }
        };

        let started = match ready_rx.recv_timeout(self.start_timeout) {
            Ok(true) => Ok(()),
            Ok(false) | Err(RecvTimeoutError::Disconnected) => {
                kill_child(&child);
                let detail = lock_or_recover(&last_error, "ffmpeg stderr").clone();
                Err(classify_grabber_failure(&detail))
            }
            Err(RecvTimeoutError::Timeout) => {
                kill_child(&child);
                Err(DeviceUnavailable::new(
                    DeviceKind::ScreenShare,
                    UnavailableReason::Timeout,
                ))
            }
        };
        if let Err(err) = started {
            let _ = reader.join();
            return Err(err);
        }

        log_debug("screen share started");
        let stream = ThreadedStream::new("screen share", frames, stop, live, reader)
            .with_stop_hook(move || kill_child(&child));
        Ok(Box::new(stream))
    }
}

/// Keep the last line ffmpeg writes to stderr for failure classification.
fn spawn_stderr_tail<R: Read + Send + 'static>(
    stderr: R,
    last_error: Arc<Mutex<String>>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("livetray-ffmpeg-stderr".into())
        .spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                log_debug(&format!("ffmpeg: {line}"));
                *lock_or_recover(&last_error, "ffmpeg stderr") = line;
            }
        })
}

fn kill_child(child: &Arc<Mutex<Child>>) {
    let mut child = lock_or_recover(child, "ffmpeg child");
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_error(cmd: &str, err: &io::Error) -> DeviceUnavailable {
    let reason = match err.kind() {
        io::ErrorKind::NotFound => UnavailableReason::Unsupported(format!("'{cmd}' not found")),
        io::ErrorKind::PermissionDenied => UnavailableReason::PermissionDenied,
        _ => UnavailableReason::Failed(format!("failed to start '{cmd}': {err}")),
    };
    DeviceUnavailable::new(DeviceKind::ScreenShare, reason)
}

/// Turn the grabber's last stderr line into a reason for the UI.
pub(crate) fn classify_grabber_failure(detail: &str) -> DeviceUnavailable {
    let lower = detail.to_ascii_lowercase();
    let reason = if lower.contains("permission") || lower.contains("not authorized") {
        UnavailableReason::PermissionDenied
    } else if lower.contains("cannot open display") || lower.contains("no such") {
        UnavailableReason::NoDevice
    } else if detail.trim().is_empty() {
        UnavailableReason::Cancelled
    } else {
        UnavailableReason::Failed(detail.trim().to_string())
    };
    DeviceUnavailable::new(DeviceKind::ScreenShare, reason)
}

#[cfg(target_os = "linux")]
fn grabber_input_args(cmd: &mut Command) -> Result<(), DeviceUnavailable> {
    let display = std::env::var("DISPLAY").map_err(|_| {
        DeviceUnavailable::new(DeviceKind::ScreenShare, UnavailableReason::NoDevice)
    })?;
    cmd.args(["-f", "x11grab", "-framerate", GRAB_FPS, "-i"]).arg(display);
    Ok(())
}

#[cfg(target_os = "macos")]
fn grabber_input_args(cmd: &mut Command) -> Result<(), DeviceUnavailable> {
    cmd.args([
        "-f",
        "avfoundation",
        "-framerate",
        "10",
        "-capture_cursor",
        "1",
        "-i",
        "Capture screen 0:",
    ]);
    Ok(())
}

#[cfg(target_os = "windows")]
fn grabber_input_args(cmd: &mut Command) -> Result<(), DeviceUnavailable> {
    cmd.args(["-f", "gdigrab", "-framerate", GRAB_FPS, "-i", "desktop"]);
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn grabber_input_args(_cmd: &mut Command) -> Result<(), DeviceUnavailable> {
    Err(DeviceUnavailable::new(
        DeviceKind::ScreenShare,
        UnavailableReason::Unsupported("no screen grabber for this platform".to_string()),
    ))
}

/// Pump JPEG frames from the pipe into the slot. Signals `ready` with true on
/// the first decoded frame, or false if the pipe closes before that.
fn read_mjpeg(
    mut stdout: ChildStdout,
    frames: &FrameSlot,
    stop: &StopFlag,
    live: &AtomicBool,
    ready: Sender<bool>,
) {
    let mut ready = Some(ready);
    let mut buf = vec![0u8; READ_BUF_BYTES];
    let mut pending = Vec::with_capacity(READ_BUF_BYTES);

    while !stop.is_raised() {
        let n = match stdout.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                if !stop.is_raised() {
                    log_debug(&format!("screen pipe read error: {err}"));
                }
                break;
            }
        };
        pending.extend_from_slice(&buf[..n]);
        while let Some(jpeg) = take_jpeg_frame(&mut pending) {
            match image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg) {
                Ok(decoded) => {
                    frames.publish(decoded.to_rgb8());
                    if let Some(ready) = ready.take() {
                        live.store(true, Ordering::Release);
                        let _ = ready.send(true);
                    }
                }
                Err(err) => log_debug(&format!("screen frame decode error: {err}")),
            }
        }
    }
    live.store(false, Ordering::Release);
    if let Some(ready) = ready.take() {
        let _ = ready.send(false);
    }
}

/// Split one complete JPEG (SOI `FF D8` .. EOI `FF D9`) off the front of `buf`.
/// Bytes before the SOI marker are discarded.
pub(crate) fn take_jpeg_frame(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let start = buf.windows(2).position(|w| w == [0xFF, 0xD8])?;
    if start > 0 {
        buf.drain(..start);
    }
    let end = buf[2..].windows(2).position(|w| w == [0xFF, 0xD9])? + 4;
    Some(buf.drain(..end).collect())
}
