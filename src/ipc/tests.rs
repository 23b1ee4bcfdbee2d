use super::protocol::{parse_command, CapturedLines, IpcCommand, IpcEvent};
use super::session::{capabilities_for, Bridge, Flow};
use crate::audio::AudioCaptureSession;
use crate::client::BridgeClient;
use crate::config::{AppConfig, AudioCaptureConfig, SamplerConfig};
use crate::controller::{ControllerOptions, StreamController};
use crate::devices::{DeviceStreamManager, VideoSource};
use crate::media::MediaChunk;
use crate::test_support::{solid_frame, FakeSource, Journal, ScriptedMic};
use crate::video::FrameSampler;
use clap::Parser;
use crossbeam_channel::unbounded;
use std::thread;
use std::time::{Duration, Instant};

struct Harness {
    bridge: Bridge,
    lines: CapturedLines,
    mic: ScriptedMic,
    camera: FakeSource,
}

fn harness(supports_video: bool) -> Harness {
    let journal = Journal::default();
    let mic = ScriptedMic::default();
    let camera = FakeSource::camera(&journal);
    let screen = FakeSource::screen(&journal);
    let lines = CapturedLines::default();
    let controller = StreamController::new(
        BridgeClient::new(lines.writer()),
        AudioCaptureSession::new(
            Box::new(mic.clone()),
            AudioCaptureConfig {
                slice_ms: 50,
                channel_capacity: 8,
            },
        ),
        DeviceStreamManager::new(Box::new(camera.clone()), Box::new(screen)),
        FrameSampler::new(SamplerConfig { jpeg_quality: 80 }),
        ControllerOptions {
            supports_video,
            start_muted: false,
        },
    );
    let config = AppConfig::parse_from(["livetray"]);
    let bridge = Bridge::with_parts(lines.writer(), controller, capabilities_for(&config));
    Harness {
        bridge,
        lines,
        mic,
        camera,
    }
}

// ============================================================================
// Protocol
// ============================================================================

#[test]
fn parses_every_command() {
    assert_eq!(parse_command(r#"{"cmd":"connect"}"#).unwrap(), IpcCommand::Connect);
    assert_eq!(
        parse_command(r#"  {"cmd":"select_source","source":"screen_share"}  "#).unwrap(),
        IpcCommand::SelectSource {
            source: VideoSource::ScreenShare
        }
    );
    assert_eq!(
        parse_command(r#"{"cmd":"output_volume","volume":0.4}"#).unwrap(),
        IpcCommand::OutputVolume { volume: 0.4 }
    );
    assert_eq!(
        parse_command(r#"{"cmd":"connection_lost"}"#).unwrap(),
        IpcCommand::ConnectionLost
    );
    assert_eq!(parse_command(r#"{"cmd":"quit"}"#).unwrap(), IpcCommand::Quit);
}

#[test]
fn rejects_unknown_commands_and_sources() {
    assert!(parse_command(r#"{"cmd":"launch"}"#).is_err());
    assert!(parse_command(r#"{"cmd":"select_source","source":"window"}"#).is_err());
    assert!(parse_command("not json").is_err());
}

#[test]
fn realtime_input_uses_wire_field_names() {
    let event = IpcEvent::RealtimeInput {
        media_chunks: vec![MediaChunk::jpeg(&[0xff, 0xd8])],
    };
    let json: serde_json::Value = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], "realtime_input");
    assert_eq!(json["mediaChunks"][0]["mimeType"], "image/jpeg");
    assert_eq!(json["mediaChunks"][0]["data"], "/9g=");
}

#[test]
fn stream_changed_serializes_source_names() {
    let event = IpcEvent::StreamChanged {
        source: VideoSource::None,
        stream_id: None,
    };
    let json = serde_json::to_string(&event).unwrap();
    assert_eq!(json, r#"{"event":"stream_changed","source":"none","stream_id":null}"#);
}

// ============================================================================
// Driver
// ============================================================================

#[test]
fn commands_drive_the_controller_and_emit_state() {
    let mut h = harness(true);
    let now = Instant::now();
    assert_eq!(h.bridge.handle_command(IpcCommand::Connect, now), Flow::Continue);
    assert!(h.bridge.controller().audio_running());
    assert_eq!(h.mic.counts(), (1, 0));

    h.bridge.handle_command(
        IpcCommand::SelectSource {
            source: VideoSource::Camera,
        },
        now,
    );
    let changed = h.lines.events_named("stream_changed");
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0]["source"], "camera");
    assert_eq!(changed[0]["stream_id"], 1);

    h.bridge.handle_command(IpcCommand::ToggleMute, now);
    assert!(!h.bridge.controller().audio_running());
    assert_eq!(h.bridge.handle_command(IpcCommand::Quit, now), Flow::Quit);
}

#[test]
fn connection_lost_returns_to_idle() {
    let mut h = harness(true);
    let now = Instant::now();
    h.bridge.handle_command(IpcCommand::Connect, now);
    h.bridge.handle_command(IpcCommand::ConnectionLost, now);
    assert!(!h.bridge.controller().is_connected());
    assert!(!h.bridge.controller().audio_running());
    assert_eq!(h.mic.counts(), (1, 1));
}

#[test]
fn failures_become_recoverable_error_events() {
    let mut h = harness(false);
    h.bridge.handle_command(
        IpcCommand::SelectSource {
            source: VideoSource::ScreenShare,
        },
        Instant::now(),
    );
    let errors = h.lines.events_named("error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["recoverable"], true);
    assert!(errors[0]["message"]
        .as_str()
        .unwrap()
        .contains("disabled"));
}

#[test]
fn output_volume_is_reflected_in_tray() {
    let mut h = harness(true);
    h.bridge.handle_command(
        IpcCommand::OutputVolume { volume: 0.5 },
        Instant::now(),
    );
    assert_eq!(h.bridge.controller().view().output_volume, 0.5);
}

#[test]
fn loop_forwards_frames_and_shuts_down_on_quit() {
    let mut h = harness(true);
    let now = Instant::now();
    h.bridge.handle_command(IpcCommand::Connect, now);
    h.bridge.handle_command(
        IpcCommand::SelectSource {
            source: VideoSource::Camera,
        },
        now,
    );
    h.camera.show(solid_frame(64, 64));

    let (tx, rx) = unbounded();
    let quitter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        tx.send(IpcCommand::Quit).unwrap();
    });
    h.bridge.run(&rx).expect("bridge loop");
    quitter.join().unwrap();

    let events = h.lines.events();
    assert_eq!(events[0]["event"], "connection");
    assert!(events.iter().any(|event| event["event"] == "capabilities"));

    let media = h.lines.events_named("realtime_input");
    assert_eq!(media.len(), 1, "one frame on next paint, cadence not yet due");
    assert_eq!(media[0]["mediaChunks"][0]["mimeType"], "image/jpeg");

    let trays = h.lines.events_named("tray");
    let last = trays.last().expect("tray emitted");
    assert_eq!(last["video_source"], "none");
    assert_eq!(last["state"], "live_active");
    assert!(!h.bridge.controller().audio_running());
    let changed = h.lines.events_named("stream_changed");
    assert_eq!(changed.last().unwrap()["source"], "none");
}

#[test]
fn loop_exits_when_commands_close() {
    let mut h = harness(true);
    let (tx, rx) = unbounded::<IpcCommand>();
    drop(tx);
    h.bridge.run(&rx).expect("bridge loop");
    let trays = h.lines.events_named("tray");
    assert_eq!(trays.len(), 1);
    assert_eq!(trays[0]["state"], "idle");
    assert_eq!(trays[0]["connect_focused"], true);
}
