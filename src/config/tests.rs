use super::validation::{sanitize_binary, sanitize_device_name};
use super::{AppConfig, DEFAULT_AUDIO_SLICE_MS, DEFAULT_JPEG_QUALITY};
use clap::Parser;
use std::env;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

#[test]
fn accepts_valid_defaults() {
    let mut cfg = AppConfig::parse_from(["test-app"]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.audio_slice_ms, DEFAULT_AUDIO_SLICE_MS);
    assert_eq!(cfg.jpeg_quality, DEFAULT_JPEG_QUALITY);
    assert!(cfg.supports_video());
    assert!(!cfg.start_muted);
}

#[test]
fn rejects_audio_slice_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--audio-slice-ms", "19"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--audio-slice-ms", "101"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_audio_slice_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--audio-slice-ms", "20"]);
    assert!(cfg.validate().is_ok());
    let mut cfg = AppConfig::parse_from(["test-app", "--audio-slice-ms", "100"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_channel_capacity_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--audio-channel-capacity", "7"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--audio-channel-capacity", "1025"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_jpeg_quality_zero() {
    let mut cfg = AppConfig::parse_from(["test-app", "--jpeg-quality", "0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_screen_timeout_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--screen-start-timeout-ms", "100"]);
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::parse_from(["test-app", "--screen-start-timeout-ms", "30001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_large_camera_index() {
    let mut cfg = AppConfig::parse_from(["test-app", "--camera-index", "64"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn blank_input_device_falls_back_to_default() {
    let mut cfg = AppConfig::parse_from(["test-app", "--input-device", "   "]);
    cfg.validate().expect("blank device should be accepted");
    assert_eq!(cfg.input_device, None);
}

#[test]
fn input_device_is_trimmed() {
    let mut cfg = AppConfig::parse_from(["test-app", "--input-device", "  USB Mic  "]);
    cfg.validate().expect("device name should be valid");
    assert_eq!(cfg.input_device.as_deref(), Some("USB Mic"));
}

#[test]
fn device_name_rejects_control_characters() {
    assert!(sanitize_device_name("mic\nrm").is_err());
    assert!(sanitize_device_name(&"x".repeat(300)).is_err());
}

#[test]
fn ffmpeg_allowlist_is_case_insensitive() {
    let resolved = sanitize_binary("FFMPEG", "--ffmpeg-cmd", &["ffmpeg"]).expect("allowlisted");
    assert_eq!(resolved, "ffmpeg");
}

#[test]
fn ffmpeg_rejects_unknown_bare_name() {
    let mut cfg = AppConfig::parse_from(["test-app", "--ffmpeg-cmd", "not-ffmpeg"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn ffmpeg_check_is_skipped_without_video() {
    let mut cfg = AppConfig::parse_from(["test-app", "--no-video", "--ffmpeg-cmd", "not-ffmpeg"]);
    assert!(cfg.validate().is_ok());
    assert!(!cfg.supports_video());
}

#[test]
fn ffmpeg_accepts_existing_executable_path() {
    let exe = env::current_exe().expect("test binary path");
    let exe = exe.to_string_lossy().to_string();
    let resolved = sanitize_binary(&exe, "--ffmpeg-cmd", &["ffmpeg"]).expect("executable path");
    assert!(!resolved.is_empty());
}

#[cfg(unix)]
#[test]
fn ffmpeg_rejects_non_executable_path() {
    use std::os::unix::fs::PermissionsExt;
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let path = env::temp_dir().join(format!("livetray_not_exec_{nanos}"));
    fs::write(&path, "plain file").expect("write temp file");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");
    let result = sanitize_binary(&path.to_string_lossy(), "--ffmpeg-cmd", &["ffmpeg"]);
    let _ = fs::remove_file(&path);
    assert!(result.is_err());
}

#[test]
fn snapshots_reflect_flags() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--audio-slice-ms",
        "40",
        "--audio-channel-capacity",
        "16",
        "--camera-index",
        "2",
        "--jpeg-quality",
        "80",
    ]);
    cfg.validate().expect("valid flags");
    let audio = cfg.audio_capture_config();
    assert_eq!(audio.slice_ms, 40);
    assert_eq!(audio.channel_capacity, 16);
    assert_eq!(cfg.video_source_config().camera_index, 2);
    assert_eq!(cfg.sampler_config().jpeg_quality, 80);
}

#[test]
fn no_logs_vetoes_logging() {
    let cfg = AppConfig::parse_from(["test-app", "--logs", "--no-logs"]);
    assert!(!cfg.logging_enabled());
    let cfg = AppConfig::parse_from(["test-app", "--log-timings"]);
    assert!(cfg.logging_enabled());
}
