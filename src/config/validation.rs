use super::defaults::{
    FORBIDDEN_DEVICE_CHARS, MAX_DEVICE_NAME_BYTES, MAX_SCREEN_START_TIMEOUT_MS,
    MIN_SCREEN_START_TIMEOUT_MS,
};
use super::{
    AppConfig, AudioCaptureConfig, SamplerConfig, VideoSourceConfig, MAX_AUDIO_SLICE_MS,
    MIN_AUDIO_SLICE_MS,
};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::{fs, path::Path};

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize strings handed to devices and subprocesses.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_AUDIO_SLICE_MS..=MAX_AUDIO_SLICE_MS).contains(&self.audio_slice_ms) {
            bail!(
                "--audio-slice-ms must be between {MIN_AUDIO_SLICE_MS} and {MAX_AUDIO_SLICE_MS}, got {}",
                self.audio_slice_ms
            );
        }
        if !(8..=1024).contains(&self.audio_channel_capacity) {
            bail!(
                "--audio-channel-capacity must be between 8 and 1024, got {}",
                self.audio_channel_capacity
            );
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            bail!(
                "--jpeg-quality must be between 1 and 100, got {}",
                self.jpeg_quality
            );
        }
        if !(MIN_SCREEN_START_TIMEOUT_MS..=MAX_SCREEN_START_TIMEOUT_MS)
            .contains(&self.screen_start_timeout_ms)
        {
            bail!(
                "--screen-start-timeout-ms must be between {MIN_SCREEN_START_TIMEOUT_MS} and {MAX_SCREEN_START_TIMEOUT_MS}, got {}",
                self.screen_start_timeout_ms
            );
        }
        if self.camera_index > 63 {
            bail!(
                "--camera-index must be between 0 and 63, got {}",
                self.camera_index
            );
        }

        if let Some(device) = self.input_device.take() {
            self.input_device = sanitize_device_name(&device)?;
        }
        if !self.no_video {
            self.ffmpeg_cmd = sanitize_binary(&self.ffmpeg_cmd, "--ffmpeg-cmd", &["ffmpeg"])?;
        }

        Ok(())
    }

    /// Snapshot the audio capture settings.
    pub fn audio_capture_config(&self) -> AudioCaptureConfig {
        AudioCaptureConfig {
            slice_ms: self.audio_slice_ms,
            channel_capacity: self.audio_channel_capacity,
        }
    }

    /// Snapshot the video provider settings.
    pub fn video_source_config(&self) -> VideoSourceConfig {
        VideoSourceConfig {
            camera_index: self.camera_index,
            ffmpeg_cmd: self.ffmpeg_cmd.clone(),
            screen_start_timeout_ms: self.screen_start_timeout_ms,
        }
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            jpeg_quality: self.jpeg_quality,
        }
    }
}

/// Trim a device name; an empty name means "use the default device".
pub(super) fn sanitize_device_name(raw: &str) -> Result<Option<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() > MAX_DEVICE_NAME_BYTES
        || trimmed
            .chars()
            .any(|ch| FORBIDDEN_DEVICE_CHARS.contains(&ch))
    {
        bail!("--input-device must be <={MAX_DEVICE_NAME_BYTES} bytes with no control characters");
    }
    Ok(Some(trimmed.to_string()))
}

/// Accept a bare allowlisted binary name or an existing executable path.
pub(super) fn sanitize_binary(value: &str, flag: &str, allowlist: &[&str]) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{flag} cannot be empty");
    }
    if let Some(allowed) = allowlist
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(trimmed))
    {
        return Ok((*allowed).to_string());
    }

    let path = Path::new(trimmed);
    if !(path.is_absolute() || trimmed.contains(std::path::MAIN_SEPARATOR)) {
        bail!("{flag} must be one of {allowlist:?} or an existing binary path");
    }
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to canonicalize {flag} '{trimmed}'"))?;
    let metadata = fs::metadata(&canonical)
        .with_context(|| format!("failed to inspect {flag} '{}'", canonical.display()))?;
    if !metadata.is_file() {
        bail!("{flag} '{}' is not a file", canonical.display());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();
        if mode & 0o111 == 0 {
            bail!(
                "{flag} '{}' exists but is not executable (mode {:o})",
                canonical.display(),
                mode
            );
        }
    }
    canonical
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("{flag} must be valid UTF-8"))
}
