//! Error taxonomy for device acquisition, the outbound sink and controller commands.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Hardware or OS capability a request was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Microphone,
    Camera,
    ScreenShare,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceKind::Microphone => "microphone",
            DeviceKind::Camera => "camera",
            DeviceKind::ScreenShare => "screen share",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    PermissionDenied,
    NoDevice,
    Cancelled,
    Unsupported(String),
    Timeout,
    Failed(String),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::PermissionDenied => f.write_str("permission denied"),
            UnavailableReason::NoDevice => f.write_str("no device found"),
            UnavailableReason::Cancelled => f.write_str("cancelled by user"),
            UnavailableReason::Unsupported(what) => write!(f, "unsupported ({what})"),
            UnavailableReason::Timeout => f.write_str("timed out waiting for the first frame"),
            UnavailableReason::Failed(detail) => f.write_str(detail),
        }
    }
}

/// A capture device could not be started. Recoverable; state stays as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{device} unavailable: {reason}")]
pub struct DeviceUnavailable {
    pub device: DeviceKind,
    pub reason: UnavailableReason,
}

impl DeviceUnavailable {
    pub fn new(device: DeviceKind, reason: UnavailableReason) -> Self {
        Self { device, reason }
    }

    pub fn failed(device: DeviceKind, detail: impl fmt::Display) -> Self {
        Self::new(device, UnavailableReason::Failed(detail.to_string()))
    }
}

/// The outbound channel refused a chunk. Chunks are dropped, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a user-facing controller command.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Device(#[from] DeviceUnavailable),
    #[error("video sources are disabled for this session")]
    VideoDisabled,
    #[error("backend client: {0}")]
    Client(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_unavailable_message_names_device_and_reason() {
        let err = DeviceUnavailable::new(DeviceKind::ScreenShare, UnavailableReason::Cancelled);
        assert_eq!(err.to_string(), "screen share unavailable: cancelled by user");
    }

    #[test]
    fn control_error_is_transparent_over_device_errors() {
        let err: ControlError = DeviceUnavailable::failed(DeviceKind::Camera, "busy").into();
        assert_eq!(err.to_string(), "camera unavailable: busy");
    }
}
