//! Webcam source. Built on nokhwa when the `camera` feature is enabled.

use super::stream::{StreamHandle, StreamProvider};
use crate::error::{DeviceKind, DeviceUnavailable, UnavailableReason};

pub struct CameraProvider {
    index: u32,
}

impl CameraProvider {
    pub fn new(index: u32) -> Self {
        Self { index }
    }
}

#[cfg(not(feature = "camera"))]
impl StreamProvider for CameraProvider {
    fn acquire(&mut self) -> Result<Box<dyn StreamHandle>, DeviceUnavailable> {
        crate::log_debug(&format!(
            "camera {} requested but camera support is not compiled in",
            self.index
        ));
        Err(DeviceUnavailable::new(
            DeviceKind::Camera,
            UnavailableReason::Unsupported("built without the 'camera' feature".to_string()),
        ))
    }
}

#[cfg(feature = "camera")]
impl StreamProvider for CameraProvider {
    fn acquire(&mut self) -> Result<Box<dyn StreamHandle>, DeviceUnavailable> {
        native::start_camera(self.index)
    }
}

/// Map a camera backend message onto the unavailable taxonomy.
pub(crate) fn classify_camera_error(message: &str) -> DeviceUnavailable {
    let lower = message.to_ascii_lowercase();
    let reason = if lower.contains("permission") || lower.contains("denied") || lower.contains("authoriz") {
        UnavailableReason::PermissionDenied
    } else if lower.contains("no device")
        || lower.contains("not found")
        || lower.contains("no such")
        || lower.contains("out of range")
    {
        UnavailableReason::NoDevice
    } else {
        UnavailableReason::Failed(message.to_string())
    };
    DeviceUnavailable::new(DeviceKind::Camera, reason)
}

#[cfg(feature = "camera")]
mod native {
    use super::classify_camera_error;
    use crate::devices::stream::{FrameSlot, StreamHandle, ThreadedStream};
    use crate::error::{DeviceKind, DeviceUnavailable};
    use crate::sync::StopFlag;
    use crate::{log_debug, log_debug_content};
    use crossbeam_channel::bounded;
    use image::RgbImage;
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    };
    use nokhwa::Camera;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    pub(super) fn start_camera(index: u32) -> Result<Box<dyn StreamHandle>, DeviceUnavailable> {
        let frames = FrameSlot::new();
        let stop = StopFlag::new();
        let live = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = bounded::<Result<String, DeviceUnavailable>>(1);

        let worker = {
            let frames = frames.clone();
            let stop = stop.clone();
            let live = live.clone();
            thread::Builder::new()
                .name("livetray-camera".into())
                .spawn(move || {
                    // nokhwa cameras are not Send, so the camera never leaves this thread.
                    let requested = RequestedFormat::new::<RgbFormat>(
                        RequestedFormatType::Closest(CameraFormat::new(
                            Resolution::new(640, 480),
                            FrameFormat::MJPEG,
                            15,
                        )),
                    );
                    let mut camera = match Camera::new(CameraIndex::Index(index), requested) {
                        Ok(camera) => camera,
                        Err(err) => {
                            let _ = ready_tx.send(Err(classify_camera_error(&err.to_string())));
                            return;
                        }
                    };
                    if let Err(err) = camera.open_stream() {
                        let _ = ready_tx.send(Err(classify_camera_error(&err.to_string())));
                        return;
                    }
                    live.store(true, Ordering::Release);
                    let _ = ready_tx.send(Ok(camera.info().human_name()));

                    while !stop.is_raised() {
                        let buffer = match camera.frame() {
                            Ok(buffer) => buffer,
                            Err(err) => {
                                if !stop.is_raised() {
                                    log_debug(&format!("camera frame error: {err}"));
                                }
                                break;
                            }
                        };
                        match buffer.decode_image::<RgbFormat>() {
                            Ok(decoded) => {
                                let (width, height) = (decoded.width(), decoded.height());
                                if let Some(frame) =
                                    RgbImage::from_raw(width, height, decoded.into_raw())
                                {
                                    frames.publish(frame);
                                }
                            }
                            Err(err) => log_debug(&format!("camera decode error: {err}")),
                        }
                    }
                    live.store(false, Ordering::Release);
                    let _ = camera.stop_stream();
                })
                .map_err(|err| DeviceUnavailable::failed(DeviceKind::Camera, err))?
        };

        match ready_rx.recv() {
            Ok(Ok(name)) => {
                log_debug(&format!("camera {index} started"));
                log_debug_content(&format!("camera device: {name}"));
                Ok(Box::new(ThreadedStream::new(
                    "camera", frames, stop, live, worker,
                )))
            }
            Ok(Err(err)) => {
                let _ = worker.join();
                Err(err)
            }
            Err(_) => {
                let _ = worker.join();
                Err(DeviceUnavailable::failed(
                    DeviceKind::Camera,
                    "camera thread exited during setup",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_permission_errors() {
        let err = classify_camera_error("Could not open: Permission denied (os error 13)");
        assert_eq!(err.reason, UnavailableReason::PermissionDenied);
        assert_eq!(err.device, DeviceKind::Camera);
    }

    #[test]
    fn classifies_missing_devices() {
        let err = classify_camera_error("/dev/video3: No such file or directory");
        assert_eq!(err.reason, UnavailableReason::NoDevice);
    }

    #[test]
    fn keeps_unknown_messages_verbatim() {
        let err = classify_camera_error("device busy");
        assert_eq!(err.reason, UnavailableReason::Failed("device busy".into()));
    }

    #[cfg(not(feature = "camera"))]
    #[test]
    fn reports_unsupported_without_camera_feature() {
        let mut provider = CameraProvider::new(0);
        let err = match provider.acquire() {
            Ok(_) => panic!("camera should be unavailable"),
            Err(err) => err,
        };
        assert!(matches!(err.reason, UnavailableReason::Unsupported(_)));
    }
}
