use crate::log_debug;
use crate::sync::{lock_or_recover, StopFlag};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Latest decoded frame of a live source, shared between its capture thread
/// and whoever renders or samples it.
#[derive(Clone, Default)]
pub struct FrameSlot {
    latest: Arc<Mutex<Option<Arc<RgbImage>>>>,
    published: Arc<AtomicU64>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: RgbImage) {
        *lock_or_recover(&self.latest, "frame slot") = Some(Arc::new(frame));
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// The current rendered frame, or `None` before the source produced one.
    pub fn latest(&self) -> Option<Arc<RgbImage>> {
        lock_or_recover(&self.latest, "frame slot").clone()
    }

    pub fn frames_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for FrameSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSlot")
            .field("frames_published", &self.frames_published())
            .finish()
    }
}

/// A running capture backing one selected source.
pub trait StreamHandle: Send {
    fn frames(&self) -> FrameSlot;

    /// False once the underlying track ended on its own.
    fn is_live(&self) -> bool;

    /// Release the device. Stopping a stopped handle does nothing.
    fn stop(&mut self);
}

/// Hands out stream handles for one kind of source.
pub trait StreamProvider: Send {
    fn acquire(&mut self) -> Result<Box<dyn StreamHandle>, crate::error::DeviceUnavailable>;
}

/// Capture thread plus the shared state it writes to. Used by the camera and
/// screen-share handles.
pub(crate) struct ThreadedStream {
    label: &'static str,
    frames: FrameSlot,
    stop: StopFlag,
    live: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
    on_stop: Option<Box<dyn FnOnce() + Send>>,
}

impl ThreadedStream {
    pub(crate) fn new(
        label: &'static str,
        frames: FrameSlot,
        stop: StopFlag,
        live: Arc<AtomicBool>,
        worker: thread::JoinHandle<()>,
    ) -> Self {
        Self {
            label,
            frames,
            stop,
            live,
            worker: Some(worker),
            on_stop: None,
        }
    }

    /// Run `hook` after the stop flag is raised and before joining the worker,
    /// e.g. to kill a child process the worker is blocked reading from.
    pub(crate) fn with_stop_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_stop = Some(Box::new(hook));
        self
    }
}

impl StreamHandle for ThreadedStream {
    fn frames(&self) -> FrameSlot {
        self.frames.clone()
    }

    fn is_live(&self) -> bool {
        self.worker.is_some() && self.live.load(Ordering::Acquire)
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.stop.raise();
        if let Some(hook) = self.on_stop.take() {
            hook();
        }
        if worker.join().is_err() {
            log_debug(&format!("{} capture thread panicked", self.label));
        }
        self.live.store(false, Ordering::Release);
        log_debug(&format!("{} stream stopped", self.label));
    }
}

impl Drop for ThreadedStream {
    fn drop(&mut self) {
        self.stop();
    }
}
