use crossbeam_channel::{Sender, TrySendError};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Average interleaved channels into mono, converting each sample to f32 on the way.
pub(super) fn downmix_into<T, F>(out: &mut Vec<f32>, data: &[T], channels: usize, convert: F)
where
    T: Copy,
    F: Fn(T) -> f32,
{
    if channels <= 1 {
        out.extend(data.iter().copied().map(convert));
        return;
    }
    let mut frames = data.chunks_exact(channels);
    for frame in frames.by_ref() {
        let sum: f32 = frame.iter().copied().map(&convert).sum();
        out.push(sum / channels as f32);
    }
    let tail = frames.remainder();
    if !tail.is_empty() {
        let sum: f32 = tail.iter().copied().map(&convert).sum();
        out.push(sum / tail.len() as f32);
    }
}

/// Runs inside the device callback: turns arbitrary callback buffers into
/// fixed-size mono frames and hands them to the slicing worker without blocking.
pub(super) struct FramePump {
    frame_samples: usize,
    pending: Vec<f32>,
    sender: Sender<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
}

impl FramePump {
    pub(super) fn new(frame_samples: usize, sender: Sender<Vec<f32>>, dropped: Arc<AtomicUsize>) -> Self {
        let frame_samples = frame_samples.max(1);
        Self {
            frame_samples,
            pending: Vec::with_capacity(frame_samples * 2),
            sender,
            dropped,
        }
    }

    pub(super) fn push_interleaved<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: Fn(T) -> f32,
    {
        downmix_into(&mut self.pending, data, channels, convert);
        while self.pending.len() >= self.frame_samples {
            let rest = self.pending.split_off(self.frame_samples);
            let frame = std::mem::replace(&mut self.pending, rest);
            match self.sender.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.pending.clear();
                    return;
                }
            }
        }
    }
}
