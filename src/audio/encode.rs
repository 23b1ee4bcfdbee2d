use super::samples_per_slice;

/// Convert normalized samples to 16-bit little-endian PCM.
pub(super) fn pcm16_le(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        let clamped = if sample.is_finite() {
            sample.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let value = (clamped * f32::from(i16::MAX)).round() as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Re-cuts a stream of 16 kHz samples into slices of exactly one slice length.
pub(super) struct Slicer {
    slice_len: usize,
    pending: Vec<f32>,
}

impl Slicer {
    pub(super) fn new(slice_ms: u64) -> Self {
        let slice_len = samples_per_slice(slice_ms);
        Self {
            slice_len,
            pending: Vec::with_capacity(slice_len * 2),
        }
    }

    pub(super) fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.pending.extend_from_slice(samples);
        let mut slices = Vec::new();
        while self.pending.len() >= self.slice_len {
            let rest = self.pending.split_off(self.slice_len);
            slices.push(std::mem::replace(&mut self.pending, rest));
        }
        slices
    }
}
