use super::TARGET_RATE;
#[cfg(feature = "high-quality-audio")]
use crate::log_debug;
#[cfg(feature = "high-quality-audio")]
use anyhow::{anyhow, Result};
#[cfg(feature = "high-quality-audio")]
use rubato::{InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction};
use std::f32::consts::PI;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

// Practical device rate bounds around the 16 kHz target (ratio ~0.01x .. 8x).
pub(super) const MIN_DEVICE_RATE: u32 = 2_000;
pub(super) const MAX_DEVICE_RATE: u32 = 1_600_000;
const MAX_FIR_TAPS: usize = 129;

#[cfg(test)]
pub(super) static FORCE_SINC_ERROR: AtomicBool = AtomicBool::new(false);

/// Per-session rate converter. The sinc stage keeps filter state across frames;
/// if it fails once the session falls back to the stateless FIR + linear path.
pub(super) enum SliceResampler {
    Passthrough,
    #[cfg(feature = "high-quality-audio")]
    Sinc(SincStage),
    Basic {
        device_rate: u32,
    },
}

impl SliceResampler {
    pub(super) fn for_device(device_rate: u32, frame_samples: usize) -> Self {
        if device_rate == TARGET_RATE || device_rate == 0 {
            return SliceResampler::Passthrough;
        }
        #[cfg(feature = "high-quality-audio")]
        {
            match SincStage::new(device_rate, frame_samples) {
                Ok(stage) => return SliceResampler::Sinc(stage),
                Err(err) => log_debug(&format!(
                    "sinc resampler unavailable for {device_rate}Hz ({err}); using basic path"
                )),
            }
        }
        #[cfg(not(feature = "high-quality-audio"))]
        let _ = frame_samples;
        SliceResampler::Basic { device_rate }
    }

    pub(super) fn process(&mut self, frame: &[f32]) -> Vec<f32> {
        let fallback_rate = match self {
            SliceResampler::Passthrough => return frame.to_vec(),
            SliceResampler::Basic { device_rate } => return basic_resample(frame, *device_rate),
            #[cfg(feature = "high-quality-audio")]
            SliceResampler::Sinc(stage) => match stage.process(frame) {
                Ok(out) => return out,
                Err(err) => {
                    log_debug(&format!(
                        "sinc resampler failed ({err}); falling back to basic path"
                    ));
                    stage.device_rate
                }
            },
        };
        *self = SliceResampler::Basic {
            device_rate: fallback_rate,
        };
        basic_resample(frame, fallback_rate)
    }

    #[cfg(test)]
    pub(super) fn is_basic(&self) -> bool {
        matches!(self, SliceResampler::Basic { .. })
    }
}

#[cfg(feature = "high-quality-audio")]
pub(super) struct SincStage {
    inner: SincFixedIn<f32>,
    chunk: usize,
    device_rate: u32,
    scratch: Vec<f32>,
}

#[cfg(feature = "high-quality-audio")]
impl SincStage {
    fn new(device_rate: u32, chunk: usize) -> Result<Self> {
        if !(MIN_DEVICE_RATE..=MAX_DEVICE_RATE).contains(&device_rate) {
            return Err(anyhow!("device rate {device_rate}Hz outside supported range"));
        }
        let chunk = chunk.max(1);
        let params = InterpolationParameters {
            sinc_len: 64,
            f_cutoff: 0.90,
            interpolation: InterpolationType::Cubic,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let ratio = f64::from(TARGET_RATE) / f64::from(device_rate);
        let inner = SincFixedIn::<f32>::new(ratio, 1.1, params, chunk, 1)
            .map_err(|e| anyhow!("failed to construct sinc resampler: {e:?}"))?;
        Ok(Self {
            inner,
            chunk,
            device_rate,
            scratch: vec![0.0; chunk],
        })
    }

    fn process(&mut self, frame: &[f32]) -> Result<Vec<f32>> {
        #[cfg(test)]
        if FORCE_SINC_ERROR.swap(false, Ordering::Relaxed) {
            return Err(anyhow!("forced sinc error"));
        }
        let len = frame.len().min(self.chunk);
        let pad = frame.get(len.wrapping_sub(1)).copied().unwrap_or(0.0);
        self.scratch.fill(pad);
        self.scratch[..len].copy_from_slice(&frame[..len]);
        let mut produced = self
            .inner
            .process(std::slice::from_ref(&self.scratch), None)
            .map_err(|e| anyhow!("resampler process failed: {e:?}"))?;
        Ok(produced.pop().unwrap_or_default())
    }
}

/// FIR low-pass (when decimating) followed by linear interpolation.
pub(super) fn basic_resample(input: &[f32], device_rate: u32) -> Vec<f32> {
    if input.is_empty() || device_rate == 0 || device_rate == TARGET_RATE {
        return input.to_vec();
    }
    let device_rate = device_rate.clamp(MIN_DEVICE_RATE, MAX_DEVICE_RATE);
    let ratio = TARGET_RATE as f32 / device_rate as f32;
    if device_rate > TARGET_RATE {
        let filtered = low_pass(input, device_rate);
        linear_interpolate(&filtered, ratio)
    } else {
        linear_interpolate(input, ratio)
    }
}

pub(super) fn linear_interpolate(input: &[f32], ratio: f32) -> Vec<f32> {
    let out_len = (input.len() as f32 * ratio).round() as usize;
    let last = input.last().copied().unwrap_or(0.0);
    (0..out_len)
        .map(|i| {
            let pos = i as f32 / ratio;
            let idx = pos.floor() as usize;
            let frac = pos - idx as f32;
            match (input.get(idx), input.get(idx + 1)) {
                (Some(a), Some(b)) => a * (1.0 - frac) + b * frac,
                _ => last,
            }
        })
        .collect()
}

/// Odd tap count that grows with the decimation ratio.
pub(super) fn fir_taps_for(device_rate: u32) -> usize {
    let decimation = device_rate as f32 / TARGET_RATE as f32;
    let taps = ((decimation * 4.0).ceil() as usize).max(11) | 1;
    taps.min(MAX_FIR_TAPS)
}

fn low_pass(input: &[f32], device_rate: u32) -> Vec<f32> {
    let cutoff = (TARGET_RATE as f32 * 0.5 / device_rate as f32).min(0.499);
    let coeffs = windowed_sinc(cutoff, fir_taps_for(device_rate));
    let half = coeffs.len() / 2;
    (0..input.len())
        .map(|n| {
            coeffs
                .iter()
                .enumerate()
                .filter_map(|(k, c)| {
                    (n + k)
                        .checked_sub(half)
                        .and_then(|idx| input.get(idx))
                        .map(|s| s * c)
                })
                .sum()
        })
        .collect()
}

/// Hamming-windowed sinc taps normalized to unity gain.
pub(super) fn windowed_sinc(cutoff: f32, taps: usize) -> Vec<f32> {
    if taps <= 1 {
        return vec![1.0];
    }
    let m = (taps - 1) as f32;
    let mut coeffs: Vec<f32> = (0..taps)
        .map(|n| {
            let centered = n as f32 - m / 2.0;
            let sinc = if centered == 0.0 {
                2.0 * cutoff
            } else {
                (2.0 * PI * cutoff * centered).sin() / (PI * centered)
            };
            let window = 0.54 - 0.46 * ((2.0 * PI * n as f32) / m).cos();
            sinc * window
        })
        .collect();
    let sum: f32 = coeffs.iter().sum();
    if sum != 0.0 {
        coeffs.iter_mut().for_each(|c| *c /= sum);
    }
    coeffs
}
