use crate::config::SamplerConfig;
use crate::devices::StreamBinding;
use crate::media::MediaChunk;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbImage};

/// Result of one sampling step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    Frame(MediaChunk),
    /// No frame yet, or the scaled frame has zero area.
    Skipped,
    EncodeFailed(String),
}

/// Turns the current frame of a stream into a quarter-scale JPEG chunk.
#[derive(Debug, Clone, Copy)]
pub struct FrameSampler {
    quality: u8,
}

impl FrameSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            quality: config.jpeg_quality.clamp(1, 100),
        }
    }

    pub fn tick(&self, binding: &StreamBinding) -> SampleOutcome {
        let Some(frame) = binding.frames.latest() else {
            return SampleOutcome::Skipped;
        };
        self.sample(&frame)
    }

    pub fn sample(&self, frame: &RgbImage) -> SampleOutcome {
        let (width, height) = (frame.width() / 4, frame.height() / 4);
        if width == 0 || height == 0 {
            return SampleOutcome::Skipped;
        }
        let scaled = imageops::resize(frame, width, height, FilterType::Triangle);
        let mut jpeg = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut jpeg, self.quality);
        match encoder.write_image(scaled.as_raw(), width, height, ExtendedColorType::Rgb8) {
            Ok(()) => SampleOutcome::Frame(MediaChunk::jpeg(&jpeg)),
            Err(err) => SampleOutcome::EncodeFailed(err.to_string()),
        }
    }
}
