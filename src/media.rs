//! Outbound chunk shape shared by the audio and video paths.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

pub const AUDIO_PCM_MIME: &str = "audio/pcm;rate=16000";
pub const IMAGE_JPEG_MIME: &str = "image/jpeg";

/// One discrete unit of encoded media, serialized exactly as `{mimeType, data}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

impl MediaChunk {
    /// 16 kHz little-endian PCM bytes.
    pub fn audio_pcm(pcm_le: &[u8]) -> Self {
        Self {
            mime_type: AUDIO_PCM_MIME.to_string(),
            data: STANDARD.encode(pcm_le),
        }
    }

    pub fn jpeg(bytes: &[u8]) -> Self {
        Self {
            mime_type: IMAGE_JPEG_MIME.to_string(),
            data: STANDARD.encode(bytes),
        }
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type == AUDIO_PCM_MIME
    }

    pub fn is_video(&self) -> bool {
        self.mime_type == IMAGE_JPEG_MIME
    }

    /// Decode the transport encoding back to raw bytes.
    pub fn payload(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}
