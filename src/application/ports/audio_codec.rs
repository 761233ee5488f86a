use std::path::Path;
use std::time::Duration;

/// In-process decoder and WAV encoder used by the primary normalization tier.
pub trait AudioCodec: Send + Sync {
    /// Decodes `source` to mono samples. `hint` is a container extension;
    /// `None` asks the codec to detect the format itself.
    fn decode(&self, source: &Path, hint: Option<&str>) -> Result<DecodedAudio, AudioCodecError>;

    /// Writes mono 16 kHz 16-bit PCM WAV and returns the file size in bytes.
    fn export_canonical(
        &self,
        audio: &DecodedAudio,
        destination: &Path,
    ) -> Result<u64, AudioCodecError>;

    /// Reads the duration of an existing WAV file from its header.
    fn wav_header_duration(&self, path: &Path) -> Result<Duration, AudioCodecError>;
}

/// Mono PCM at the source sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub source_channels: usize,
}

impl DecodedAudio {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AudioCodecError {
    #[error("audio decoding failed: {0}")]
    DecodingFailed(String),
    #[error("audio encoding failed: {0}")]
    EncodingFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
