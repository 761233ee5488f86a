use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;
pub const CANONICAL_CHANNELS: u16 = 1;
pub const MIN_AUDIO_DURATION: Duration = Duration::from_millis(100);
pub const MIN_CANONICAL_BYTES: u64 = 100;

/// Which step of the normalization chain produced the canonical file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationTier {
    PrimaryDecode,
    ToolFallback,
    PassThrough,
}

impl NormalizationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationTier::PrimaryDecode => "primary_decode",
            NormalizationTier::ToolFallback => "tool_fallback",
            NormalizationTier::PassThrough => "pass_through",
        }
    }
}

impl fmt::Display for NormalizationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mono 16 kHz PCM WAV on disk, ready for the transcription engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalAudio {
    path: PathBuf,
    byte_len: u64,
    /// Unknown only for a pass-through file whose header could not be read.
    duration: Option<Duration>,
    tier: NormalizationTier,
}

impl CanonicalAudio {
    pub fn new(
        path: PathBuf,
        byte_len: u64,
        duration: Option<Duration>,
        tier: NormalizationTier,
    ) -> Self {
        Self {
            path,
            byte_len,
            duration,
            tier,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn tier(&self) -> NormalizationTier {
        self.tier
    }
}
