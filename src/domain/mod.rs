mod audio_format;
mod canonical_audio;
mod language_hint;
mod segment;
mod transcription_mode;
mod uploaded_audio;

pub use audio_format::SniffedFormat;
pub use canonical_audio::{
    CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE, CanonicalAudio, MIN_AUDIO_DURATION,
    MIN_CANONICAL_BYTES, NormalizationTier,
};
pub use language_hint::LanguageHint;
pub use segment::{Segment, TranscriptionResult};
pub use transcription_mode::TranscriptionMode;
pub use uploaded_audio::UploadedAudio;
